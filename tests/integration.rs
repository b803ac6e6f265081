//! Integration tests for gaze-client.
//!
//! These tests drive the public API end to end: simulator and live WebSocket
//! transports, the tick loop and the listener callbacks.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gaze_client::codec::JsonCodec;
use gaze_client::geometry::ScreenMapping;
use gaze_client::state_machine::GazeStateMachine;
use gaze_client::{
    AvailableCommands, CloseReason, CommandRequest, GazeClient, GazeError, GazeEvent,
    GazeListener, RawPoint, SessionState, SmootherConfig,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Device(String),
    State(i32, AvailableCommands),
    Activated,
    Deactivated,
    Sample(RawPoint),
    Disconnected(CloseReason),
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Seen>>>);

impl Recorder {
    fn take(&self) -> Vec<Seen> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl GazeListener for Recorder {
    fn on_device_announced(&mut self, name: &str) {
        self.0.lock().push(Seen::Device(name.to_string()));
    }

    fn on_state_changed(&mut self, state: SessionState, available: AvailableCommands) {
        self.0.lock().push(Seen::State(state.value, available));
    }

    fn on_session_activated(&mut self) {
        self.0.lock().push(Seen::Activated);
    }

    fn on_session_deactivated(&mut self) {
        self.0.lock().push(Seen::Deactivated);
    }

    fn on_smoothed_sample(&mut self, point: RawPoint) {
        self.0.lock().push(Seen::Sample(point));
    }

    fn on_disconnected(&mut self, reason: &CloseReason) {
        self.0.lock().push(Seen::Disconnected(reason.clone()));
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn simulated_client(recorder: &Recorder) -> GazeClient {
    GazeClient::builder()
        .simulate(true)
        .pointer(|| (640.0f32, 360.0f32))
        .listener(recorder.clone())
        .build()
        .unwrap()
}

/// Device → State 3 → ToggleTracking → State 7 with exactly one activation.
#[tokio::test(start_paused = true)]
async fn test_simulator_session() {
    init_tracing();
    let recorder = Recorder::default();
    let mut client = simulated_client(&recorder);

    client.connect().unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    client.tick();

    assert!(client.is_connected());
    let all = AvailableCommands {
        show_options: true,
        calibrate: true,
        toggle_tracking: true,
    };
    assert_eq!(
        recorder.take(),
        vec![Seen::Device("Simulator".to_string()), Seen::State(3, all)]
    );
    assert_eq!(client.device().map(|d| d.name.as_str()), Some("Simulator"));

    client.send_command(CommandRequest::ToggleTracking).unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    client.tick();

    let seen = recorder.take();
    let tracking = AvailableCommands {
        show_options: false,
        calibrate: false,
        toggle_tracking: true,
    };
    assert_eq!(seen, vec![Seen::State(7, tracking), Seen::Activated]);
    assert!(client.is_tracking());
    assert_eq!(client.toggle_tracking_label(), "Stop");

    // Samples at ~30 Hz; a fixed pointer smooths to itself.
    tokio::time::sleep(Duration::from_millis(300)).await;
    client.tick();

    let samples: Vec<RawPoint> = recorder
        .take()
        .into_iter()
        .filter_map(|s| match s {
            Seen::Sample(p) => Some(p),
            _ => None,
        })
        .collect();
    assert!(samples.len() >= 8, "got {} samples", samples.len());
    assert!(samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    let last = client.current_location().unwrap();
    assert!((last.x - 640.0).abs() < 1e-3 && (last.y - 360.0).abs() < 1e-3);

    client.shutdown();
    let seen = recorder.take();
    assert_eq!(
        &seen[seen.len() - 2..],
        &[Seen::Deactivated, Seen::Disconnected(CloseReason::Local)]
    );
    assert!(!client.is_connected());
}

/// Output before a reconnect never leaks into the next session.
#[tokio::test(start_paused = true)]
async fn test_reconnect_drops_stale_events() {
    let recorder = Recorder::default();
    let mut client = simulated_client(&recorder);

    client.connect().unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    client.disconnect();
    client.connect().unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    client.tick();

    let seen = recorder.take();
    assert_eq!(seen.len(), 2, "{:?}", seen);
    assert_eq!(seen[0], Seen::Device("Simulator".to_string()));
    assert!(matches!(seen[1], Seen::State(3, _)));
}

#[tokio::test]
async fn test_connect_twice_fails() {
    let recorder = Recorder::default();
    let mut client = simulated_client(&recorder);

    client.connect().unwrap();
    assert!(matches!(client.connect(), Err(GazeError::AlreadyConnected)));
}

#[test]
fn test_failed_sends_counted() {
    let mut client = GazeClient::builder().build().unwrap();

    for request in CommandRequest::ALL {
        assert!(matches!(
            client.send_command(request),
            Err(GazeError::NotConnected)
        ));
    }
    assert_eq!(client.failed_sends(), 5);
}

/// After deactivation the smoother starts over: the next sample passes through.
#[test]
fn test_reset_scenario() {
    let mut machine = GazeStateMachine::new(SmootherConfig::default(), ScreenMapping::identity());

    let frames = [r#"{"type":"state","value":7}"#.to_string()]
        .into_iter()
        .chain((0..10).map(|i| {
            format!(
                r#"{{"type":"sample","ts":{},"x":{},"y":0}}"#,
                i * 20,
                if i < 5 { 0 } else { 100 }
            )
        }))
        .chain([r#"{"type":"state","value":3}"#.to_string()]);

    let mut events = Vec::new();
    for frame in frames {
        events.extend(machine.handle(JsonCodec::decode(&frame)));
    }
    assert_eq!(events.last(), Some(&GazeEvent::SessionDeactivated));

    let after = machine.handle(JsonCodec::decode(
        r#"{"type":"sample","ts":500,"x":42.5,"y":-7}"#,
    ));
    assert_eq!(
        after,
        vec![GazeEvent::SmoothedSample(RawPoint::new(500, 42.5, -7.0))]
    );
}

/// Minimal tracker service: announces itself, answers TOGGLE_TRACKING with the
/// new state and returns every command it received once the client leaves.
async fn mock_service(listener: TcpListener) -> Vec<String> {
    let (tcp, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

    let mut state = 3;
    ws.send(Message::Text(r#"{"type":"device","name":"Mock"}"#.into()))
        .await
        .unwrap();
    ws.send(Message::Text(format!(r#"{{"type":"state","value":{}}}"#, state)))
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Some(Ok(msg)) = ws.next().await {
        match msg {
            Message::Text(text) => {
                if text == "TOGGLE_TRACKING" {
                    state ^= 4;
                    let reply = format!(r#"{{"type":"state","value":{}}}"#, state);
                    let _ = ws.send(Message::Text(reply)).await;
                }
                received.push(text);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    received
}

async fn tick_until(client: &mut GazeClient, done: impl Fn(&GazeClient) -> bool) {
    for _ in 0..500 {
        client.tick();
        if done(client) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Shutting down while tracking that this client started stops tracking first.
#[tokio::test]
async fn test_websocket_shutdown_stops_tracking() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(mock_service(listener));

    let recorder = Recorder::default();
    let mut client = GazeClient::builder()
        .url(format!("ws://{}/", addr))
        .listener(recorder.clone())
        .build()
        .unwrap();

    client.connect().unwrap();
    tick_until(&mut client, |c| c.available_commands().toggle_tracking).await;
    assert!(client.is_connected());
    assert_eq!(client.device().map(|d| d.name.as_str()), Some("Mock"));

    client.send_command(CommandRequest::ToggleTracking).unwrap();
    tick_until(&mut client, |c| c.is_tracking()).await;

    client.shutdown();

    let received = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, vec!["TOGGLE_TRACKING", "TOGGLE_TRACKING"]);

    let seen = recorder.take();
    assert_eq!(seen.iter().filter(|s| **s == Seen::Activated).count(), 1);
    assert_eq!(seen.last(), Some(&Seen::Disconnected(CloseReason::Local)));
}

#[tokio::test]
async fn test_websocket_refused_reports_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let recorder = Recorder::default();
    let mut client = GazeClient::builder()
        .url(format!("ws://{}/", addr))
        .listener(recorder.clone())
        .build()
        .unwrap();

    client.connect().unwrap();
    // Issued during the handshake that is about to fail.
    assert!(matches!(
        client.send_command(CommandRequest::Calibrate),
        Err(GazeError::NotConnected)
    ));
    assert_eq!(client.failed_sends(), 1);

    let mut seen = Vec::new();
    for _ in 0..500 {
        client.tick();
        seen.extend(recorder.take());
        if !seen.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(matches!(
        seen.as_slice(),
        [Seen::Disconnected(CloseReason::Error(_))]
    ));
    assert!(!client.is_connected());
    assert!(matches!(
        client.send_command(CommandRequest::Calibrate),
        Err(GazeError::NotConnected)
    ));
    assert_eq!(client.failed_sends(), 2);
}
