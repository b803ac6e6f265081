//! Live session against a running tracker service.
//!
//! ```text
//! GAZE_CLIENT_URL=ws://localhost:8086/ RUST_LOG=info cargo run --example live
//! ```
//!
//! Connects, prints state changes, starts tracking once the tracker is
//! calibrated and logs the smoothed gaze point for ten seconds. Setting
//! `GAZE_CLIENT_SIMULATE=1` runs the same flow on the simulator.

use std::time::Duration;

use gaze_client::{
    AvailableCommands, ClientConfig, CloseReason, CommandRequest, GazeClient, GazeListener,
    RawPoint, SessionState,
};
use tracing::info;

struct Log;

impl GazeListener for Log {
    fn on_device_announced(&mut self, name: &str) {
        info!("Device: {}", name);
    }

    fn on_state_changed(&mut self, state: SessionState, available: AvailableCommands) {
        info!("State: {} (available: {:?})", state, available);
    }

    fn on_smoothed_sample(&mut self, point: RawPoint) {
        tracing::debug!("Gaze: {:.1} {:.1}", point.x, point.y);
    }

    fn on_disconnected(&mut self, reason: &CloseReason) {
        info!("Disconnected: {}", reason);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = ClientConfig::default();
    config.apply_env()?;

    let mut client = GazeClient::builder().config(config).listener(Log).build()?;
    client.connect()?;

    let mut frame = tokio::time::interval(Duration::from_millis(16));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let mut requested = false;

    while tokio::time::Instant::now() < deadline {
        frame.tick().await;
        client.tick();

        if !requested && client.available_commands().toggle_tracking && !client.is_tracking() {
            client.send_command(CommandRequest::ToggleTracking)?;
            requested = true;
        }
    }

    if let Some(point) = client.current_location() {
        info!("Last location: {:.0},{:.0}", point.x, point.y);
    }
    info!("Failed sends: {}", client.failed_sends());
    client.shutdown();
    Ok(())
}
