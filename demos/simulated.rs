//! Simulated session - no tracker hardware needed.
//!
//! This example demonstrates:
//! - Building a client on the built-in simulator
//! - Receiving session notifications through a `GazeListener`
//! - Starting and stopping tracking with `send_command`
//!
//! The pointer moves along a circle, so the smoothed output shows fixation
//! damping while the point drifts slowly and saccade damping on the jumps.
//!
//! ```text
//! RUST_LOG=gaze_client=debug cargo run --example simulated
//! ```

use std::time::{Duration, Instant};

use gaze_client::{
    AvailableCommands, CommandRequest, GazeClient, GazeListener, RawPoint, SessionState,
};

struct Printer {
    samples: usize,
}

impl GazeListener for Printer {
    fn on_device_announced(&mut self, name: &str) {
        println!("device: {}", name);
    }

    fn on_state_changed(&mut self, state: SessionState, available: AvailableCommands) {
        println!("state: {} {:?}", state, available);
    }

    fn on_session_activated(&mut self) {
        println!("tracking on");
    }

    fn on_session_deactivated(&mut self) {
        println!("tracking off ({} samples)", self.samples);
    }

    fn on_smoothed_sample(&mut self, point: RawPoint) {
        self.samples += 1;
        if self.samples % 10 == 0 {
            println!("  gaze {:>6} ms  {:7.1} {:7.1}", point.timestamp, point.x, point.y);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let started = Instant::now();
    let pointer = move || {
        let t = started.elapsed().as_secs_f32();
        // Slow orbit with a jump every two seconds.
        let jump = if (t as u32 / 2) % 2 == 0 { 0.0 } else { 300.0 };
        (640.0 + 100.0 * t.cos() + jump, 360.0 + 100.0 * t.sin())
    };

    let mut client = GazeClient::builder()
        .simulate(true)
        .pointer(pointer)
        .viewport(1280.0, 720.0)
        .listener(Printer { samples: 0 })
        .build()?;

    client.connect()?;

    let mut frame = tokio::time::interval(Duration::from_millis(16));
    let mut requested = false;
    while started.elapsed() < Duration::from_secs(8) {
        frame.tick().await;
        client.tick();

        if !requested && client.available_commands().toggle_tracking {
            client.send_command(CommandRequest::ToggleTracking)?;
            requested = true;
        }
    }

    // Tracking was started here, so shutdown stops it again.
    client.shutdown();
    Ok(())
}
