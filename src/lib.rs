//! # gaze-client
//!
//! Rust client for WebSocket eye-tracking services.
//!
//! This crate connects to a gaze-tracking service (or a built-in simulator),
//! decodes its JSON stream, tracks the session state and produces a smoothed,
//! low-jitter gaze point.
//!
//! ## Architecture
//!
//! - **I/O** (tokio tasks): a WebSocket or simulator transport pushes raw
//!   text frames into a mutex-protected FIFO
//! - **Processing** (caller's thread): [`GazeClient::tick`] drains the FIFO,
//!   decodes each frame once, updates session flags, smooths samples and
//!   notifies [`GazeListener`]s
//!
//! ## Example
//!
//! ```ignore
//! use gaze_client::{CommandRequest, GazeClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = GazeClient::builder()
//!         .url("ws://localhost:8086/")
//!         .build()?;
//!
//!     client.connect()?;
//!     while !client.available_commands().toggle_tracking {
//!         client.tick();
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//!     client.send_command(CommandRequest::ToggleTracking)?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod geometry;
pub mod inbound;
pub mod protocol;
pub mod simulator;
pub mod smoother;
pub mod state_machine;
pub mod transport;

mod client;

pub use client::{GazeClient, GazeClientBuilder, GazeListener};
pub use config::ClientConfig;
pub use error::{GazeError, Result};
pub use inbound::CloseReason;
pub use protocol::{CommandRequest, SessionState};
pub use smoother::{GazeState, RawPoint, RawVector, Smoother, SmootherConfig};
pub use state_machine::{AvailableCommands, GazeEvent};
