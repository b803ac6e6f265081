//! Simulator behind the [`Transport`] seam.
//!
//! Outbound command literals are parsed back into [`CommandRequest`]s and fed
//! to the [`Simulator`]; every record it produces is JSON-encoded and queued
//! as a text frame, exactly like a frame read from the live socket.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{runtime_handle, Transport};
use crate::codec::JsonCodec;
use crate::error::{GazeError, Result};
use crate::inbound::{CloseReason, InboundSender};
use crate::protocol::{CommandRequest, Record};
use crate::simulator::Simulator;

/// A running simulator.
pub struct SimulatedTransport {
    commands: Option<mpsc::UnboundedSender<String>>,
    _task: JoinHandle<()>,
}

impl SimulatedTransport {
    /// Start the simulator task on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::NoRuntime`] outside a tokio runtime.
    pub fn start(simulator: Simulator, inbound: InboundSender) -> Result<Self> {
        let handle = runtime_handle()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = handle.spawn(simulator_loop(simulator, inbound, rx));

        Ok(Self {
            commands: Some(tx),
            _task: task,
        })
    }
}

impl Transport for SimulatedTransport {
    fn kind(&self) -> &'static str {
        "simulator"
    }

    fn send(&self, text: String) -> Result<()> {
        let tx = self.commands.as_ref().ok_or(GazeError::NotConnected)?;
        tx.send(text)
            .map_err(|_| GazeError::Transport("simulator task has exited".to_string()))
    }

    fn close(&mut self) {
        self.commands.take();
    }
}

fn emit(inbound: &InboundSender, record: &Record) {
    match JsonCodec::encode_record(record) {
        Ok(text) => inbound.frame(text),
        Err(e) => warn!("Simulator produced an unencodable record: {}", e),
    }
}

async fn simulator_loop(
    mut simulator: Simulator,
    inbound: InboundSender,
    mut commands: mpsc::UnboundedReceiver<String>,
) {
    info!("Simulator started");
    inbound.opened();
    for record in simulator.announce() {
        emit(&inbound, &record);
    }

    let mut ticker = tokio::time::interval(simulator.config().sample_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(text) => match CommandRequest::from_literal(&text) {
                    Some(request) => {
                        if let Some(record) = simulator.handle_command(request) {
                            emit(&inbound, &record);
                            if simulator.is_tracking() {
                                // First sample one interval after tracking starts.
                                ticker.reset();
                            }
                        }
                    }
                    None => debug!("Simulator ignores unknown command {:?}", text),
                },
                None => break,
            },
            _ = ticker.tick(), if simulator.is_tracking() => {
                if let Some(record) = simulator.next_sample() {
                    emit(&inbound, &record);
                }
            }
        }
    }

    info!("Simulator stopped");
    inbound.closed(CloseReason::Local);
}
