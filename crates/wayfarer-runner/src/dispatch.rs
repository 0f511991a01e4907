//! Asynchronous oracle dispatch.
//!
//! Each [`DecisionRequest`] becomes one spawned task bounded by a transport
//! timeout. Results come back to the tick loop over an unbounded channel and
//! are handed to the owning agent on the next tick. A timed-out call reports
//! `None` like any other failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use wayfarer_agents::DecisionRequest;
use wayfarer_types::EntityId;

use crate::oracle::{OracleClient, OracleTransport};

/// The oracle's answer to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionResponse {
    /// Agent that asked.
    pub agent_id: EntityId,
    /// Sequence number of the request.
    pub seq: u64,
    /// Response text, `None` on failure or timeout.
    pub text: Option<String>,
}

/// Spawns oracle calls and funnels their results into one channel.
pub struct Dispatcher<T> {
    oracle: Arc<OracleClient<T>>,
    timeout: Duration,
    tx: mpsc::UnboundedSender<DecisionResponse>,
}

impl<T: OracleTransport + 'static> Dispatcher<T> {
    /// Create a dispatcher and the receiving end of its result channel.
    pub fn new(
        oracle: Arc<OracleClient<T>>,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<DecisionResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                oracle,
                timeout,
                tx,
            },
            rx,
        )
    }

    /// Start the oracle call for `request` in the background.
    pub fn dispatch(&self, request: DecisionRequest) {
        let oracle = Arc::clone(&self.oracle);
        let tx = self.tx.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let text = match tokio::time::timeout(timeout, oracle.invoke(&request.prompt)).await {
                Ok(text) => text,
                Err(_) => {
                    warn!(
                        agent = %request.agent_id,
                        seq = request.seq,
                        timeout_ms = timeout.as_millis(),
                        "oracle call timed out"
                    );
                    None
                }
            };
            let response = DecisionResponse {
                agent_id: request.agent_id,
                seq: request.seq,
                text,
            };
            if tx.send(response).is_err() {
                debug!("tick loop gone, dropping oracle response");
            }
        });
    }
}
