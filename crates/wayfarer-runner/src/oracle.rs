//! The shared decision oracle client.
//!
//! [`OracleClient`] is created once per process and shared by every agent
//! through an `Arc`. It never retries: a failed call yields `None` and the
//! agent's scheduler decides when to ask again.
//!
//! On the first HTTP 429 the client switches to the secondary credential.
//! The switch happens at most once for the lifetime of the client, guarded by
//! an `AtomicBool` so concurrent calls on the multi-threaded runtime cannot
//! rotate twice.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};
use wayfarer_core::RenderedPrompt;

use crate::error::OracleError;
use crate::llm::LlmBackend;

/// Something that can carry a prompt to the oracle.
pub trait OracleTransport: Send + Sync {
    /// Send `prompt` authenticated with `api_key`.
    fn complete(
        &self,
        prompt: &RenderedPrompt,
        api_key: &str,
    ) -> impl Future<Output = Result<String, OracleError>> + Send;

    /// Name for logs.
    fn name(&self) -> &'static str;
}

impl OracleTransport for LlmBackend {
    fn complete(
        &self,
        prompt: &RenderedPrompt,
        api_key: &str,
    ) -> impl Future<Output = Result<String, OracleError>> + Send {
        Self::complete(self, prompt, api_key)
    }

    fn name(&self) -> &'static str {
        Self::name(self)
    }
}

/// Process-wide oracle client with one-shot credential rotation.
pub struct OracleClient<T> {
    transport: T,
    primary_key: String,
    secondary_key: Option<String>,
    rotated: AtomicBool,
}

impl<T: OracleTransport> OracleClient<T> {
    /// Create a client using `primary_key` until the first rate limit.
    pub const fn new(transport: T, primary_key: String, secondary_key: Option<String>) -> Self {
        Self {
            transport,
            primary_key,
            secondary_key,
            rotated: AtomicBool::new(false),
        }
    }

    /// Whether the client has switched to the secondary credential.
    pub fn has_rotated(&self) -> bool {
        self.rotated.load(Ordering::Acquire)
    }

    fn active_key(&self) -> &str {
        match &self.secondary_key {
            Some(secondary) if self.has_rotated() => secondary,
            _ => &self.primary_key,
        }
    }

    /// Ask the oracle. Any failure yields `None`.
    pub async fn invoke(&self, prompt: &RenderedPrompt) -> Option<String> {
        match self.transport.complete(prompt, self.active_key()).await {
            Ok(text) => {
                debug!(backend = self.transport.name(), chars = text.len(), "oracle answered");
                Some(text)
            }
            Err(OracleError::RateLimited) => {
                self.rotate();
                None
            }
            Err(e) => {
                warn!(backend = self.transport.name(), error = %e, "oracle call failed");
                None
            }
        }
    }

    fn rotate(&self) {
        if self.secondary_key.is_none() {
            warn!(backend = self.transport.name(), "rate limited, no secondary credential configured");
            return;
        }
        match self
            .rotated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => warn!(backend = self.transport.name(), "rate limited, rotated to secondary credential"),
            Err(_) => warn!(backend = self.transport.name(), "rate limited, credential already rotated"),
        }
    }
}
