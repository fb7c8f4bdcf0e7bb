//! Lazily loaded in-process model shared by the fastembed providers.
//!
//! The model is created on first use inside `spawn_blocking` (loading may
//! download weights) and cached for later calls. Every call is bounded by
//! `tokio::time::timeout`; on expiry the caller gets an error while the
//! blocking task finishes in the background and leaves the model cached.

use anyhow::{anyhow, bail, Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct LazyModel<M> {
    slot: Arc<Mutex<Option<M>>>,
    label: &'static str,
    timeout: Duration,
}

impl<M: Send + 'static> LazyModel<M> {
    pub fn new(label: &'static str, timeout: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            label,
            timeout,
        }
    }

    /// Run `f` against the model, creating it with `init` if needed.
    pub async fn run<T, I, F>(&self, init: I, f: F) -> Result<T>
    where
        T: Send + 'static,
        I: FnOnce() -> Result<M> + Send + 'static,
        F: FnOnce(&mut M) -> Result<T> + Send + 'static,
    {
        let slot = self.slot.clone();
        let label = self.label;

        let handle = tokio::task::spawn_blocking(move || {
            let mut guard = slot
                .lock()
                .map_err(|_| anyhow!("{} model lock poisoned", label))?;
            if guard.is_none() {
                tracing::info!(model = label, "loading local model");
                *guard = Some(init()?);
            }
            let model = guard
                .as_mut()
                .ok_or_else(|| anyhow!("{} model failed to load", label))?;
            f(model)
        });

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(joined) => joined.with_context(|| format!("{} task panicked", label))?,
            Err(_) => bail!("{} timed out after {}s", label, self.timeout.as_secs()),
        }
    }
}
