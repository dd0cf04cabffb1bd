//! Network reachability monitor.
//!
//! Two independent input channels feed one authoritative state machine:
//! passive platform online/offline events (immediate but unreliable) and an
//! active reachability probe polled on an interval (ground truth). Both
//! funnel through a single transition-detection point, so duplicate or
//! conflicting signals never produce duplicate notifications; a platform
//! signal the probe disagrees with is corrected on the next poll cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::util::{is_http_url, normalize_text_option};

/// Polling cadence and probe timeout.
#[derive(Debug, Clone)]
pub struct ConnectivityConfig {
    /// How often the active probe runs.
    pub poll_interval: Duration,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Answers "can we actually reach the backend right now".
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probe that issues a lightweight HEAD request with a short timeout.
pub struct HttpReachabilityProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpReachabilityProbe {
    /// Default probe timeout; a reachability check must answer fast.
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    /// Build a probe against a known health endpoint.
    pub fn new(url: impl Into<String>) -> Result<Self, String> {
        let url = normalize_text_option(Some(url.into()))
            .ok_or_else(|| "Probe URL must not be empty".to_string())?;
        if !is_http_url(&url) {
            return Err("Probe URL must include http:// or https://".to_string());
        }

        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|error| format!("Failed to construct HTTP client: {error}"))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachabilityProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::debug!(%error, "Reachability probe failed");
                false
            }
        }
    }
}

type ChangeListener = Box<dyn Fn(bool) + Send + Sync>;
type ReconnectHook = Box<dyn FnOnce() + Send>;

struct MonitorInner {
    online: AtomicBool,
    listeners: Mutex<Vec<(u64, ChangeListener)>>,
    reconnect_hooks: Mutex<Vec<ReconnectHook>>,
    next_listener_id: AtomicU64,
}

impl MonitorInner {
    /// The single transition-detection point for both input channels.
    fn apply(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }

        tracing::info!(online, "Connectivity changed");
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, listener) in listeners.iter() {
            listener(online);
        }
        drop(listeners);

        if online {
            let hooks: Vec<ReconnectHook> = {
                let mut hooks = self
                    .reconnect_hooks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                hooks.drain(..).collect()
            };
            for hook in hooks {
                hook();
            }
        }
    }
}

/// Merges platform signals and active polling into one `is_online` boolean.
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
    poll_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl ConnectivityMonitor {
    /// Start monitoring. `initial_online` seeds the state from whatever the
    /// platform last reported; the first poll cycle corrects it if wrong.
    #[must_use]
    pub fn new(
        initial_online: bool,
        probe: Arc<dyn ReachabilityProbe>,
        config: ConnectivityConfig,
    ) -> Self {
        let inner = Arc::new(MonitorInner {
            online: AtomicBool::new(initial_online),
            listeners: Mutex::new(Vec::new()),
            reconnect_hooks: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
        });

        let poll_inner = Arc::clone(&inner);
        let poll_task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(config.poll_interval).await;
                let reachable = probe.is_reachable().await;
                tracing::debug!(reachable, "Connectivity poll");
                poll_inner.apply(reachable);
            }
        });

        Self {
            inner,
            poll_task: Mutex::new(Some(poll_task)),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Current authoritative state.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Feed a passive platform online/offline event.
    pub fn handle_platform_event(&self, online: bool) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        self.inner.apply(online);
    }

    /// Subscribe to state flips. The callback runs synchronously inside the
    /// transition and only when the boolean actually changes.
    pub fn on_change(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> u64 {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Box::new(listener)));
        id
    }

    /// Remove a subscription by the id `on_change` returned.
    pub fn remove_listener(&self, id: u64) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Arm a one-shot hook for the next offline-to-online transition.
    ///
    /// Arms only while offline (there is nothing to wait for otherwise) and
    /// detaches itself after firing. Returns whether a hook was armed.
    pub fn on_reconnect(&self, hook: impl FnOnce() + Send + 'static) -> bool {
        if self.destroyed.load(Ordering::SeqCst) || self.is_online() {
            return false;
        }
        self.inner
            .reconnect_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
        true
    }

    /// Stop polling and drop every subscriber. Idempotent; leaves no timers.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(task) = self
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner
            .reconnect_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.destroy();
    }
}
