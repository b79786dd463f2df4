//! Repeating status fetchers, one per operator role.
//!
//! A poller fetches, publishes a snapshot, then sleeps for the current
//! interval before the next fetch. Failed fetches are logged and skipped;
//! the poller keeps going at the same interval until stopped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, ConsoleResult};
use crate::gateway_client::GatewayApi;
use crate::metrics::MetricsCollector;
use crate::models::Instance;
use crate::store::{ExpiringStore, StoreKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerRole {
    Regular,
    Admin,
}

impl fmt::Display for PollerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollerRole::Regular => f.write_str("regular"),
            PollerRole::Admin => f.write_str("admin"),
        }
    }
}

/// Instances fetched by one poll, tagged with the controller epoch that
/// was current when the fetch was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub epoch: u64,
    pub role: PollerRole,
    pub instances: Vec<Instance>,
}

/// Delay between fetches, shared by the controller and the active poller.
#[derive(Clone)]
pub struct PollInterval {
    inner: Arc<IntervalInner>,
}

struct IntervalInner {
    current_ms: AtomicU64,
    normal_ms: u64,
    fast_ms: u64,
    changed: Notify,
}

impl PollInterval {
    pub fn new(normal_ms: u64, fast_ms: u64) -> Self {
        Self {
            inner: Arc::new(IntervalInner {
                current_ms: AtomicU64::new(normal_ms),
                normal_ms,
                fast_ms,
                changed: Notify::new(),
            }),
        }
    }

    pub fn current_ms(&self) -> u64 {
        self.inner.current_ms.load(Ordering::SeqCst)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.current_ms())
    }

    /// Switches to the fast interval and wakes a sleeping poller.
    pub fn accelerate(&self) {
        let previous = self.inner.current_ms.swap(self.inner.fast_ms, Ordering::SeqCst);
        if previous != self.inner.fast_ms {
            debug!("Poll interval {}ms -> {}ms", previous, self.inner.fast_ms);
            self.inner.changed.notify_waiters();
        }
    }

    pub fn reset(&self) {
        let previous = self.inner.current_ms.swap(self.inner.normal_ms, Ordering::SeqCst);
        if previous != self.inner.normal_ms {
            debug!("Poll interval {}ms -> {}ms", previous, self.inner.normal_ms);
        }
    }

    /// A logged-in status ends the pairing window.
    pub fn observe(&self, instance: &Instance) {
        if instance.logged_in {
            self.reset();
        }
    }

    async fn changed(&self) {
        self.inner.changed.notified().await;
    }
}

/// Everything a poll loop needs, cloned into the spawned task.
#[derive(Clone)]
pub struct PollContext {
    pub api: Arc<dyn GatewayApi>,
    pub store: Arc<ExpiringStore>,
    pub interval: PollInterval,
    pub epoch: Arc<AtomicU64>,
    pub updates: mpsc::UnboundedSender<PollSnapshot>,
    pub metrics: Option<Arc<MetricsCollector>>,
}

pub struct SessionPoller {
    role: PollerRole,
    context: PollContext,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl SessionPoller {
    pub fn new(role: PollerRole, context: PollContext) -> Self {
        Self {
            role,
            context,
            running: None,
        }
    }

    pub fn role(&self) -> PollerRole {
        self.role
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|(_, handle)| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Cancels any pending fire, fetches immediately, then keeps polling.
    pub fn start(&mut self) {
        self.stop();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(self.role, self.context.clone(), cancel.clone()));
        info!("🔄 Started {} poller ({}ms)", self.role, self.context.interval.current_ms());
        self.running = Some((cancel, handle));
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some((cancel, handle)) = self.running.take() {
            cancel.cancel();
            handle.abort();
            info!("⏹️  Stopped {} poller", self.role);
        }
    }
}

impl Drop for SessionPoller {
    fn drop(&mut self) {
        if let Some((cancel, handle)) = self.running.take() {
            cancel.cancel();
            handle.abort();
        }
    }
}

async fn run_loop(role: PollerRole, ctx: PollContext, cancel: CancellationToken) {
    loop {
        let epoch = ctx.epoch.load(Ordering::SeqCst);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = poll_once(role, &ctx) => outcome,
        };

        if let Some(metrics) = &ctx.metrics {
            metrics.record_poll(outcome.is_ok());
            metrics.poll_interval_ms.set(ctx.interval.current_ms() as i64);
        }

        match outcome {
            Ok(instances) => {
                let snapshot = PollSnapshot {
                    epoch,
                    role,
                    instances,
                };
                if ctx.updates.send(snapshot).is_err() {
                    debug!("{} poller has no listener, exiting", role);
                    break;
                }
            }
            Err(e) => warn!("{} poll skipped: {}", role, e),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(ctx.interval.duration()) => {}
            _ = ctx.interval.changed() => {}
        }
    }
}

/// One fetch for `role`, resolving its target from the store.
///
/// The regular role always targets the single instance bound to the
/// bearer token. The admin role lists every instance unless one is open.
pub async fn poll_once(role: PollerRole, ctx: &PollContext) -> ConsoleResult<Vec<Instance>> {
    let single_instance = match role {
        PollerRole::Regular => true,
        PollerRole::Admin => ctx.store.contains(StoreKey::CurrentInstance)?,
    };

    if single_instance {
        let token = ctx
            .store
            .get_string(StoreKey::Token)?
            .ok_or_else(|| ConsoleError::AuthenticationError("No instance token stored".to_string()))?;
        let instance = ctx.api.status(&token).await?;
        ctx.interval.observe(&instance);
        Ok(vec![instance])
    } else {
        let admin_token = ctx
            .store
            .get_string(StoreKey::AdminToken)?
            .ok_or_else(|| ConsoleError::AuthenticationError("No admin token stored".to_string()))?;
        ctx.api.list_instances(&admin_token).await
    }
}
