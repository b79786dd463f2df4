use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::gateway_client::GatewayApi;
use crate::metrics::MetricsCollector;
use crate::models::{Instance, PairingCode};
use crate::poller::{PollContext, PollInterval, PollSnapshot, PollerRole, SessionPoller};
use crate::render::{render_instances, InstanceView};
use crate::store::{ExpiringStore, StoreKey};

/// Screens the console can be on. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    LoggedOut,
    RegularActive,
    AdminOverview,
    AdminInstanceOpen,
}

impl ViewState {
    pub fn role(&self) -> RoleIndicator {
        match self {
            ViewState::LoggedOut => RoleIndicator::None,
            ViewState::RegularActive => RoleIndicator::User,
            ViewState::AdminOverview | ViewState::AdminInstanceOpen => RoleIndicator::Admin,
        }
    }

    /// Whether the single-instance dashboard is on screen.
    pub fn shows_instance(&self) -> bool {
        matches!(self, ViewState::RegularActive | ViewState::AdminInstanceOpen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleIndicator {
    None,
    User,
    Admin,
}

impl RoleIndicator {
    pub fn label(&self) -> &'static str {
        match self {
            RoleIndicator::None => "",
            RoleIndicator::User => "USER",
            RoleIndicator::Admin => "ADMIN",
        }
    }
}

/// Owns the session: store, active poller, interval and the latest snapshot.
///
/// Every transition bumps the epoch so snapshots fetched under an older
/// state are dropped by `apply_snapshot`.
pub struct ViewStateController {
    session: SessionConfig,
    store: Arc<ExpiringStore>,
    api: Arc<dyn GatewayApi>,
    interval: PollInterval,
    epoch: Arc<AtomicU64>,
    metrics: Option<Arc<MetricsCollector>>,
    state: ViewState,
    instances: Vec<Instance>,
    poller: Option<SessionPoller>,
    updates_tx: mpsc::UnboundedSender<PollSnapshot>,
    updates_rx: Option<mpsc::UnboundedReceiver<PollSnapshot>>,
}

impl ViewStateController {
    pub fn new(session: SessionConfig, store: Arc<ExpiringStore>, api: Arc<dyn GatewayApi>) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let interval = PollInterval::new(session.poll_interval_ms, session.fast_poll_interval_ms);

        Self {
            session,
            store,
            api,
            interval,
            epoch: Arc::new(AtomicU64::new(0)),
            metrics: None,
            state: ViewState::LoggedOut,
            instances: Vec::new(),
            poller: None,
            updates_tx,
            updates_rx: Some(updates_rx),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Hands out the snapshot stream. Only the first call gets it.
    pub fn take_updates(&mut self) -> Option<mpsc::UnboundedReceiver<PollSnapshot>> {
        self.updates_rx.take()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn role(&self) -> RoleIndicator {
        self.state.role()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn interval(&self) -> &PollInterval {
        &self.interval
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.interval.current_ms()
    }

    pub fn active_poller(&self) -> Option<PollerRole> {
        self.poller
            .as_ref()
            .filter(|p| p.is_running())
            .map(|p| p.role())
    }

    pub fn api(&self) -> &Arc<dyn GatewayApi> {
        &self.api
    }

    pub fn store(&self) -> &Arc<ExpiringStore> {
        &self.store
    }

    pub fn current_instance(&self) -> ConsoleResult<Option<String>> {
        self.store.get_string(StoreKey::CurrentInstance)
    }

    pub fn bearer_token(&self) -> ConsoleResult<Option<String>> {
        self.store.get_string(StoreKey::Token)
    }

    pub fn admin_token(&self) -> ConsoleResult<Option<String>> {
        self.store.get_string(StoreKey::AdminToken)
    }

    pub fn require_bearer_token(&self) -> ConsoleResult<String> {
        self.bearer_token()?
            .ok_or_else(|| ConsoleError::ValidationError("No instance selected".to_string()))
    }

    pub fn require_admin_token(&self) -> ConsoleResult<String> {
        self.admin_token()?
            .ok_or_else(|| ConsoleError::ValidationError("Admin login required".to_string()))
    }

    pub fn view(&self) -> ConsoleResult<InstanceView> {
        let current = self.current_instance()?;
        Ok(render_instances(&self.instances, current.as_deref()))
    }

    /// Re-derives the screen from whatever the store still holds.
    pub async fn restore(&mut self) -> ConsoleResult<ViewState> {
        let token = self.bearer_token()?;
        let admin_token = self.admin_token()?;
        let is_admin = self.store.get::<bool>(StoreKey::IsAdmin)?.unwrap_or(false);

        if token.is_none() && admin_token.is_none() {
            debug!("No stored credentials");
            self.enter_logged_out();
            return Ok(self.state);
        }

        if is_admin {
            return self.probe_admin().await;
        }

        match token {
            Some(_) => self.probe_regular().await,
            None => {
                // Admin token without its flag: nothing coherent to resume.
                self.clear_credentials()?;
                self.enter_logged_out();
                Ok(self.state)
            }
        }
    }

    pub async fn login_regular(&mut self, token: &str) -> ConsoleResult<ViewState> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ConsoleError::ValidationError("Please enter your access token".to_string()));
        }

        info!("🔑 Regular login");
        self.stop_poller();
        self.clear_credentials()?;
        self.store.set(StoreKey::Token, token, self.session.ttl_hours)?;
        self.probe_regular().await
    }

    pub async fn login_admin(&mut self, token: &str) -> ConsoleResult<ViewState> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ConsoleError::ValidationError("Please enter your access token".to_string()));
        }

        info!("🛡️  Admin login");
        self.stop_poller();
        self.clear_credentials()?;
        self.store.set(StoreKey::AdminToken, token, self.session.ttl_hours)?;
        self.store.set(StoreKey::IsAdmin, &true, self.session.ttl_hours)?;
        self.probe_admin().await
    }

    pub fn logout(&mut self) -> ConsoleResult<ViewState> {
        info!("👋 Logging out");
        self.stop_poller();
        self.clear_credentials()?;
        self.enter_logged_out();
        Ok(self.state)
    }

    /// Local switch from the admin list to one instance's dashboard.
    pub fn open_instance(&mut self, id: &str, token: &str) -> ConsoleResult<ViewState> {
        if self.state != ViewState::AdminOverview {
            return Err(ConsoleError::ValidationError(
                "Instances can only be opened from the admin list".to_string(),
            ));
        }

        self.store.set(StoreKey::CurrentInstance, id, self.session.ttl_hours)?;
        self.store.set(StoreKey::Token, token, self.session.ttl_hours)?;
        self.transition(ViewState::AdminInstanceOpen);
        info!("📂 Opened instance {}", id);
        Ok(self.state)
    }

    /// Back to the admin list; resumes the full-list poller.
    pub fn close_instance(&mut self) -> ConsoleResult<ViewState> {
        if self.state != ViewState::AdminInstanceOpen {
            return Err(ConsoleError::ValidationError("No instance is open".to_string()));
        }

        self.store.remove_all(&[StoreKey::CurrentInstance, StoreKey::Token])?;
        self.interval.reset();
        self.transition(ViewState::AdminOverview);
        self.start_poller(PollerRole::Admin);
        Ok(self.state)
    }

    /// Starts the session of `token` (or the stored one) and polls faster
    /// until a status shows it logged in.
    pub async fn connect(&self, token: Option<&str>) -> ConsoleResult<serde_json::Value> {
        let token = match token {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => self.require_bearer_token()?,
        };

        let result = self.api.connect(&token).await;
        self.interval.accelerate();
        if let Some(metrics) = &self.metrics {
            metrics.poll_interval_ms.set(self.interval.current_ms() as i64);
        }
        result
    }

    /// Connects, then requests a linking code for `phone`.
    pub async fn pair_phone(&self, phone: &str) -> ConsoleResult<PairingCode> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(ConsoleError::ValidationError("Please enter a phone number".to_string()));
        }

        let token = self.require_bearer_token()?;
        self.connect(Some(token.as_str())).await?;
        self.api.pair_phone(&token, phone).await
    }

    /// Accepts a snapshot unless it was issued under an older state.
    pub fn apply_snapshot(&mut self, snapshot: PollSnapshot) -> bool {
        if snapshot.epoch != self.epoch() || self.state == ViewState::LoggedOut {
            debug!(
                "Dropping stale {} snapshot (epoch {} vs {})",
                snapshot.role,
                snapshot.epoch,
                self.epoch()
            );
            return false;
        }

        self.instances = snapshot.instances;
        true
    }

    pub fn shutdown(&mut self) {
        self.stop_poller();
    }

    async fn probe_regular(&mut self) -> ConsoleResult<ViewState> {
        let token = self.require_bearer_token()?;

        match self.api.status(&token).await {
            Ok(instance) => {
                self.store
                    .set(StoreKey::CurrentInstance, &instance.id, self.session.ttl_hours)?;
                self.interval.observe(&instance);
                self.instances = vec![instance];
                self.transition(ViewState::RegularActive);
                self.start_poller(PollerRole::Regular);
                Ok(self.state)
            }
            Err(ConsoleError::ApiError(reason)) => {
                warn!("Status probe rejected: {}", reason);
                self.store.remove(StoreKey::Token)?;
                self.enter_logged_out();
                Err(ConsoleError::AuthenticationError("Invalid credentials".to_string()))
            }
            Err(e) => {
                warn!("Status probe failed: {}", e);
                self.enter_logged_out();
                Err(e)
            }
        }
    }

    async fn probe_admin(&mut self) -> ConsoleResult<ViewState> {
        let Some(admin_token) = self.admin_token()? else {
            self.clear_admin_credentials()?;
            self.enter_logged_out();
            return Err(ConsoleError::AuthenticationError("Admin login failed".to_string()));
        };

        match self.api.list_instances(&admin_token).await {
            Ok(instances) => {
                self.instances = instances;
                let next = if self.current_instance()?.is_some() {
                    ViewState::AdminInstanceOpen
                } else {
                    ViewState::AdminOverview
                };
                self.transition(next);
                self.start_poller(PollerRole::Admin);
                Ok(self.state)
            }
            Err(ConsoleError::ApiError(reason)) => {
                warn!("Admin probe rejected: {}", reason);
                self.clear_admin_credentials()?;
                self.enter_logged_out();
                Err(ConsoleError::AuthenticationError("Admin login failed".to_string()))
            }
            Err(e) => {
                warn!("Admin probe failed: {}", e);
                self.enter_logged_out();
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: ViewState) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("View {:?} -> {:?} (epoch {})", self.state, next, epoch);
        self.state = next;
    }

    fn enter_logged_out(&mut self) {
        self.stop_poller();
        self.instances.clear();
        self.interval.reset();
        self.transition(ViewState::LoggedOut);
    }

    /// Only one poller may run; starting one replaces the other.
    fn start_poller(&mut self, role: PollerRole) {
        self.stop_poller();

        let context = PollContext {
            api: Arc::clone(&self.api),
            store: Arc::clone(&self.store),
            interval: self.interval.clone(),
            epoch: Arc::clone(&self.epoch),
            updates: self.updates_tx.clone(),
            metrics: self.metrics.clone(),
        };

        let mut poller = SessionPoller::new(role, context);
        poller.start();
        self.poller = Some(poller);
    }

    fn stop_poller(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
    }

    fn clear_credentials(&self) -> ConsoleResult<()> {
        self.store.remove_all(&StoreKey::ALL)
    }

    fn clear_admin_credentials(&self) -> ConsoleResult<()> {
        self.store
            .remove_all(&[StoreKey::AdminToken, StoreKey::Token, StoreKey::IsAdmin])
    }
}

impl Drop for ViewStateController {
    fn drop(&mut self) {
        self.stop_poller();
    }
}
