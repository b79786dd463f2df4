#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use gateway_console::clock::ManualClock;
use gateway_console::config::SessionConfig;
use gateway_console::error::{ConsoleError, ConsoleResult};
use gateway_console::models::{
    Avatar, Contact, Instance, NewInstance, PairingCode, QrCode, SentMessage, UserInfoResponse, WebhookConfig,
};
use gateway_console::{ExpiringStore, GatewayApi, ViewStateController};

pub const ADMIN_TOKEN: &str = "admin-secret";
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// In-memory gateway keyed by instance token. Records every call.
pub struct FakeGateway {
    instances: Mutex<Vec<Instance>>,
    calls: Mutex<Vec<(String, String)>>,
    offline: AtomicBool,
}

impl FakeGateway {
    pub fn new(instances: Vec<Instance>) -> Arc<Self> {
        Arc::new(Self {
            instances: Mutex::new(instances),
            calls: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
        })
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_logged_in(&self, token: &str, logged_in: bool) {
        let mut instances = self.instances.lock().unwrap();
        if let Some(instance) = instances.iter_mut().find(|i| i.token == token) {
            instance.logged_in = logged_in;
            instance.connected = instance.connected || logged_in;
        }
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(m, _)| m == method).count()
    }

    pub fn count_with(&self, method: &str, token: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, t)| m == method && t == token)
            .count()
    }

    fn record(&self, method: &str, token: &str) -> ConsoleResult<()> {
        self.calls.lock().unwrap().push((method.to_string(), token.to_string()));
        if self.offline.load(Ordering::SeqCst) {
            return Err(ConsoleError::NetworkError("connection refused".to_string()));
        }
        Ok(())
    }

    fn by_token(&self, token: &str) -> ConsoleResult<Instance> {
        self.instances
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.token == token)
            .cloned()
            .ok_or_else(|| ConsoleError::ApiError("unauthorized".to_string()))
    }

    fn check_admin(&self, token: &str) -> ConsoleResult<()> {
        if token == ADMIN_TOKEN {
            Ok(())
        } else {
            Err(ConsoleError::ApiError("unauthorized".to_string()))
        }
    }
}

#[async_trait]
impl GatewayApi for FakeGateway {
    async fn list_instances(&self, admin_token: &str) -> ConsoleResult<Vec<Instance>> {
        self.record("list_instances", admin_token)?;
        self.check_admin(admin_token)?;
        Ok(self.instances.lock().unwrap().clone())
    }

    async fn create_instance(&self, admin_token: &str, instance: &NewInstance) -> ConsoleResult<Value> {
        self.record("create_instance", admin_token)?;
        self.check_admin(admin_token)?;
        let mut instances = self.instances.lock().unwrap();
        let id = (instances.len() + 1).to_string();
        instances.push(instance_record(&id, &instance.token, false, false));
        Ok(json!({"id": id}))
    }

    async fn delete_instance(&self, admin_token: &str, id: &str) -> ConsoleResult<Value> {
        self.record("delete_instance", admin_token)?;
        self.check_admin(admin_token)?;
        self.instances.lock().unwrap().retain(|i| i.id != id);
        Ok(json!({}))
    }

    async fn connect(&self, token: &str) -> ConsoleResult<Value> {
        self.record("connect", token)?;
        self.by_token(token)?;
        let mut instances = self.instances.lock().unwrap();
        if let Some(instance) = instances.iter_mut().find(|i| i.token == token) {
            instance.connected = true;
        }
        Ok(json!({"details": "Connected!"}))
    }

    async fn disconnect(&self, token: &str) -> ConsoleResult<Value> {
        self.record("disconnect", token)?;
        self.by_token(token)?;
        Ok(json!({}))
    }

    async fn status(&self, token: &str) -> ConsoleResult<Instance> {
        self.record("status", token)?;
        self.by_token(token)
    }

    async fn pair_phone(&self, token: &str, _phone: &str) -> ConsoleResult<PairingCode> {
        self.record("pair_phone", token)?;
        self.by_token(token)?;
        Ok(PairingCode {
            linking_code: "ABCD-EFGH".to_string(),
        })
    }

    async fn logout(&self, token: &str) -> ConsoleResult<Value> {
        self.record("logout", token)?;
        self.set_logged_in(token, false);
        Ok(json!({}))
    }

    async fn qr_code(&self, token: &str) -> ConsoleResult<QrCode> {
        self.record("qr_code", token)?;
        Ok(QrCode {
            qr_code: "data:image/png;base64,iVBORw0K".to_string(),
        })
    }

    async fn get_webhook(&self, token: &str) -> ConsoleResult<WebhookConfig> {
        self.record("get_webhook", token)?;
        Ok(WebhookConfig::default())
    }

    async fn set_webhook(&self, token: &str, _url: &str, _events: &[String]) -> ConsoleResult<Value> {
        self.record("set_webhook", token)?;
        Ok(json!({}))
    }

    async fn send_text(&self, token: &str, _phone: &str, _body: &str, id: &str) -> ConsoleResult<SentMessage> {
        self.record("send_text", token)?;
        Ok(SentMessage { id: id.to_string() })
    }

    async fn delete_message(&self, token: &str, _phone: &str, _id: &str) -> ConsoleResult<Value> {
        self.record("delete_message", token)?;
        Ok(json!({}))
    }

    async fn user_info(&self, token: &str, _jids: &[String]) -> ConsoleResult<UserInfoResponse> {
        self.record("user_info", token)?;
        Ok(UserInfoResponse::default())
    }

    async fn user_avatar(&self, token: &str, _jid: &str) -> ConsoleResult<Avatar> {
        self.record("user_avatar", token)?;
        Ok(Avatar::default())
    }

    async fn contacts(&self, token: &str) -> ConsoleResult<HashMap<String, Contact>> {
        self.record("contacts", token)?;
        Ok(HashMap::new())
    }
}

pub fn instance_record(id: &str, token: &str, connected: bool, logged_in: bool) -> Instance {
    Instance {
        id: id.to_string(),
        name: format!("instance-{}", id),
        token: token.to_string(),
        connected,
        logged_in,
        jid: None,
        webhook: None,
        events: None,
        qrcode: None,
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        ttl_hours: 6,
        poll_interval_ms: 5000,
        fast_poll_interval_ms: 1000,
    }
}

pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub clock: ManualClock,
    pub store: Arc<ExpiringStore>,
}

impl Harness {
    pub fn new(instances: Vec<Instance>) -> Self {
        let clock = ManualClock::new(START_MILLIS);
        let store = Arc::new(ExpiringStore::in_memory(Arc::new(clock.clone())).unwrap());
        Self {
            gateway: FakeGateway::new(instances),
            clock,
            store,
        }
    }

    pub fn controller(&self) -> ViewStateController {
        let api: Arc<dyn GatewayApi> = self.gateway.clone();
        ViewStateController::new(session_config(), Arc::clone(&self.store), api)
    }
}
