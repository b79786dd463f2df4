//! Operator actions behind the dashboard forms. Input is validated here,
//! before any request leaves the console.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{ConsoleError, ConsoleResult};
use crate::gateway_client::GatewayApi;
use crate::models::{ContactRecord, NewInstance, SentMessage, WebhookConfig};

const JID_SUFFIX: &str = "@s.whatsapp.net";

/// Event categories a webhook can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    Message,
    ReadReceipt,
    Presence,
    HistorySync,
    ChatPresence,
    All,
}

impl WebhookEvent {
    pub const CATALOGUE: [WebhookEvent; 6] = [
        WebhookEvent::Message,
        WebhookEvent::ReadReceipt,
        WebhookEvent::Presence,
        WebhookEvent::HistorySync,
        WebhookEvent::ChatPresence,
        WebhookEvent::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::Message => "Message",
            WebhookEvent::ReadReceipt => "ReadReceipt",
            WebhookEvent::Presence => "Presence",
            WebhookEvent::HistorySync => "HistorySync",
            WebhookEvent::ChatPresence => "ChatPresence",
            WebhookEvent::All => "All",
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookEvent {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WebhookEvent::CATALOGUE
            .iter()
            .copied()
            .find(|event| event.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConsoleError::ValidationError(format!("Unknown webhook event: {}", s)))
    }
}

/// Parses the selection; `All` swallows every other entry.
pub fn normalize_events<S: AsRef<str>>(selected: &[S]) -> ConsoleResult<Vec<String>> {
    let mut events: Vec<WebhookEvent> = Vec::new();
    for raw in selected {
        let event = raw.as_ref().parse::<WebhookEvent>()?;
        if !events.contains(&event) {
            events.push(event);
        }
    }

    if events.contains(&WebhookEvent::All) {
        return Ok(vec![WebhookEvent::All.to_string()]);
    }
    Ok(events.iter().map(|e| e.to_string()).collect())
}

/// `5511999` and `5511999@anything` both become `5511999@s.whatsapp.net`.
pub fn normalize_jid(phone: &str) -> ConsoleResult<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ConsoleError::ValidationError("Please enter a phone number".to_string()));
    }
    if phone.ends_with(JID_SUFFIX) {
        return Ok(phone.to_string());
    }
    let user = phone.split('@').next().unwrap_or(phone);
    Ok(format!("{}{}", user, JID_SUFFIX))
}

fn require(value: &str, prompt: &str) -> ConsoleResult<()> {
    if value.trim().is_empty() {
        Err(ConsoleError::ValidationError(prompt.to_string()))
    } else {
        Ok(())
    }
}

pub fn validate_new_instance(instance: &NewInstance) -> ConsoleResult<()> {
    require(&instance.name, "Please enter a name for the instance")?;
    require(&instance.token, "Please enter an authentication token for the instance")?;
    if instance.events.is_empty() {
        return Err(ConsoleError::ValidationError("Please select at least one event".to_string()));
    }
    Ok(())
}

pub async fn create_instance(
    api: &dyn GatewayApi,
    admin_token: &str,
    instance: &NewInstance,
) -> ConsoleResult<serde_json::Value> {
    validate_new_instance(instance)?;
    let mut instance = instance.clone();
    instance.events = normalize_events(&instance.events)?;

    let created = api.create_instance(admin_token, &instance).await?;
    info!("➕ Created instance {}", instance.name);
    Ok(created)
}

pub async fn delete_instance(api: &dyn GatewayApi, admin_token: &str, id: &str) -> ConsoleResult<()> {
    require(id, "Please choose an instance to delete")?;
    api.delete_instance(admin_token, id.trim()).await?;
    info!("🗑️  Deleted instance {}", id);
    Ok(())
}

/// Sends `body` to `phone` under a freshly generated message id.
pub async fn send_text(api: &dyn GatewayApi, token: &str, phone: &str, body: &str) -> ConsoleResult<SentMessage> {
    require(phone, "Please enter a phone number")?;
    require(body, "Please enter a message")?;
    let id = uuid::Uuid::new_v4().to_string();
    api.send_text(token, phone.trim(), body, &id).await
}

pub async fn delete_message(api: &dyn GatewayApi, token: &str, phone: &str, id: &str) -> ConsoleResult<()> {
    require(phone, "Please enter a phone number")?;
    require(id, "Please enter the message id")?;
    api.delete_message(token, phone.trim(), id.trim()).await?;
    Ok(())
}

pub async fn set_webhook<S: AsRef<str>>(
    api: &dyn GatewayApi,
    token: &str,
    url: &str,
    selected: &[S],
) -> ConsoleResult<WebhookConfig> {
    let events = normalize_events(selected)?;
    api.set_webhook(token, url.trim(), &events).await?;
    Ok(WebhookConfig {
        webhook: url.trim().to_string(),
        subscribe: events,
    })
}

/// Profile lines for one looked-up number.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub phone: String,
    pub status: String,
    pub verified_name: String,
    pub devices: usize,
}

pub async fn user_info(api: &dyn GatewayApi, token: &str, phone: &str) -> ConsoleResult<Vec<UserSummary>> {
    let jid = normalize_jid(phone)?;
    let response = api.user_info(token, &[jid]).await?;

    let mut summaries: Vec<UserSummary> = response
        .users
        .into_iter()
        .map(|(jid, details)| UserSummary {
            phone: jid.split('@').next().unwrap_or(&jid).to_string(),
            status: details
                .status
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Not available".to_string()),
            verified_name: describe_verified_name(&details.verified_name),
            devices: details.devices.len(),
        })
        .collect();
    summaries.sort_by(|a, b| a.phone.cmp(&b.phone));
    Ok(summaries)
}

fn describe_verified_name(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "Not verified".to_string(),
        serde_json::Value::String(s) if s.is_empty() => "Not verified".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other
            .pointer("/Details/verifiedName")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

pub async fn user_avatar(api: &dyn GatewayApi, token: &str, phone: &str) -> ConsoleResult<Option<String>> {
    let jid = normalize_jid(phone)?;
    let avatar = api.user_avatar(token, &jid).await?;
    Ok(avatar.url.filter(|u| !u.is_empty()))
}

/// Flattens the contact map into exportable records, sorted by phone.
pub async fn export_contacts(api: &dyn GatewayApi, token: &str) -> ConsoleResult<Vec<ContactRecord>> {
    let contacts = api.contacts(token).await?;

    let mut records: Vec<ContactRecord> = contacts
        .into_iter()
        .map(|(jid, contact)| ContactRecord {
            full_name: contact.full_name.unwrap_or_default(),
            push_name: contact.push_name.unwrap_or_default(),
            phone: jid.split('@').next().unwrap_or(&jid).to_string(),
        })
        .collect();
    records.sort_by(|a, b| a.phone.cmp(&b.phone));
    Ok(records)
}

pub async fn write_contacts<P: AsRef<Path>>(records: &[ContactRecord], path: P) -> ConsoleResult<()> {
    let json = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path.as_ref(), json).await?;
    info!("📇 Exported {} contacts to {}", records.len(), path.as_ref().display());
    Ok(())
}

/// Decodes a `data:image/png;base64,...` QR code into image bytes.
pub fn decode_qr_image(data_url: &str) -> ConsoleResult<Vec<u8>> {
    let encoded = match data_url.split_once(";base64,") {
        Some((_, payload)) => payload,
        None => data_url,
    };
    if encoded.trim().is_empty() {
        return Err(ConsoleError::ApiError("QR code not available yet".to_string()));
    }
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| ConsoleError::ApiError(format!("Malformed QR image: {}", e)))
}
