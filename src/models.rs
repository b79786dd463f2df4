use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Server-owned account record. The console only ever reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub jid: Option<String>,
    #[serde(default)]
    pub webhook: Option<String>,
    #[serde(default)]
    pub events: Option<String>,
    #[serde(default)]
    pub qrcode: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Form input for a new instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewInstance {
    pub name: String,
    pub token: String,
    pub events: Vec<String>,
    pub webhook: Option<String>,
    pub proxy_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateInstanceBody<'a> {
    pub name: &'a str,
    pub token: &'a str,
    pub events: String,
    pub webhook: &'a str,
    pub proxy_url: &'a str,
    pub expiration: u64,
}

impl<'a> From<&'a NewInstance> for CreateInstanceBody<'a> {
    fn from(instance: &'a NewInstance) -> Self {
        Self {
            name: &instance.name,
            token: &instance.token,
            events: instance.events.join(","),
            webhook: instance.webhook.as_deref().unwrap_or(""),
            proxy_url: instance.proxy_url.as_deref().unwrap_or(""),
            expiration: 0,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ConnectBody {
    pub events: &'static str,
    pub immediate: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PhoneBody<'a> {
    pub phone: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PairingCode {
    #[serde(rename = "LinkingCode")]
    pub linking_code: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QrCode {
    #[serde(rename = "QRCode", default)]
    pub qr_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub webhook: String,
    #[serde(default)]
    pub subscribe: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetWebhookBody<'a> {
    #[serde(rename = "WebhookURL")]
    pub webhook_url: &'a str,
    pub events: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SendTextBody<'a> {
    pub phone: &'a str,
    pub body: &'a str,
    pub id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SentMessage {
    #[serde(rename = "Id")]
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeleteMessageBody<'a> {
    pub phone: &'a str,
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserInfoBody<'a> {
    pub phone: &'a [String],
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserInfoResponse {
    #[serde(rename = "Users", default)]
    pub users: HashMap<String, UserDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDetails {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub verified_name: serde_json::Value,
    #[serde(default)]
    pub devices: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AvatarBody<'a> {
    pub phone: &'a str,
    pub preview: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Avatar {
    #[serde(default, alias = "URL")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub push_name: Option<String>,
}

/// One line of an exported address book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactRecord {
    pub full_name: String,
    pub push_name: String,
    pub phone: String,
}
