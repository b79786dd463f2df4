use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::Config;
use crate::envelope::Envelope;
use crate::error::{ConsoleError, ConsoleResult};
use crate::metrics::MetricsCollector;
use crate::models::{
    Avatar, AvatarBody, ConnectBody, Contact, CreateInstanceBody, DeleteMessageBody, Instance,
    NewInstance, PairingCode, PhoneBody, QrCode, SendTextBody, SentMessage, SetWebhookBody,
    UserInfoBody, UserInfoResponse, WebhookConfig,
};

/// Every gateway call the console makes. Each method is one HTTP request.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    async fn list_instances(&self, admin_token: &str) -> ConsoleResult<Vec<Instance>>;
    async fn create_instance(&self, admin_token: &str, instance: &NewInstance) -> ConsoleResult<serde_json::Value>;
    async fn delete_instance(&self, admin_token: &str, id: &str) -> ConsoleResult<serde_json::Value>;

    async fn connect(&self, token: &str) -> ConsoleResult<serde_json::Value>;
    async fn disconnect(&self, token: &str) -> ConsoleResult<serde_json::Value>;
    async fn status(&self, token: &str) -> ConsoleResult<Instance>;
    async fn pair_phone(&self, token: &str, phone: &str) -> ConsoleResult<PairingCode>;
    async fn logout(&self, token: &str) -> ConsoleResult<serde_json::Value>;
    async fn qr_code(&self, token: &str) -> ConsoleResult<QrCode>;

    async fn get_webhook(&self, token: &str) -> ConsoleResult<WebhookConfig>;
    async fn set_webhook(&self, token: &str, url: &str, events: &[String]) -> ConsoleResult<serde_json::Value>;

    async fn send_text(&self, token: &str, phone: &str, body: &str, id: &str) -> ConsoleResult<SentMessage>;
    async fn delete_message(&self, token: &str, phone: &str, id: &str) -> ConsoleResult<serde_json::Value>;

    async fn user_info(&self, token: &str, jids: &[String]) -> ConsoleResult<UserInfoResponse>;
    async fn user_avatar(&self, token: &str, jid: &str) -> ConsoleResult<Avatar>;
    async fn contacts(&self, token: &str) -> ConsoleResult<HashMap<String, Contact>>;
}

/// Which credential header a request carries.
#[derive(Debug, Clone, Copy)]
enum Auth<'a> {
    Token(&'a str),
    Admin(&'a str),
}

/// reqwest-backed gateway client
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    metrics: Option<Arc<MetricsCollector>>,
}

impl GatewayClient {
    pub fn new(config: &Config) -> ConsoleResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.gateway.base_url.trim_end_matches('/').to_string(),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        route: &str,
        auth: Auth<'_>,
        body: Option<&B>,
    ) -> ConsoleResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let start = Instant::now();
        let result = self
            .send(method.clone(), path, auth, body)
            .await
            .and_then(|envelope| envelope.into_result::<T>());
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        if let Some(metrics) = &self.metrics {
            metrics.record_request(route, elapsed_ms, result.is_ok());
        }

        match &result {
            Ok(_) => debug!("{} {} ok in {:.1}ms", method, route, elapsed_ms),
            Err(e) => warn!("{} {} failed in {:.1}ms: {}", method, route, elapsed_ms, e),
        }

        result
    }

    async fn send<B>(&self, method: Method, path: &str, auth: Auth<'_>, body: Option<&B>) -> ConsoleResult<Envelope>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);

        request = match auth {
            Auth::Token(token) => request.header("token", token),
            Auth::Admin(token) => request.header("authorization", token),
        };

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        serde_json::from_str::<Envelope>(&text).map_err(|_| {
            ConsoleError::NetworkError(format!("{} returned {} with a non-envelope body", path, status))
        })
    }
}

/// Percent-encodes `segment` so it stays a single path segment.
fn encode_segment(segment: &str) -> ConsoleResult<String> {
    let mut url = reqwest::Url::parse("http://gateway.invalid/")
        .map_err(|e| ConsoleError::ValidationError(format!("Invalid path base: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| ConsoleError::ValidationError("Cannot build request path".to_string()))?
        .clear()
        .push(segment);
    Ok(url.path().trim_start_matches('/').to_string())
}

#[async_trait]
impl GatewayApi for GatewayClient {
    async fn list_instances(&self, admin_token: &str) -> ConsoleResult<Vec<Instance>> {
        self.call::<_, ()>(Method::GET, "/admin/users", "/admin/users", Auth::Admin(admin_token), None)
            .await
    }

    async fn create_instance(&self, admin_token: &str, instance: &NewInstance) -> ConsoleResult<serde_json::Value> {
        let body = CreateInstanceBody::from(instance);
        self.call(Method::POST, "/admin/users", "/admin/users", Auth::Admin(admin_token), Some(&body))
            .await
    }

    async fn delete_instance(&self, admin_token: &str, id: &str) -> ConsoleResult<serde_json::Value> {
        let path = format!("/admin/users/{}/full", encode_segment(id)?);
        self.call::<_, ()>(Method::DELETE, &path, "/admin/users/{id}/full", Auth::Admin(admin_token), None)
            .await
    }

    async fn connect(&self, token: &str) -> ConsoleResult<serde_json::Value> {
        let body = ConnectBody { events: "All", immediate: true };
        self.call(Method::POST, "/session/connect", "/session/connect", Auth::Token(token), Some(&body))
            .await
    }

    async fn disconnect(&self, token: &str) -> ConsoleResult<serde_json::Value> {
        self.call::<_, ()>(Method::POST, "/session/disconnect", "/session/disconnect", Auth::Token(token), None)
            .await
    }

    async fn status(&self, token: &str) -> ConsoleResult<Instance> {
        self.call::<_, ()>(Method::GET, "/session/status", "/session/status", Auth::Token(token), None)
            .await
    }

    async fn pair_phone(&self, token: &str, phone: &str) -> ConsoleResult<PairingCode> {
        let body = PhoneBody { phone };
        self.call(Method::POST, "/session/pairphone", "/session/pairphone", Auth::Token(token), Some(&body))
            .await
    }

    async fn logout(&self, token: &str) -> ConsoleResult<serde_json::Value> {
        self.call::<_, ()>(Method::POST, "/session/logout", "/session/logout", Auth::Token(token), None)
            .await
    }

    async fn qr_code(&self, token: &str) -> ConsoleResult<QrCode> {
        self.call::<_, ()>(Method::GET, "/session/qr", "/session/qr", Auth::Token(token), None)
            .await
    }

    async fn get_webhook(&self, token: &str) -> ConsoleResult<WebhookConfig> {
        self.call::<_, ()>(Method::GET, "/webhook", "/webhook", Auth::Token(token), None)
            .await
    }

    async fn set_webhook(&self, token: &str, url: &str, events: &[String]) -> ConsoleResult<serde_json::Value> {
        let body = SetWebhookBody { webhook_url: url, events };
        self.call(Method::POST, "/webhook", "/webhook", Auth::Token(token), Some(&body))
            .await
    }

    async fn send_text(&self, token: &str, phone: &str, body: &str, id: &str) -> ConsoleResult<SentMessage> {
        let body = SendTextBody { phone, body, id };
        self.call(Method::POST, "/chat/send/text", "/chat/send/text", Auth::Token(token), Some(&body))
            .await
    }

    async fn delete_message(&self, token: &str, phone: &str, id: &str) -> ConsoleResult<serde_json::Value> {
        let body = DeleteMessageBody { phone, id };
        self.call(Method::POST, "/chat/delete", "/chat/delete", Auth::Token(token), Some(&body))
            .await
    }

    async fn user_info(&self, token: &str, jids: &[String]) -> ConsoleResult<UserInfoResponse> {
        let body = UserInfoBody { phone: jids };
        // GET with a JSON body, as the route is documented. A proxy that strips
        // GET bodies breaks this call; the web dashboard uses POST here.
        self.call(Method::GET, "/user/info", "/user/info", Auth::Token(token), Some(&body))
            .await
    }

    async fn user_avatar(&self, token: &str, jid: &str) -> ConsoleResult<Avatar> {
        let body = AvatarBody { phone: jid, preview: false };
        self.call(Method::POST, "/user/avatar", "/user/avatar", Auth::Token(token), Some(&body))
            .await
    }

    async fn contacts(&self, token: &str) -> ConsoleResult<HashMap<String, Contact>> {
        self.call::<_, ()>(Method::GET, "/user/contacts", "/user/contacts", Auth::Token(token), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment_escapes_separators() {
        assert_eq!(encode_segment("a1").unwrap(), "a1");
        assert_eq!(encode_segment("a/b?c#d").unwrap(), "a%2Fb%3Fc%23d");
        assert_eq!(encode_segment("two words").unwrap(), "two%20words");
    }
}
