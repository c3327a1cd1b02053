//! Instagram private API client implementation

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use tracing::{debug, error, info};

use igr_core::ThreadId;

use crate::error::{InstagramError, Result};
use crate::provider::{DirectMessage, DirectProvider};
use crate::session::{DeviceIds, SessionState};

/// Private API base URL
const INSTAGRAM_API_URL: &str = "https://i.instagram.com/api/v1";

/// Android app identity presented to the private API
const APP_ID: &str = "567067343352427";
const USER_AGENT: &str = "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)";

/// Messages fetched per thread per poll
const THREAD_PAGE_SIZE: &str = "20";

/// Instagram private API client
#[derive(Debug, Clone)]
pub struct InstagramApi {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    logged_in_user: LoggedInUser,
}

#[derive(Debug, Deserialize)]
struct LoggedInUser {
    #[serde(deserialize_with = "string_or_number")]
    pk: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    thread: Thread,
}

#[derive(Debug, Deserialize)]
struct Thread {
    #[serde(default)]
    items: Vec<ThreadItem>,
}

#[derive(Debug, Deserialize)]
struct ThreadItem {
    #[serde(deserialize_with = "string_or_number")]
    item_id: String,
    #[serde(deserialize_with = "string_or_number")]
    user_id: String,
    #[serde(default)]
    item_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    timestamp: Option<String>,
}

impl From<ThreadItem> for DirectMessage {
    fn from(item: ThreadItem) -> Self {
        // Thread item timestamps are microseconds since the epoch
        let timestamp = item
            .timestamp
            .and_then(|t| t.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_micros);

        DirectMessage {
            id: item.item_id,
            user_id: item.user_id,
            text: item.text,
            item_type: item.item_type.unwrap_or_else(|| "text".to_string()),
            timestamp,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

/// Account ids arrive as numbers from some endpoints and strings from others
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

/// Map a failed response onto the error kinds the session guard reacts to
fn classify_error(status: StatusCode, body: &str) -> InstagramError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_default();
    let error_type = parsed.error_type.unwrap_or_default();

    if message == "login_required" || error_type == "login_required" {
        return InstagramError::LoginRequired;
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || message.to_lowercase().contains("wait a few minutes")
    {
        let reason = if message.is_empty() {
            status.to_string()
        } else {
            message
        };
        return InstagramError::RateLimited(reason);
    }

    if status == StatusCode::UNAUTHORIZED {
        return InstagramError::LoginRequired;
    }

    InstagramError::Api(format!("Status: {}, Body: {}", status, body))
}

/// `jazoest` checksum the login endpoint expects alongside the phone id
fn jazoest(phone_id: &str) -> String {
    let sum: u32 = phone_id.bytes().map(u32::from).sum();
    format!("2{}", sum)
}

/// Wrap a JSON payload the way the private API expects signed bodies
fn signed_body(payload: &serde_json::Value) -> String {
    format!("SIGNATURE.{}", payload)
}

impl InstagramApi {
    /// Create a new client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: INSTAGRAM_API_URL.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder, session: &SessionState) -> reqwest::RequestBuilder {
        builder
            .header("Authorization", &session.authorization)
            .header("X-IG-App-ID", APP_ID)
            .header("X-IG-Device-ID", &session.device.uuid)
            .header("X-IG-Android-ID", &session.device.device_id)
            .header("User-Agent", &session.user_agent)
    }

    /// Send a request and read the status and body
    async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<(StatusCode, String)> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!("Instagram API response: {} - {}", status, body);

        Ok((status, body))
    }
}

#[async_trait]
impl DirectProvider for InstagramApi {
    async fn login(&self, username: &str, password: &str) -> Result<SessionState> {
        info!("Logging in to Instagram as {}", username);

        let device = DeviceIds::generate();
        let enc_password = format!("#PWD_INSTAGRAM:0:{}:{}", Utc::now().timestamp(), password);

        let payload = serde_json::json!({
            "jazoest": jazoest(&device.phone_id),
            "country_codes": "[{\"country_code\":\"1\",\"source\":[\"default\"]}]",
            "phone_id": device.phone_id,
            "enc_password": enc_password,
            "username": username,
            "adid": device.advertising_id,
            "guid": device.uuid,
            "device_id": device.device_id,
            "google_tokens": "[]",
            "login_attempt_count": "0",
        });

        let response = self
            .client
            .post(self.url("accounts/login/"))
            .header("X-IG-App-ID", APP_ID)
            .header("X-IG-Device-ID", &device.uuid)
            .header("X-IG-Android-ID", &device.device_id)
            .form(&[("signed_body", signed_body(&payload))])
            .send()
            .await?;

        let status = response.status();
        let authorization = response
            .headers()
            .get("ig-set-authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        if !status.is_success() {
            error!("Instagram login error: {} - {}", status, body);
            return Err(match classify_error(status, &body) {
                // A rejected login is not something re-login can fix
                InstagramError::LoginRequired => {
                    InstagramError::Api(format!("Login rejected: {}", body))
                }
                other => other,
            });
        }

        let authorization = authorization
            .filter(|a| !a.is_empty())
            .ok_or_else(|| InstagramError::Session("Missing authorization header".to_string()))?;

        let login: LoginResponse = serde_json::from_str(&body)?;

        Ok(SessionState {
            username: login.logged_in_user.username,
            user_id: login.logged_in_user.pk,
            authorization,
            device,
            user_agent: USER_AGENT.to_string(),
            logged_in_at: Utc::now(),
        })
    }

    async fn check_session(&self, session: &SessionState) -> Result<()> {
        let builder = self.client.post(self.url("feed/timeline/")).form(&[
            ("reason", "cold_start_fetch"),
            ("is_pull_to_refresh", "0"),
            ("_uuid", session.device.uuid.as_str()),
            ("phone_id", session.device.phone_id.as_str()),
            ("device_id", session.device.device_id.as_str()),
            ("battery_level", "100"),
            ("is_charging", "1"),
            ("will_sound_on", "0"),
        ]);

        let (status, body) = self.execute(self.authed(builder, session)).await?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        Ok(())
    }

    async fn thread_messages(
        &self,
        session: &SessionState,
        thread_id: &ThreadId,
    ) -> Result<Vec<DirectMessage>> {
        let builder = self
            .client
            .get(self.url(&format!("direct_v2/threads/{}/", thread_id)))
            .query(&[
                ("visual_message_return_type", "unseen"),
                ("direction", "older"),
                ("limit", THREAD_PAGE_SIZE),
            ]);

        let (status, body) = self.execute(self.authed(builder, session)).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(InstagramError::ThreadNotFound(thread_id.to_string()));
        }
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let response: ThreadResponse = serde_json::from_str(&body)?;
        Ok(response.thread.items.into_iter().map(DirectMessage::from).collect())
    }

    async fn send_text(&self, session: &SessionState, thread_id: &ThreadId, text: &str) -> Result<()> {
        let client_context = uuid::Uuid::new_v4().to_string();
        let thread_ids = format!("[\"{}\"]", thread_id);

        let builder = self
            .client
            .post(self.url("direct_v2/threads/broadcast/text/"))
            .form(&[
                ("action", "send_item"),
                ("is_shh_mode", "0"),
                ("send_attribution", "direct_thread"),
                ("thread_ids", thread_ids.as_str()),
                ("text", text),
                ("client_context", client_context.as_str()),
                ("mutation_token", client_context.as_str()),
                ("_uuid", session.device.uuid.as_str()),
                ("device_id", session.device.device_id.as_str()),
            ]);

        let (status, body) = self.execute(self.authed(builder, session)).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(InstagramError::ThreadNotFound(thread_id.to_string()));
        }
        if !status.is_success() {
            error!("Instagram send error: {} - {}", status, body);
            return Err(classify_error(status, &body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_login_required() {
        let body = r#"{"message":"login_required","status":"fail","logout_reason":2}"#;
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, body),
            InstagramError::LoginRequired
        ));
    }

    #[test]
    fn test_classify_please_wait() {
        let body = r#"{"message":"Please wait a few minutes before you try again.","status":"fail"}"#;
        match classify_error(StatusCode::BAD_REQUEST, body) {
            InstagramError::RateLimited(reason) => assert!(reason.starts_with("Please wait")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_classify_too_many_requests_without_body() {
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            InstagramError::RateLimited(_)
        ));
    }

    #[test]
    fn test_classify_other() {
        let body = r#"{"message":"challenge_required","status":"fail"}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, body),
            InstagramError::Api(_)
        ));
    }

    #[test]
    fn test_parse_thread_items() {
        let body = r#"{
            "thread": {
                "thread_id": "340282366841710300949128",
                "items": [
                    {"item_id": "3184", "user_id": 55, "timestamp": 1700000000000000, "item_type": "text", "text": "hi"},
                    {"item_id": "3183", "user_id": "77", "timestamp": "1699999999000000", "item_type": "media_share"}
                ]
            },
            "status": "ok"
        }"#;

        let response: ThreadResponse = serde_json::from_str(body).unwrap();
        let messages: Vec<DirectMessage> =
            response.thread.items.into_iter().map(DirectMessage::from).collect();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "3184");
        assert_eq!(messages[0].user_id, "55");
        assert_eq!(messages[0].text.as_deref(), Some("hi"));
        assert_eq!(
            messages[0].timestamp.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
        assert_eq!(messages[1].user_id, "77");
        assert_eq!(messages[1].item_type, "media_share");
        assert!(messages[1].text.is_none());
    }

    #[test]
    fn test_parse_empty_thread() {
        let body = r#"{"thread": {"thread_id": "1"}, "status": "ok"}"#;
        let response: ThreadResponse = serde_json::from_str(body).unwrap();
        assert!(response.thread.items.is_empty());
    }

    #[test]
    fn test_parse_login_response() {
        let body = r#"{"logged_in_user": {"pk": 1234567, "username": "shop.account"}, "status": "ok"}"#;
        let login: LoginResponse = serde_json::from_str(body).unwrap();
        assert_eq!(login.logged_in_user.pk, "1234567");
        assert_eq!(login.logged_in_user.username, "shop.account");
    }

    #[test]
    fn test_jazoest() {
        // '1' = 49, 'a' = 97
        assert_eq!(jazoest("1a"), "2146");
    }

    #[test]
    fn test_endpoint_url() {
        let api = InstagramApi::new(Duration::from_secs(5)).unwrap();
        assert_eq!(
            api.url("direct_v2/threads/broadcast/text/"),
            "https://i.instagram.com/api/v1/direct_v2/threads/broadcast/text/"
        );
    }
}
