//! Typed helpers for the bot-API calls the diagnostics use.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tracing::debug;

use nopool_core::TimeoutOverrides;

use crate::envelope::check;
use crate::error::AdapterResult;
use crate::request::BaseRequest;

/// Default bot-API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Extra read time granted on top of a long-poll timeout.
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

/// Bot-API client bound to one token.
#[derive(Clone)]
pub struct BotApi {
    api_base: String,
    token: String,
    request: Arc<dyn BaseRequest>,
}

impl BotApi {
    /// Creates a client for `token` on the default endpoint.
    pub fn new(token: impl Into<String>, request: Arc<dyn BaseRequest>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            request,
        }
    }

    /// Overrides the API endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// The API endpoint.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The request backend.
    pub fn request(&self) -> &Arc<dyn BaseRequest> {
        &self.request
    }

    /// `<base>/bot<token>/<method>`
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// `<base>/file/bot<token>/<path>`
    pub fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_base,
            self.token,
            file_path.trim_start_matches('/')
        )
    }

    /// Calls a bot-API method and returns its `result`.
    ///
    /// # Errors
    /// A failed envelope becomes [`AdapterError::Api`](crate::AdapterError::Api).
    /// The envelope is checked before it is unwrapped, so a `result` that
    /// has an `ok` member of its own is returned as-is.
    pub async fn call(&self, method: &str, params: Value) -> AdapterResult<Value> {
        self.call_with_timeouts(method, params, TimeoutOverrides::NONE)
            .await
    }

    async fn call_with_timeouts(
        &self,
        method: &str,
        params: Value,
        timeouts: TimeoutOverrides,
    ) -> AdapterResult<Value> {
        debug!(method = %method, "Calling bot API");
        let value = self
            .request
            .post_raw(&self.method_url(method), Some(params), timeouts)
            .await?;
        check(value)
    }

    /// `getMe`
    pub async fn get_me(&self) -> AdapterResult<Value> {
        self.call("getMe", json!({})).await
    }

    /// `sendMessage`
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> AdapterResult<Value> {
        let mut params = Map::new();
        params.insert("chat_id".to_string(), json!(chat_id));
        params.insert("text".to_string(), json!(text));
        if let Some(mode) = parse_mode {
            params.insert("parse_mode".to_string(), json!(mode));
        }
        self.call("sendMessage", Value::Object(params)).await
    }

    /// `getUpdates`, long-polling for `timeout` seconds when given.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Option<u64>,
    ) -> AdapterResult<Vec<Value>> {
        let mut params = Map::new();
        if let Some(offset) = offset {
            params.insert("offset".to_string(), json!(offset));
        }
        let mut timeouts = TimeoutOverrides::NONE;
        if let Some(secs) = timeout {
            params.insert("timeout".to_string(), json!(secs));
            timeouts = timeouts.with_read(Duration::from_secs(secs) + LONG_POLL_GRACE);
        }

        let result = self
            .call_with_timeouts("getUpdates", Value::Object(params), timeouts)
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// `getFile`
    pub async fn get_file(&self, file_id: &str) -> AdapterResult<Value> {
        self.call("getFile", json!({ "file_id": file_id })).await
    }

    /// Downloads a file previously located with [`get_file`](Self::get_file).
    pub async fn download_file(&self, file_path: &str, dest: &Path) -> AdapterResult<u64> {
        self.request.download(&self.file_url(file_path), dest).await
    }
}

impl fmt::Debug for BotApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotApi")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::request::NoPoolRequest;
    use crate::request::tests::FakeTransport;
    use nopool_core::{BoxedTransport, RequestBody};

    fn bot(fake: &Arc<FakeTransport>) -> BotApi {
        let request = NoPoolRequest::new(Arc::clone(fake) as BoxedTransport);
        BotApi::new("123:ABC", Arc::new(request)).with_api_base("http://api.local/")
    }

    #[test]
    fn test_urls() {
        let fake = FakeTransport::replying(200, "{}");
        let bot = bot(&fake);
        assert_eq!(bot.method_url("getMe"), "http://api.local/bot123:ABC/getMe");
        assert_eq!(
            bot.file_url("/photos/file_1.jpg"),
            "http://api.local/file/bot123:ABC/photos/file_1.jpg"
        );
        assert!(!format!("{bot:?}").contains("ABC"));
    }

    #[tokio::test]
    async fn test_get_me() {
        let fake = FakeTransport::replying(200, r#"{"ok":true,"result":{"id":1,"is_bot":true}}"#);
        let me = bot(&fake).get_me().await.unwrap();
        assert_eq!(me["is_bot"], true);
    }

    #[tokio::test]
    async fn test_result_with_falsy_ok_member_is_not_an_error() {
        let fake = FakeTransport::replying(
            200,
            r#"{"ok":true,"result":{"ok":false,"message_id":9}}"#,
        );
        let sent = bot(&fake).send_message(1, "hi", None).await.unwrap();
        assert_eq!(sent, json!({"ok": false, "message_id": 9}));
    }

    #[tokio::test]
    async fn test_send_message_params() {
        let fake = FakeTransport::replying(200, r#"{"ok":true,"result":{"message_id":5}}"#);
        bot(&fake)
            .send_message(42, "hello", Some("HTML"))
            .await
            .unwrap();

        let seen = fake.seen.lock();
        assert_eq!(seen[0].url(), "http://api.local/bot123:ABC/sendMessage");
        let Some(RequestBody::Json(body)) = seen[0].request_body() else {
            panic!("expected a JSON body");
        };
        assert_eq!(body, &json!({"chat_id": 42, "text": "hello", "parse_mode": "HTML"}));
    }

    #[tokio::test]
    async fn test_api_error() {
        let fake = FakeTransport::replying(
            200,
            r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
        );
        let err = bot(&fake).get_me().await.unwrap_err();
        assert!(matches!(err, AdapterError::Api { code: 401, .. }));
    }

    #[tokio::test]
    async fn test_get_updates_long_poll_extends_read_timeout() {
        let fake = FakeTransport::replying(200, r#"{"ok":true,"result":[{"update_id":1}]}"#);
        let updates = bot(&fake).get_updates(Some(10), Some(20)).await.unwrap();
        assert_eq!(updates.len(), 1);

        let seen = fake.seen.lock();
        assert_eq!(
            seen[0].timeout_overrides().read,
            Some(Duration::from_secs(30))
        );
    }

    #[tokio::test]
    async fn test_download_file_uses_file_url() {
        let fake = FakeTransport::replying(200, "bytes");
        let dest = std::env::temp_dir().join(format!("nopool-botapi-{}.bin", std::process::id()));
        let written = bot(&fake).download_file("docs/a.txt", &dest).await.unwrap();
        assert_eq!(written, 5);
        assert_eq!(
            fake.seen.lock()[0].url(),
            "http://api.local/file/bot123:ABC/docs/a.txt"
        );
        tokio::fs::remove_file(&dest).await.unwrap();
    }
}
