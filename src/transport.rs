// HTTP transport to the console API (reqwest). Attaches the bearer token from the
// session context; a 401 clears the session and surfaces as FetchError::Unauthorized.

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::error::FetchError;
use crate::session::{Session, SessionContext};
use crate::version;

pub const LOGIN_PATH: &str = "/token";
pub const EMERGENCY_PATH: &str = "/api/agentic/emergency-response";
pub const DAILY_OPERATIONS_PATH: &str = "/api/agentic/daily-operations";

#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        session: Arc<SessionContext>,
    ) -> anyhow::Result<Self> {
        // Validate early so a bad base URL fails at startup, not on the first tick.
        Url::parse(base_url)?;
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(version::user_agent())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn url(&self, path: &str) -> Result<Url, FetchError> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined).map_err(|e| FetchError::Network(format!("invalid url {joined}: {e}")))
    }

    /// Exchange credentials for a bearer token and persist it in the session.
    #[instrument(skip(self, password), fields(transport = "http", operation = "login"))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, FetchError> {
        let url = self.url(LOGIN_PATH)?;
        let response = self
            .http
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
            });
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::Malformed("login response has no access_token".into()))?;
        let user = body
            .get("user")
            .cloned()
            .filter(|u| !u.is_null())
            .unwrap_or_else(|| serde_json::json!({ "username": username }));
        let session = Session {
            token: token.to_string(),
            user: Some(user),
        };
        if let Err(e) = self.session.save(session.clone()) {
            tracing::warn!(error = %e, operation = "save_session", "failed to persist session");
        }
        Ok(session)
    }

    #[instrument(skip(self), fields(transport = "http", operation = "get_json"))]
    pub async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.url(path)?;
        self.send(self.http.get(url)).await
    }

    #[instrument(skip(self, body), fields(transport = "http", operation = "post_json"))]
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, FetchError> {
        let url = self.url(path)?;
        self.send(self.http.post(url).json(body)).await
    }

    /// POST to `/api/agentic/daily-operations/{project}`; the project name is
    /// percent-encoded as a single path segment.
    pub(crate) fn daily_operations_url(&self, project_name: &str) -> Result<Url, FetchError> {
        let mut url = self.url(DAILY_OPERATIONS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Network("base url cannot carry a path".into()))?
            .push(project_name);
        Ok(url)
    }

    pub(crate) async fn post_url(&self, url: Url, body: &Value) -> Result<Value, FetchError> {
        self.send(self.http.post(url).json(body)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, FetchError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("remote rejected the session token; clearing session");
            if let Err(e) = self.session.clear() {
                tracing::warn!(error = %e, operation = "clear_session", "failed to clear session");
            }
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(
            base,
            Duration::from_secs(1),
            Arc::new(SessionContext::in_memory()),
        )
        .unwrap()
    }

    #[test]
    fn url_joins_with_or_without_slashes() {
        let api = client("http://console.local:8000/");
        assert_eq!(
            api.url("/api/agentic/system-status").unwrap().as_str(),
            "http://console.local:8000/api/agentic/system-status"
        );
        assert_eq!(
            api.url("token").unwrap().as_str(),
            "http://console.local:8000/token"
        );
    }

    #[test]
    fn daily_operations_url_encodes_project_segment() {
        let api = client("http://console.local:8000");
        let url = api.daily_operations_url("Villa / Phase 2").unwrap();
        assert_eq!(
            url.as_str(),
            "http://console.local:8000/api/agentic/daily-operations/Villa%20%2F%20Phase%202"
        );
    }
}
