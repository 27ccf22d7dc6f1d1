use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::user::CurrentUser;

/// Pluggable "who is the current user" producer.
///
/// Implement this to back the session manager with something other than
/// the default HTTP probe (a test double, a token introspection call, a
/// desktop keychain lookup).
pub trait UserSource: Send + Sync + 'static {
    fn fetch_current_user(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<CurrentUser, SessionError>> + Send + '_>>;
}

/// Default source: GET the configured probe endpoint and parse the JSON
/// body into a [`CurrentUser`].
///
/// A 401 or 403 answer means "no session" ([`SessionError::Unauthenticated`]);
/// every other failure is reported as transport or decode trouble so the
/// caller can tell an outage from a logout.
pub struct HttpUserSource {
    client: reqwest::Client,
    config: SessionConfig,
}

impl HttpUserSource {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Use a preconfigured client (custom headers, cookie store, proxy).
    pub fn with_client(client: reqwest::Client, config: SessionConfig) -> Self {
        Self { client, config }
    }
}

impl UserSource for HttpUserSource {
    fn fetch_current_user(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<CurrentUser, SessionError>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.config.probe_url)
                .send()
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))?;

            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) {
                return Err(SessionError::Unauthenticated);
            }

            let response = response
                .error_for_status()
                .map_err(|e| SessionError::Transport(e.to_string()))?;

            response
                .json::<CurrentUser>()
                .await
                .map_err(|e| SessionError::Decode(e.to_string()))
        })
    }
}
