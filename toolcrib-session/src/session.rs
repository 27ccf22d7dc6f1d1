use std::sync::Arc;

use tokio::sync::RwLock;

use toolcrib_cache::{producer_error, FetchError, RequestCache};

use crate::config::SessionConfig;
use crate::source::UserSource;
use crate::user::CurrentUser;

/// Cache key for the bootstrap probe. Every re-entrant check funnels
/// through this key, so concurrent checks share a single in-flight fetch.
const CURRENT_USER_KEY: &str = "current-user";

/// Lifecycle of the client session.
#[derive(Clone, Debug)]
pub enum SessionState {
    /// No probe has been attempted yet.
    Uninitialized,

    /// The one-time bootstrap probe is in flight.
    Checking,

    /// A principal is signed in.
    Authenticated(CurrentUser),

    /// The probe settled without a session, or the user logged out.
    Anonymous,
}

impl SessionState {
    /// Whether the state is `Authenticated` or `Anonymous` (the probe has
    /// run to completion at least once).
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticated(_) | SessionState::Anonymous
        )
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// The signed-in principal, if any.
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Owns the session lifecycle: bootstraps "who is the current user",
/// applies login/logout transitions, and hands out state snapshots for
/// the access gate to evaluate.
///
/// The probe runs through a [`RequestCache`], so any number of concurrent
/// [`ensure_loaded`](SessionManager::ensure_loaded) calls perform at most
/// one fetch. Cloning the manager yields a handle to the same session.
#[derive(Clone)]
pub struct SessionManager {
    state: Arc<RwLock<SessionState>>,
    probe_cache: RequestCache<CurrentUser>,
    source: Arc<dyn UserSource>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(source: impl UserSource, config: SessionConfig) -> Self {
        Self::with_cache(source, config, RequestCache::new())
    }

    /// Share an existing cache (e.g. the application-wide request cache)
    /// instead of a private one.
    pub fn with_cache(
        source: impl UserSource,
        config: SessionConfig,
        probe_cache: RequestCache<CurrentUser>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::Uninitialized)),
            probe_cache,
            source: Arc::new(source),
            config,
        }
    }

    /// Current state snapshot without triggering a probe.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Make sure the session is settled, probing the backend if needed.
    ///
    /// Safe to call from every view check: a settled session returns its
    /// snapshot immediately, and concurrent callers of an unsettled
    /// session attach to the same in-flight probe. A failed probe settles
    /// the session as `Anonymous`; it is never surfaced as an error.
    pub async fn ensure_loaded(&self) -> SessionState {
        {
            let state = self.state.read().await;
            if state.is_settled() {
                return state.clone();
            }
        }

        {
            let mut state = self.state.write().await;
            if matches!(*state, SessionState::Uninitialized) {
                *state = SessionState::Checking;
            }
        }

        let outcome = self.probe().await;
        self.settle(outcome).await
    }

    /// Drop any cached probe result and re-fetch the current user.
    ///
    /// An authenticated session whose refresh fails is demoted to
    /// `Anonymous`.
    pub async fn refresh(&self) -> SessionState {
        self.probe_cache.invalidate(CURRENT_USER_KEY);
        let outcome = self.probe().await;
        self.settle(outcome).await
    }

    /// Record a successful explicit login.
    ///
    /// The principal comes from the login call itself, so the probe cache
    /// is primed with it and no extra fetch is needed.
    pub async fn login_succeeded(&self, user: CurrentUser) {
        self.probe_cache.insert(CURRENT_USER_KEY, user.clone());
        let mut state = self.state.write().await;
        tracing::debug!(user = %user.id, "session authenticated by explicit login");
        *state = SessionState::Authenticated(user);
    }

    /// Clear the session after an explicit logout.
    pub async fn logout(&self) {
        self.probe_cache.invalidate(CURRENT_USER_KEY);
        let mut state = self.state.write().await;
        tracing::debug!("session cleared by logout");
        *state = SessionState::Anonymous;
    }

    async fn probe(&self) -> Result<CurrentUser, FetchError> {
        let source = self.source.clone();
        self.probe_cache
            .fetch(CURRENT_USER_KEY, self.config.probe_freshness(), move || {
                async move {
                    source
                        .fetch_current_user()
                        .await
                        .map_err(producer_error)
                }
            })
            .await
    }

    async fn settle(&self, outcome: Result<CurrentUser, FetchError>) -> SessionState {
        let mut state = self.state.write().await;
        *state = match outcome {
            Ok(user) => {
                tracing::debug!(user = %user.id, "current-user probe succeeded");
                SessionState::Authenticated(user)
            }
            Err(err) => {
                // A failed probe means "no session", whatever the cause.
                tracing::warn!(error = %err, "current-user probe failed, treating session as anonymous");
                SessionState::Anonymous
            }
        };
        state.clone()
    }
}
