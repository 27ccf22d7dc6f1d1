use crate::session::SessionState;

/// Access requirements attached to a navigable view.
///
/// Immutable configuration; evaluated by [`evaluate_access`], never stored
/// on the session.
#[derive(Clone, Debug, Default)]
pub struct AccessRule {
    /// The view requires a signed-in user.
    pub requires_authentication: bool,

    /// The view requires this role.
    pub required_role: Option<String>,

    /// The view requires this named permission. Administrators satisfy
    /// any permission requirement.
    pub required_permission: Option<String>,
}

impl AccessRule {
    /// A view anyone can reach.
    pub fn public() -> Self {
        Self::default()
    }

    /// A view that requires a signed-in user.
    pub fn authenticated() -> Self {
        Self {
            requires_authentication: true,
            ..Self::default()
        }
    }

    /// Additionally require a role. Implies authentication.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.required_role = Some(role.into());
        self
    }

    /// Additionally require a named permission. Implies authentication.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permission = Some(permission.into());
        self
    }
}

/// Outcome of gating a navigation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    /// The session has not settled; render a loading state and re-evaluate
    /// once it does. Protected content is never rendered speculatively.
    Pending,

    /// The view is reachable.
    Allow,

    /// No signed-in user; send to the login view, remembering where the
    /// user was headed.
    RedirectToLogin { return_to: String },

    /// Signed in but missing a required role or permission.
    RedirectUnauthorized { reason: String },
}

/// Decide whether `session` may reach a view guarded by `rule`.
///
/// Pure: no side effects, never errors, always yields a definite outcome
/// once the session has settled. Authentication strictly precedes
/// authorization, so an anonymous user is always redirected to login and
/// never shown an unauthorized message.
pub fn evaluate_access(
    session: &SessionState,
    rule: &AccessRule,
    requested: &str,
) -> AccessDecision {
    let user = match session {
        SessionState::Uninitialized | SessionState::Checking => return AccessDecision::Pending,
        SessionState::Authenticated(user) => Some(user),
        SessionState::Anonymous => None,
    };

    let needs_user = rule.requires_authentication
        || rule.required_role.is_some()
        || rule.required_permission.is_some();

    let user = match user {
        Some(user) => user,
        None if needs_user => {
            return AccessDecision::RedirectToLogin {
                return_to: requested.to_string(),
            }
        }
        None => return AccessDecision::Allow,
    };

    if let Some(role) = &rule.required_role {
        if !user.has_role(role) {
            return AccessDecision::RedirectUnauthorized {
                reason: format!("missing role '{role}'"),
            };
        }
    }

    if let Some(permission) = &rule.required_permission {
        if !user.has_permission(permission) {
            return AccessDecision::RedirectUnauthorized {
                reason: format!("missing permission '{permission}'"),
            };
        }
    }

    AccessDecision::Allow
}
