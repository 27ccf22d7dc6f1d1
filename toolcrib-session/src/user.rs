use serde::{Deserialize, Serialize};

/// Role that implicitly grants every permission.
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// The authenticated principal as returned by the current-user probe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Unique user identifier.
    pub id: String,

    /// Email, if the account has one on file.
    #[serde(default)]
    pub email: Option<String>,

    /// Role names attached to the account.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Named capability strings (e.g. "inventory.delete", "tools.checkout").
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl CurrentUser {
    /// Check whether the user holds a specific role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check whether the user holds any of the specified roles.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Whether the user holds the administrator role.
    pub fn is_admin(&self) -> bool {
        self.has_role(ADMINISTRATOR_ROLE)
    }

    /// Check whether the user holds a named permission.
    ///
    /// Administrators implicitly hold every permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin() || self.permissions.iter().any(|p| p == permission)
    }
}
