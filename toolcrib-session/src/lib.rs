pub mod config;
pub mod error;
pub mod gate;
pub mod session;
pub mod source;
pub mod user;

// Re-export primary public types for convenience.
pub use config::SessionConfig;
pub use error::SessionError;
pub use gate::{evaluate_access, AccessDecision, AccessRule};
pub use session::{SessionManager, SessionState};
pub use source::{HttpUserSource, UserSource};
pub use user::{CurrentUser, ADMINISTRATOR_ROLE};

pub mod prelude {
    //! Re-exports of the most commonly used session types.
    pub use crate::{
        evaluate_access, AccessDecision, AccessRule, CurrentUser, SessionConfig, SessionManager,
        SessionState,
    };
}
