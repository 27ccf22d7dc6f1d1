/// Errors from the current-user probe.
///
/// The session manager treats every variant as "no session" when settling
/// state, but the taxonomy is preserved so callers and logs can tell a
/// genuine logout apart from a backend outage.
#[derive(Debug)]
pub enum SessionError {
    /// The backend answered that no valid session exists.
    Unauthenticated,

    /// Network-level or server-side failure reaching the probe endpoint.
    Transport(String),

    /// The probe response could not be parsed into a user.
    Decode(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Unauthenticated => write!(f, "no authenticated session"),
            SessionError::Transport(msg) => write!(f, "probe transport error: {msg}"),
            SessionError::Decode(msg) => write!(f, "probe response invalid: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}
