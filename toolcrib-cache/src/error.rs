use std::sync::Arc;

/// Shared, cloneable wrapper for a producer's error.
///
/// Every caller attached to a coalesced fetch receives the same underlying
/// error, so it lives behind an `Arc`.
pub type ProducerError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`RequestCache`](crate::RequestCache).
#[derive(Clone, Debug)]
pub enum FetchError {
    /// The producer rejected. Propagated verbatim to every attached
    /// caller; nothing is cached.
    Producer(ProducerError),

    /// A debounced call was replaced by a later call for the same key
    /// before its timer fired. Its producer never ran.
    Superseded,
}

/// Wrap an arbitrary error for return from a producer.
pub fn producer_error(err: impl std::error::Error + Send + Sync + 'static) -> ProducerError {
    Arc::new(err)
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Producer(err) => write!(f, "producer failed: {err}"),
            FetchError::Superseded => write!(f, "debounced call superseded"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Producer(err) => Some(err.as_ref()),
            FetchError::Superseded => None,
        }
    }
}
