use std::time::Duration;

use crate::backend::BackendKind;

/// Time a user has to answer the first prompt, unless configured otherwise
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Settings of a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How the file gets accessed
    pub backend: BackendKind,
    /// Time to wait for the first valid answer before dumping the whole file
    pub deadline: Duration,
}

impl SessionConfig {
    #[inline]
    pub fn new(backend: BackendKind, deadline: Duration) -> Self {
        Self { backend, deadline }
    }
}
