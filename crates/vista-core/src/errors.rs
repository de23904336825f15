/// Error taxonomy for view refreshes.
///
/// All rejected fetches collapse into `Fetch` regardless of the underlying
/// cause (timeout, network, server): policy downstream is identical for
/// each. Absent transport and missing subscribers are not errors at all —
/// those paths degrade to no-ops before an error could be constructed.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The fetch collaborator rejected. Silent-path failures are logged
    /// and swallowed; explicit-path failures surface as retryable view
    /// error state.
    #[error("fetch failed: {0}")]
    Fetch(#[from] anyhow::Error),

    /// The view was unmounted before the fetch settled. The result is
    /// discarded; never surfaced to the user.
    #[error("refresh cancelled")]
    Cancelled,
}

impl RefreshError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Cancelled => "cancelled",
        }
    }
}
