/// Errors surfaced by the tracking core.
///
/// Validation variants mean the request was rejected before any state was
/// touched and can be retried once the input is corrected.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("unknown boss: {0}")]
    UnknownBoss(String),
    #[error("unknown layer: {0}")]
    UnknownLayer(String),
    #[error("invalid layer input {0:?}: expected a number from 1 to 9")]
    InvalidLayer(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("unknown tenant: {0}")]
    UnknownTenant(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl ScoutError {
    /// `true` for caller mistakes that performed no mutation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScoutError::UnknownBoss(_)
                | ScoutError::UnknownLayer(_)
                | ScoutError::InvalidLayer(_)
                | ScoutError::InvalidStatus(_)
                | ScoutError::UnknownTenant(_)
        )
    }
}

/// A platform or persistence call failed.
///
/// In-memory state is never rolled back because of one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("platform: {0}")]
    Platform(String),
    #[error("persistence: {0}")]
    Persistence(String),
}

impl From<tokio_rusqlite::Error> for CollaboratorError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        CollaboratorError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(e: serde_json::Error) -> Self {
        CollaboratorError::Persistence(format!("encoding: {e}"))
    }
}
