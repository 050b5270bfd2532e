use thiserror::Error;

/// Failures callers branch on. Anything else stays a plain `anyhow` message.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// True when `err` is a unique-constraint (409) rejection from PostgREST.
pub fn is_conflict(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<DatabaseError>(), Some(DatabaseError::Conflict(_)))
}
