use thiserror::Error;

/// The error taxonomy shared by the server dispatcher and the client driver.
///
/// Variants map directly onto the status-code families in the wire
/// protocol: `BadRequest` -> 400, `Unauthorized` -> 401, `NotFound` -> 404,
/// everything else -> 500.
#[derive(Debug, Error)]
pub enum DeadDropError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl DeadDropError {
    pub fn internal(msg: impl Into<String>) -> Self {
        DeadDropError::Internal(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        DeadDropError::BadRequest(msg.into())
    }
}
