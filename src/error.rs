use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Question generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Could not parse generated question: {0}")]
    Parse(#[from] ParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of the external text-generation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("inference API unreachable: {0}")]
    Unreachable(String),

    #[error("inference API did not answer within {0} seconds")]
    Timeout(u64),

    #[error("inference API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("inference API response had no completion text")]
    EmptyCompletion,
}

/// Model output that does not follow the requested question layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("response is empty")]
    Empty,

    #[error("response does not contain the question layout")]
    LayoutMissing,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` appears more than once")]
    DuplicateField(&'static str),

    #[error("expected at least 2 options, found {0}")]
    TooFewOptions(usize),

    #[error("option {found} is out of sequence, expected {expected}")]
    OptionOutOfSequence { expected: char, found: char },

    #[error("option text `{0}` is listed more than once")]
    DuplicateOption(String),

    #[error("answer marker `{0}` is ambiguous")]
    AmbiguousAnswer(String),

    #[error("answer marker `{0}` does not match any listed option")]
    UnknownAnswer(String),

    #[error("malformed JSON question: {0}")]
    InvalidJson(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Generation(GenerationError::Timeout(secs)) => (
                StatusCode::GATEWAY_TIMEOUT,
                format!("Question generation timed out after {} seconds", secs),
            ),
            Error::Generation(err) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", err),
            ),
            Error::Parse(err) => (
                StatusCode::BAD_GATEWAY,
                format!("Generated question was malformed: {}", err),
            ),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Error::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: Error) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(status_of(Error::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(GenerationError::Timeout(30).into()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(GenerationError::EmptyCompletion.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_of(ParseError::Empty.into()), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(Error::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(Error::Config("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
