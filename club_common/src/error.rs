use std::fmt::Debug;

use thiserror::Error;

use crate::permissions::AccessError;

#[derive(Debug, Error)]
pub enum ClubError {
    #[error("{0}")]
    BadRequest(String),
    #[error("please authenticate")]
    Unauthorized,
    #[error(transparent)]
    Forbidden(#[from] AccessError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("missing configuration {0}")]
    Config(String),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("AWS request failed: {0}")]
    Aws(String),
}

impl ClubError {
    pub fn status_code(&self) -> u16 {
        match self {
            ClubError::BadRequest(_) => 400,
            ClubError::Unauthorized => 401,
            ClubError::Forbidden(_) => 403,
            ClubError::NotFound(_) => 404,
            ClubError::Conflict(_) => 409,
            ClubError::Config(_) | ClubError::Malformed(_) | ClubError::Aws(_) => 500,
        }
    }

    /// SDK errors only say "service error" through `Display`, so keep the debug
    /// form which carries the service's message.
    pub fn aws<E: Debug>(err: E) -> Self {
        ClubError::Aws(format!("{:?}", err))
    }

    pub fn bad_request<S: Into<String>>(reason: S) -> Self {
        ClubError::BadRequest(reason.into())
    }

    pub fn not_found<S: Into<String>>(what: S) -> Self {
        ClubError::NotFound(what.into())
    }
}

impl From<serde_json::Error> for ClubError {
    fn from(err: serde_json::Error) -> Self {
        ClubError::BadRequest(format!("invalid JSON: {}", err))
    }
}

#[test]
fn status_codes() {
    assert_eq!(ClubError::bad_request("x").status_code(), 400);
    assert_eq!(ClubError::Unauthorized.status_code(), 401);
    assert_eq!(ClubError::from(AccessError::NoRoles).status_code(), 403);
    assert_eq!(ClubError::not_found("member 1").to_string(), "member 1 not found");
    assert_eq!(ClubError::aws("boom").status_code(), 500);
}
