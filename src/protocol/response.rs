//! Response definitions
//!
//! Represents responses to clients.

use std::fmt;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    BadRequest,
    Forbidden,
    NotFound,
    InternalServerError,
    /// Any code this build does not know; responses decode it instead of failing
    Unknown,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 200,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
            Status::Unknown => 520,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            200 => Status::Success,
            400 => Status::BadRequest,
            403 => Status::Forbidden,
            404 => Status::NotFound,
            500 => Status::InternalServerError,
            _ => Status::Unknown,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Success => "OK",
            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
            Status::Unknown => "Unknown Error",
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Id of the stored file (PUT only); `-1` on the wire when absent
    pub id: Option<i32>,

    /// File contents (GET only)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    fn with_status(status: Status) -> Self {
        Self {
            status,
            id: None,
            payload: None,
        }
    }

    /// Bare success (DELETE)
    pub fn success() -> Self {
        Self::with_status(Status::Success)
    }

    /// Success carrying the id of a stored file
    pub fn success_with_id(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Self::success()
        }
    }

    /// Success carrying file contents
    pub fn success_with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload: Some(payload),
            ..Self::success()
        }
    }

    pub fn bad_request() -> Self {
        Self::with_status(Status::BadRequest)
    }

    pub fn forbidden() -> Self {
        Self::with_status(Status::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::with_status(Status::NotFound)
    }

    pub fn internal_error() -> Self {
        Self::with_status(Status::InternalServerError)
    }
}
