//! Request definitions
//!
//! Represents the single request a client sends per connection.

use std::fmt;

/// Method codes as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Method {
    Put = 1,
    GetById = 2,
    GetByName = 3,
    DeleteById = 4,
    DeleteByName = 5,
}

/// Direct lookup table: index = wire code
const METHOD_TABLE: [Option<Method>; 6] = [
    None,
    Some(Method::Put),
    Some(Method::GetById),
    Some(Method::GetByName),
    Some(Method::DeleteById),
    Some(Method::DeleteByName),
];

impl Method {
    /// Resolve a wire code, `None` if it names no method
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| METHOD_TABLE.get(index).copied().flatten())
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Put => "PUT",
            Method::GetById => "GET_BY_ID",
            Method::GetByName => "GET_BY_NAME",
            Method::DeleteById => "DELETE_BY_ID",
            Method::DeleteByName => "DELETE_BY_NAME",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Store `data` under `filename`
    Put { filename: String, data: Vec<u8> },

    /// Fetch a file by id
    GetById { id: i32 },

    /// Fetch a file by name
    GetByName { filename: String },

    /// Delete a file by id
    DeleteById { id: i32 },

    /// Delete a file by name
    DeleteByName { filename: String },
}

impl Request {
    /// Get the method of this request
    pub fn method(&self) -> Method {
        match self {
            Request::Put { .. } => Method::Put,
            Request::GetById { .. } => Method::GetById,
            Request::GetByName { .. } => Method::GetByName,
            Request::DeleteById { .. } => Method::DeleteById,
            Request::DeleteByName { .. } => Method::DeleteByName,
        }
    }
}

// Display keeps file contents out of the logs.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Put { filename, data } => {
                write!(f, "PUT {:?} ({} bytes)", filename, data.len())
            }
            Request::GetById { id } | Request::DeleteById { id } => {
                write!(f, "{} {}", self.method(), id)
            }
            Request::GetByName { filename } | Request::DeleteByName { filename } => {
                write!(f, "{} {:?}", self.method(), filename)
            }
        }
    }
}
