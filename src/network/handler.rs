//! Request Handler
//!
//! Runs the per-connection state machine:
//!
//! ```text
//! Idle → ReadRequest → Dispatch → WriteResponse → Closed
//!             │                        │
//!             └──── decode error ──────┴──── encode/write error ──→ Closed (no response)
//! ```
//!
//! Exactly one request and at most one response per connection.

use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::VaultError;
use crate::protocol::{read_request, write_response, Request, Response, Status};
use crate::storage::FileStore;

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response with this status was written
    Responded(Status),

    /// The connection was torn down without a response
    Dropped,
}

#[derive(Debug)]
enum State {
    Idle,
    ReadRequest,
    Dispatch(Request),
    WriteResponse(Response),
    Closed(Outcome),
}

/// Decodes one request, runs it against the store, encodes one response
pub struct RequestHandler {
    store: Arc<FileStore>,

    /// Largest PUT body accepted off the wire
    max_payload: usize,
}

impl RequestHandler {
    pub fn new(store: Arc<FileStore>, max_payload: usize) -> Self {
        Self { store, max_payload }
    }

    /// Drive one connection to completion
    ///
    /// Never fails: decode and encode errors are logged and end the
    /// connection silently.
    pub fn serve<R: Read, W: Write>(&self, reader: &mut R, writer: &mut W, peer: &str) -> Outcome {
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle => State::ReadRequest,

                State::ReadRequest => match read_request(reader, self.max_payload) {
                    Ok(request) => {
                        tracing::info!(peer, "Request received: {}", request);
                        State::Dispatch(request)
                    }
                    Err(e) => {
                        log_read_failure(peer, &e);
                        State::Closed(Outcome::Dropped)
                    }
                },

                State::Dispatch(request) => State::WriteResponse(self.dispatch(request)),

                State::WriteResponse(response) => match write_response(writer, &response) {
                    Ok(()) => {
                        tracing::debug!(peer, "Sent {}", response.status);
                        State::Closed(Outcome::Responded(response.status))
                    }
                    Err(e) if e.is_disconnect() => {
                        tracing::debug!(peer, "Client left before the response was sent: {}", e);
                        State::Closed(Outcome::Dropped)
                    }
                    Err(e) => {
                        tracing::warn!(peer, "Error writing response: {}", e);
                        State::Closed(Outcome::Dropped)
                    }
                },

                State::Closed(outcome) => return outcome,
            };
        }
    }

    /// Execute a request and build its response
    ///
    /// Any failure, a panic included, becomes `InternalServerError`.
    pub fn dispatch(&self, request: Request) -> Response {
        let method = request.method();

        match panic::catch_unwind(AssertUnwindSafe(|| self.execute(request))) {
            Ok(response) => response,
            Err(_) => {
                tracing::error!("Panic while handling {}", method);
                Response::internal_error()
            }
        }
    }

    fn execute(&self, request: Request) -> Response {
        match request {
            Request::Put { filename, data } => match self.store.put(&filename, &data) {
                Ok(id) => Response::success_with_id(id),
                Err(VaultError::Validation(reason)) => {
                    tracing::warn!("Could not save {:?}: {}", filename, reason);
                    Response::forbidden()
                }
                Err(e) => {
                    tracing::error!("Error saving {:?}: {}", filename, e);
                    Response::internal_error()
                }
            },

            Request::GetById { id } => Self::fetched(self.store.get_by_id(id), &id),

            Request::GetByName { filename } => {
                Self::fetched(self.store.get_by_name(&filename), &filename)
            }

            Request::DeleteById { id } => Self::deleted(self.store.delete_by_id(id), &id),

            Request::DeleteByName { filename } => {
                Self::deleted(self.store.delete_by_name(&filename), &filename)
            }
        }
    }

    fn fetched(result: crate::Result<Vec<u8>>, key: &dyn std::fmt::Debug) -> Response {
        match result {
            Ok(data) => {
                tracing::info!(bytes = data.len(), "File sent: {:?}", key);
                Response::success_with_payload(data)
            }
            Err(VaultError::NotFound(_)) => {
                tracing::warn!("File not found: {:?}", key);
                Response::not_found()
            }
            Err(e) => {
                tracing::error!("Error reading {:?}: {}", key, e);
                Response::internal_error()
            }
        }
    }

    fn deleted(result: crate::Result<bool>, key: &dyn std::fmt::Debug) -> Response {
        match result {
            Ok(true) => Response::success(),
            Ok(false) => {
                tracing::warn!("Nothing to delete for {:?}", key);
                Response::not_found()
            }
            Err(e) => {
                tracing::error!("Error deleting {:?}: {}", key, e);
                Response::internal_error()
            }
        }
    }
}

fn log_read_failure(peer: &str, error: &VaultError) {
    if error.is_disconnect() {
        tracing::debug!(peer, "Client disconnected before a full request: {}", error);
    } else if error.is_timeout() {
        tracing::debug!(peer, "Read timeout: {}", error);
    } else {
        tracing::warn!(peer, "Rejected request: {}", error);
    }
}
