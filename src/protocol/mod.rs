//! Protocol Module
//!
//! Defines the wire protocol for client-server communication. One connection
//! carries exactly one request frame and one response frame.
//!
//! ### Methods
//! - 1: PUT            - name + data
//! - 2: GET_BY_ID      - id
//! - 3: GET_BY_NAME    - name
//! - 4: DELETE_BY_ID   - id
//! - 5: DELETE_BY_NAME - name
//!
//! ### Status Codes
//! - 200: SUCCESS
//! - 400: BAD_REQUEST
//! - 403: FORBIDDEN
//! - 404: NOT_FOUND
//! - 500: INTERNAL_SERVER_ERROR
//! - anything else decodes as UNKNOWN (520)

mod request;
mod response;
mod codec;

pub use request::{Method, Request};
pub use response::{Response, Status};
pub use codec::{
    checksum, decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, DEFAULT_MAX_PAYLOAD_SIZE, MAX_STRING_LEN,
    NO_ID, REQUEST_MAGIC, RESPONSE_MAGIC,
};
