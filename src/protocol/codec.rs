//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! All integers are big-endian. Strings are a u16 byte length followed by
//! UTF-8 bytes.
//!
//! ### Request Format
//! ```text
//! ┌───────────┬───────────┬─────────────────────────────┐
//! │ Magic (4) │ Method(4) │      Method fields          │
//! └───────────┴───────────┴─────────────────────────────┘
//! ```
//!
//! ### Method Fields
//! - PUT:            name + data_len (4) + data
//! - GET_BY_NAME:    name
//! - DELETE_BY_NAME: name
//! - GET_BY_ID:      id (4)
//! - DELETE_BY_ID:   id (4)
//!
//! ### Response Format
//! ```text
//! ┌───────────┬───────────┬────────┬────────────┬──────────────────────────────┐
//! │ Magic (4) │ Status(4) │ Id (4) │ HasPay (1) │ [Len (4) + Payload + CRC (8)]│
//! └───────────┴───────────┴────────┴────────────┴──────────────────────────────┘
//! ```

use std::io::{self, Read, Write};

use bytes::{BufMut, BytesMut};

use crate::error::{Result, VaultError};
use super::{Method, Request, Response, Status};

/// Magic number opening every request frame ("REQS")
pub const REQUEST_MAGIC: u32 = 0x5245_5153;

/// Magic number opening every response frame ("GOKU")
pub const RESPONSE_MAGIC: u32 = 0x474F_4B55;

/// Id value meaning "no id"
pub const NO_ID: i32 = -1;

/// Default maximum payload size (50 MB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Longest string a u16 prefix can describe
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Request header: magic + method
pub const REQUEST_HEADER_SIZE: usize = 8;

/// Response header: magic + status + id + has_payload
pub const RESPONSE_HEADER_SIZE: usize = 13;

/// Payload checksum as carried on the wire: CRC-32 widened to 64 bits
pub fn checksum(payload: &[u8]) -> u64 {
    u64::from(crc32fast::hash(payload))
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    let body_hint = match request {
        Request::Put { filename, data } => 2 + filename.len() + 4 + data.len(),
        Request::GetByName { filename } | Request::DeleteByName { filename } => {
            2 + filename.len()
        }
        Request::GetById { .. } | Request::DeleteById { .. } => 4,
    };

    let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE + body_hint);
    buf.put_u32(REQUEST_MAGIC);
    buf.put_i32(request.method().code());

    match request {
        Request::Put { filename, data } => {
            put_string(&mut buf, filename)?;
            put_blob(&mut buf, data)?;
        }
        Request::GetByName { filename } | Request::DeleteByName { filename } => {
            put_string(&mut buf, filename)?;
        }
        Request::GetById { id } | Request::DeleteById { id } => {
            buf.put_i32(*id);
        }
    }

    Ok(buf.to_vec())
}

/// Decode a request from a complete frame
///
/// The slice must hold exactly one frame.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let mut cursor = bytes;
    let request = read_request(&mut cursor, bytes.len())?;
    ensure_consumed(cursor)?;
    Ok(request)
}

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs. PUT data
/// longer than `max_payload` is rejected before it is read.
pub fn read_request<R: Read>(reader: &mut R, max_payload: usize) -> Result<Request> {
    let magic = read_u32(reader)?;
    if magic != REQUEST_MAGIC {
        return Err(VaultError::Protocol(format!(
            "Invalid request magic: 0x{:08x}",
            magic
        )));
    }

    let code = read_i32(reader)?;
    let method = Method::from_code(code)
        .ok_or_else(|| VaultError::Protocol(format!("Unknown method code: {}", code)))?;

    let request = match method {
        Method::Put => {
            let filename = read_string(reader)?;
            let data = read_blob(reader, max_payload)?;
            Request::Put { filename, data }
        }
        Method::GetByName => Request::GetByName {
            filename: read_string(reader)?,
        },
        Method::DeleteByName => Request::DeleteByName {
            filename: read_string(reader)?,
        },
        Method::GetById => Request::GetById {
            id: read_i32(reader)?,
        },
        Method::DeleteById => Request::DeleteById {
            id: read_i32(reader)?,
        },
    };

    Ok(request)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// The checksum is computed here, over the payload being sent.
/// `Some(NO_ID)` is rejected: on the wire it is indistinguishable from no id.
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    if response.id == Some(NO_ID) {
        return Err(VaultError::Protocol(format!(
            "Response id {} is reserved for \"no id\"",
            NO_ID
        )));
    }

    let payload_hint = response.payload.as_ref().map_or(0, |p| 4 + p.len() + 8);

    let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_SIZE + payload_hint);
    buf.put_u32(RESPONSE_MAGIC);
    buf.put_i32(response.status.code());
    buf.put_i32(response.id.unwrap_or(NO_ID));

    match &response.payload {
        Some(payload) => {
            buf.put_u8(1);
            put_blob(&mut buf, payload)?;
            buf.put_u64(checksum(payload));
        }
        None => buf.put_u8(0),
    }

    Ok(buf.to_vec())
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let mut cursor = bytes;
    let response = read_response(&mut cursor, bytes.len())?;
    ensure_consumed(cursor)?;
    Ok(response)
}

/// Read a complete response from a stream
///
/// Unknown status codes decode to `Status::Unknown`. A payload whose checksum
/// does not match fails with `VaultError::Integrity`.
pub fn read_response<R: Read>(reader: &mut R, max_payload: usize) -> Result<Response> {
    let magic = read_u32(reader)?;
    if magic != RESPONSE_MAGIC {
        return Err(VaultError::Protocol(format!(
            "Invalid response magic: 0x{:08x}",
            magic
        )));
    }

    let status = Status::from_code(read_i32(reader)?);
    let id = match read_i32(reader)? {
        NO_ID => None,
        id => Some(id),
    };

    let payload = if read_u8(reader)? != 0 {
        let payload = read_blob(reader, max_payload)?;
        let expected = read_u64(reader)?;
        let actual = checksum(&payload);
        if expected != actual {
            return Err(VaultError::Integrity { expected, actual });
        }
        Some(payload)
    } else {
        None
    };

    Ok(Response {
        status,
        id,
        payload,
    })
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Field helpers
// =============================================================================

fn put_string(buf: &mut BytesMut, value: &str) -> Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        VaultError::Protocol(format!(
            "String too long: {} bytes (max {})",
            value.len(),
            MAX_STRING_LEN
        ))
    })?;
    buf.put_u16(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn put_blob(buf: &mut BytesMut, data: &[u8]) -> Result<()> {
    let len = i32::try_from(data.len()).map_err(|_| {
        VaultError::Protocol(format!("Payload too large: {} bytes", data.len()))
    })?;
    buf.put_i32(len);
    buf.put_slice(data);
    Ok(())
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_u16(reader)? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|e| VaultError::Protocol(format!("Invalid UTF-8 in string: {}", e)))
}

/// Read an i32 length and that many bytes, refusing lengths over `max`
fn read_blob<R: Read>(reader: &mut R, max: usize) -> Result<Vec<u8>> {
    let declared = read_i32(reader)?;
    let len = usize::try_from(declared)
        .map_err(|_| VaultError::Protocol(format!("Negative length: {}", declared)))?;

    if len > max {
        return Err(VaultError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, max
        )));
    }

    // Grow with the data actually received instead of trusting the header.
    let mut data = Vec::with_capacity(len.min(64 * 1024));
    reader.by_ref().take(len as u64).read_to_end(&mut data)?;
    if data.len() != len {
        return Err(VaultError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("Incomplete payload: expected {} bytes, got {}", len, data.len()),
        )));
    }

    Ok(data)
}

fn ensure_consumed(rest: &[u8]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(VaultError::Protocol(format!(
            "Trailing bytes after frame: {}",
            rest.len()
        )))
    }
}
