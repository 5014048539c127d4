//! Client
//!
//! Blocking client for the FileVault protocol. Every call opens its own
//! connection, since the server answers one request per connection.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::{read_response, write_request, Request, Response};

/// Connection settings for talking to one server
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    timeout: Option<Duration>,
    max_payload: usize,
}

impl Client {
    /// Client for the server at `addr` ("host:port")
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: None,
            max_payload: i32::MAX as usize,
        }
    }

    /// Apply a read and write timeout to every connection
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Refuse responses carrying more than `bytes` of payload
    pub fn with_max_payload(mut self, bytes: usize) -> Self {
        self.max_payload = bytes;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one request and wait for its response
    pub fn send(&self, request: &Request) -> Result<Response> {
        let stream = TcpStream::connect(&self.addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;

        let mut writer = BufWriter::new(stream.try_clone()?);
        write_request(&mut writer, request)?;

        let mut reader = BufReader::new(stream);
        let response = read_response(&mut reader, self.max_payload)?;

        tracing::debug!("{} → {}", request, response.status);
        Ok(response)
    }

    pub fn put(&self, filename: &str, data: &[u8]) -> Result<Response> {
        self.send(&Request::Put {
            filename: filename.to_string(),
            data: data.to_vec(),
        })
    }

    pub fn get_by_id(&self, id: i32) -> Result<Response> {
        self.send(&Request::GetById { id })
    }

    pub fn get_by_name(&self, filename: &str) -> Result<Response> {
        self.send(&Request::GetByName {
            filename: filename.to_string(),
        })
    }

    pub fn delete_by_id(&self, id: i32) -> Result<Response> {
        self.send(&Request::DeleteById { id })
    }

    pub fn delete_by_name(&self, filename: &str) -> Result<Response> {
        self.send(&Request::DeleteByName {
            filename: filename.to_string(),
        })
    }
}
