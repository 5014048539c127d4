//! Handler Tests
//!
//! Drives the per-connection state machine over in-memory streams.

use std::io::{self, Cursor, Write};
use std::path::Path;
use std::sync::Arc;

use filevault::network::{Outcome, RequestHandler};
use filevault::protocol::{
    decode_response, encode_request, Request, Response, Status, DEFAULT_MAX_PAYLOAD_SIZE,
};
use filevault::storage::{FileStore, NamePolicy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_handler() -> (TempDir, RequestHandler) {
    let temp_dir = TempDir::new().unwrap();
    let handler = handler_at(temp_dir.path(), DEFAULT_MAX_PAYLOAD_SIZE);
    (temp_dir, handler)
}

fn handler_at(path: &Path, max_payload: usize) -> RequestHandler {
    let policy = NamePolicy::new(["txt", "jpg", "png", "gif", "pdf", "docx"]);
    let store = FileStore::open(path, policy).unwrap();
    RequestHandler::new(Arc::new(store), max_payload)
}

/// Serve one encoded request; return the outcome and the raw bytes written
fn serve_bytes(handler: &RequestHandler, input: Vec<u8>) -> (Outcome, Vec<u8>) {
    let mut reader = Cursor::new(input);
    let mut output = Vec::new();
    let outcome = handler.serve(&mut reader, &mut output, "test-peer");
    (outcome, output)
}

fn roundtrip(handler: &RequestHandler, request: &Request) -> Response {
    let (outcome, output) = serve_bytes(handler, encode_request(request).unwrap());
    let response = decode_response(&output).unwrap();
    assert_eq!(outcome, Outcome::Responded(response.status));
    response
}

fn put(filename: &str, data: &[u8]) -> Request {
    Request::Put {
        filename: filename.to_string(),
        data: data.to_vec(),
    }
}

/// Writer whose peer has gone away
struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Successful Request Tests
// =============================================================================

#[test]
fn test_put_returns_id() {
    let (_temp, handler) = setup_temp_handler();

    let response = roundtrip(&handler, &put("notes.txt", b"hello"));

    assert_eq!(response.status, Status::Success);
    assert_eq!(response.id, Some(1));
    assert!(response.payload.is_none());
}

#[test]
fn test_get_by_id_and_name() {
    let (_temp, handler) = setup_temp_handler();
    roundtrip(&handler, &put("notes.txt", b"hello"));

    let by_id = roundtrip(&handler, &Request::GetById { id: 1 });
    assert_eq!(by_id.status, Status::Success);
    assert_eq!(by_id.payload.as_deref(), Some(&b"hello"[..]));

    let by_name = roundtrip(
        &handler,
        &Request::GetByName {
            filename: "notes.txt".to_string(),
        },
    );
    assert_eq!(by_name.payload.as_deref(), Some(&b"hello"[..]));
}

#[test]
fn test_get_empty_file_has_empty_payload() {
    let (_temp, handler) = setup_temp_handler();
    roundtrip(&handler, &put("empty.txt", b""));

    let response = roundtrip(&handler, &Request::GetById { id: 1 });

    assert_eq!(response.status, Status::Success);
    assert_eq!(response.payload, Some(Vec::new()));
}

#[test]
fn test_delete_then_delete_again() {
    let (_temp, handler) = setup_temp_handler();
    roundtrip(&handler, &put("notes.txt", b"hello"));

    let first = roundtrip(&handler, &Request::DeleteById { id: 1 });
    let second = roundtrip(&handler, &Request::DeleteById { id: 1 });

    assert_eq!(first.status, Status::Success);
    assert_eq!(second.status, Status::NotFound);
}

#[test]
fn test_delete_by_name() {
    let (_temp, handler) = setup_temp_handler();
    roundtrip(&handler, &put("photo.png", b"png"));

    let response = roundtrip(
        &handler,
        &Request::DeleteByName {
            filename: "photo.png".to_string(),
        },
    );
    assert_eq!(response.status, Status::Success);

    let gone = roundtrip(&handler, &Request::GetById { id: 1 });
    assert_eq!(gone.status, Status::NotFound);
}

// =============================================================================
// Error Status Tests
// =============================================================================

#[test]
fn test_disallowed_extension_is_forbidden() {
    let (_temp, handler) = setup_temp_handler();

    let response = roundtrip(&handler, &put("a.exe", b"MZ"));

    assert_eq!(response.status, Status::Forbidden);
    assert_eq!(response.id, None);
}

#[test]
fn test_missing_file_is_not_found() {
    let (_temp, handler) = setup_temp_handler();

    let response = roundtrip(&handler, &Request::GetById { id: 99 });

    assert_eq!(response.status, Status::NotFound);
    assert!(response.payload.is_none());
}

#[test]
fn test_storage_failure_is_internal_error() {
    let temp = TempDir::new().unwrap();
    let handler = handler_at(temp.path(), DEFAULT_MAX_PAYLOAD_SIZE);

    // Block the snapshot so the commit cannot be recorded
    let snapshot = temp
        .path()
        .join(FileStore::META_DIR)
        .join("mappings.snapshot");
    std::fs::create_dir(&snapshot).unwrap();

    let response = roundtrip(&handler, &put("notes.txt", b"hello"));

    assert_eq!(response.status, Status::InternalServerError);
    assert!(!temp.path().join("notes.txt").exists());
}

#[test]
fn test_content_commit_failure_is_internal_error() {
    let temp = TempDir::new().unwrap();
    let handler = handler_at(temp.path(), DEFAULT_MAX_PAYLOAD_SIZE);

    let blocked = temp.path().join("notes.txt");
    std::fs::create_dir(&blocked).unwrap();
    std::fs::write(blocked.join("inner.txt"), b"x").unwrap();

    let response = roundtrip(&handler, &put("notes.txt", b"hello"));

    assert_eq!(response.status, Status::InternalServerError);
    assert_eq!(response.id, None);
    let lookup = roundtrip(
        &handler,
        &Request::GetByName {
            filename: "notes.txt".to_string(),
        },
    );
    assert_eq!(lookup.status, Status::NotFound);
}

// =============================================================================
// Dropped Connection Tests
// =============================================================================

#[test]
fn test_bad_magic_drops_without_response() {
    let (_temp, handler) = setup_temp_handler();
    let mut bytes = encode_request(&Request::GetById { id: 1 }).unwrap();
    bytes[0] = 0x00;

    let (outcome, output) = serve_bytes(&handler, bytes);

    assert_eq!(outcome, Outcome::Dropped);
    assert!(output.is_empty());
}

#[test]
fn test_unknown_method_drops() {
    let (_temp, handler) = setup_temp_handler();
    let mut bytes = encode_request(&Request::GetById { id: 1 }).unwrap();
    bytes[4..8].copy_from_slice(&9i32.to_be_bytes());

    let (outcome, output) = serve_bytes(&handler, bytes);

    assert_eq!(outcome, Outcome::Dropped);
    assert!(output.is_empty());
}

#[test]
fn test_empty_connection_drops() {
    let (_temp, handler) = setup_temp_handler();

    let (outcome, output) = serve_bytes(&handler, Vec::new());

    assert_eq!(outcome, Outcome::Dropped);
    assert!(output.is_empty());
}

#[test]
fn test_truncated_request_drops() {
    let (_temp, handler) = setup_temp_handler();
    let bytes = encode_request(&put("notes.txt", b"hello world")).unwrap();

    let (outcome, output) = serve_bytes(&handler, bytes[..bytes.len() - 4].to_vec());

    assert_eq!(outcome, Outcome::Dropped);
    assert!(output.is_empty());
}

#[test]
fn test_oversize_upload_drops_and_stores_nothing() {
    let temp = TempDir::new().unwrap();
    let handler = handler_at(temp.path(), 16);

    let (outcome, output) = serve_bytes(
        &handler,
        encode_request(&put("big.txt", &[7u8; 17])).unwrap(),
    );

    assert_eq!(outcome, Outcome::Dropped);
    assert!(output.is_empty());
    assert!(!temp.path().join("big.txt").exists());
}

#[test]
fn test_write_failure_drops() {
    let (_temp, handler) = setup_temp_handler();
    let mut reader = Cursor::new(encode_request(&put("notes.txt", b"hi")).unwrap());

    let outcome = handler.serve(&mut reader, &mut BrokenPipe, "test-peer");

    assert_eq!(outcome, Outcome::Dropped);
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_dispatch_without_streams() {
    let (_temp, handler) = setup_temp_handler();

    let stored = handler.dispatch(put("doc.pdf", b"%PDF"));
    assert_eq!(stored, Response::success_with_id(1));

    let fetched = handler.dispatch(Request::GetByName {
        filename: "doc.pdf".to_string(),
    });
    assert_eq!(fetched, Response::success_with_payload(b"%PDF".to_vec()));
}
