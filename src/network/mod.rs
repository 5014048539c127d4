//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections
//! - One request and one response per connection, run by `RequestHandler`

mod connection;
mod handler;
mod pool;
mod registry;
mod server;

pub use connection::Connection;
pub use handler::{Outcome, RequestHandler};
pub use pool::WorkerPool;
pub use registry::{ConnectionRegistry, Registration};
pub use server::{Server, ShutdownHandle};
