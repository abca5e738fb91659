/// Type aliases shared across the crate
pub mod data_types;

/// Error types returned by the worker pool and the socket layer
pub mod errors;

/// A fixed size pool of worker threads that executes closures and hands back a result handle
pub mod worker_pool;

/// Thin wrapper around sockets implemenation in the standard library that dispatches
/// accepted connections to a worker pool
pub mod sockets;

pub use errors::{PoolError, PoolResult, SocketError, SocketResult, WorkError, WorkResult};
pub use sockets::{
    config::EndpointConfig, connection::Connection, endpoint::Endpoint, endpoint::StopHandle,
    handler::ConnectionHandler, subsystem::NetworkSubsystem,
};
pub use worker_pool::{work_handle::WorkHandle, WorkerPool};
