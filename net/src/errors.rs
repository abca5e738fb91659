use std::fmt::{self, Display, Formatter};

use crate::data_types::PortNumber;

/// Failures reported by the socket layer. None of these are retried internally, with the
/// exception of transient accept errors when the endpoint is configured to retry them.
#[derive(Debug, PartialEq)]
pub enum SocketError {
    Init { msg: String },
    Create { msg: String },
    Connect { address: String, msg: String },
    Bind { port: PortNumber, msg: String },
    Accept { msg: String },
    Send { msg: String },
    Receive { msg: String },
    InvalidConfig { msg: String },
    Pool(PoolError),
}

pub type SocketResult<T> = Result<T, SocketError>;

/// Failures submitting work to, or constructing, a worker pool
#[derive(Debug, PartialEq)]
pub enum PoolError {
    Closed,
    InvalidSize,
    Spawn { msg: String },
}

pub type PoolResult<T> = Result<T, PoolError>;

/// Outcome of a work item that did not produce a value
#[derive(Debug, PartialEq)]
pub enum WorkError {
    Panicked { msg: String },
    Abandoned,
}

pub type WorkResult<T> = Result<T, WorkError>;

impl Display for SocketError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SocketError::Init { msg } => write!(f, "Failed to initialize network subsystem: {msg}"),
            SocketError::Create { msg } => write!(f, "Failed to create socket: {msg}"),
            SocketError::Connect { address, msg } => {
                write!(f, "Failed to connect to {address}: {msg}")
            }
            SocketError::Bind { port, msg } => write!(f, "Failed to bind port {port}: {msg}"),
            SocketError::Accept { msg } => write!(f, "Accept failed: {msg}"),
            SocketError::Send { msg } => write!(f, "Send failed: {msg}"),
            SocketError::Receive { msg } => write!(f, "Receive failed: {msg}"),
            SocketError::InvalidConfig { msg } => {
                write!(f, "Invalid endpoint configuration: {msg}")
            }
            SocketError::Pool(err) => write!(f, "Connection worker pool: {err}"),
        }
    }
}

impl Display for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Closed => write!(f, "Work submitted to a worker pool that is shutting down"),
            PoolError::InvalidSize => write!(f, "A worker pool needs at least one worker"),
            PoolError::Spawn { msg } => write!(f, "Failed to spawn worker thread: {msg}"),
        }
    }
}

impl Display for WorkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WorkError::Panicked { msg } => write!(f, "Work item panicked: {msg}"),
            WorkError::Abandoned => write!(f, "Work item was dropped before it ran"),
        }
    }
}

impl std::error::Error for SocketError {}
impl std::error::Error for PoolError {}
impl std::error::Error for WorkError {}

impl From<PoolError> for SocketError {
    fn from(err: PoolError) -> Self {
        SocketError::Pool(err)
    }
}
