use serde::Deserialize;

use crate::{
    data_types::ListenBacklog,
    errors::{SocketError, SocketResult},
};

pub const DEFAULT_LISTEN_BACKLOG: ListenBacklog = 5;
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 4096;

/// Tuning for an `Endpoint`. The defaults reproduce the classic behaviour: a backlog of 5
/// pending connections, 4 threads handling accepted connections and a 4KiB receive buffer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Maximum number of connections the OS queues before they are accepted
    pub listen_backlog: ListenBacklog,

    /// Number of accepted connections that are handled concurrently. Further connections
    /// wait in the worker pool queue
    pub worker_count: usize,

    /// Maximum number of bytes returned by one `Connection::receive()`
    pub receive_buffer_size: usize,

    /// When true, accept errors that only affect the connection being accepted are logged
    /// and the listener carries on. When false, any accept error stops the listener
    pub retry_transient_accept_errors: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
            worker_count: DEFAULT_WORKER_COUNT,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            retry_transient_accept_errors: true,
        }
    }
}

impl EndpointConfig {
    pub fn validate(self: &Self) -> SocketResult<()> {
        if self.listen_backlog == 0 {
            return Err(invalid("listen_backlog must be at least 1"));
        }
        if self.worker_count == 0 {
            return Err(invalid("worker_count must be at least 1"));
        }
        if self.receive_buffer_size == 0 {
            return Err(invalid("receive_buffer_size must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> SocketError {
    SocketError::InvalidConfig {
        msg: String::from(msg),
    }
}
