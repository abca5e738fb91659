use std::{
    io::{self, ErrorKind},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::{error, info, warn};

use super::{connection::Connection, handler::ConnectionHandler};
use crate::{
    data_types::ConnectionId,
    errors::{SocketError, SocketResult},
    worker_pool::WorkerPool,
};

/// Owns a bound Tcp listener and the worker pool for its connections. Accepts connections
/// and submits each one to the pool, where the handler runs. Construct with new() then call
/// run() on the thread that should block on accept.
pub(super) struct ListenerThread<H: ConnectionHandler> {
    listener: TcpListener,
    local_addr: SocketAddr,
    pool: WorkerPool,
    handler: Arc<H>,
    stop_signal: Arc<AtomicBool>,
    receive_buffer_size: usize,
    retry_transient_errors: bool,
    next_connection_id: ConnectionId,
}

impl<H: ConnectionHandler> ListenerThread<H> {
    pub(super) fn new(
        listener: TcpListener,
        local_addr: SocketAddr,
        pool: WorkerPool,
        handler: &Arc<H>,
        stop_signal: &Arc<AtomicBool>,
        receive_buffer_size: usize,
        retry_transient_errors: bool,
    ) -> Self {
        Self {
            listener,
            local_addr,
            pool,
            handler: handler.clone(),
            stop_signal: stop_signal.clone(),
            receive_buffer_size,
            retry_transient_errors,
            next_connection_id: 1,
        }
    }

    /// Accepts connections until stopped or until accept fails with a fatal error.
    /// This method owns Self so that the listener is closed and the pool is drained
    /// and joined when it returns.
    pub(super) fn run(mut self: Self) -> SocketResult<()> {
        info!("ListenerThread: Started on {}", self.local_addr);

        let outcome = loop {
            if self.stop_signal.load(Ordering::Acquire) {
                break Ok(());
            }
            match self.listener.accept() {
                Ok((stream, address)) => {
                    if self.stop_signal.load(Ordering::Acquire) {
                        // The connection that woke us up to stop
                        break Ok(());
                    }
                    if let Err(e) = self.handle_connection(stream, address) {
                        break Err(e);
                    }
                }
                Err(e) => {
                    if let Some(err) = self.on_accept_error(&e) {
                        break Err(err);
                    }
                }
            }
        };

        info!(
            "ListenerThread: Stopping, waiting for {} queued connections",
            self.pool.pending_count()
        );
        self.pool.shutdown();
        info!("ListenerThread: Stopped");
        outcome
    }

    fn handle_connection(
        self: &mut Self,
        stream: TcpStream,
        address: SocketAddr,
    ) -> SocketResult<()> {
        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;
        info!("ListenerThread: A client connected from {address}. Id={connection_id}");

        let connection = Connection::new(stream, self.receive_buffer_size);
        let handler = self.handler.clone();

        // The handle is not kept, a panicking handler is logged by the pool
        self.pool.submit(move || handler.on_accept(connection))?;
        Ok(())
    }

    /// Returns the error that ends the accept loop, or None to keep accepting
    fn on_accept_error(self: &Self, e: &io::Error) -> Option<SocketError> {
        if self.retry_transient_errors && is_transient(e) {
            warn!("ListenerThread: Ignoring transient accept error: {e}");
            None
        } else {
            Some(self.fatal(e))
        }
    }

    fn fatal(self: &Self, e: &io::Error) -> SocketError {
        error!("ListenerThread: Accept failed on {}: {e}", self.local_addr);
        self.stop_signal.store(true, Ordering::Release);
        SocketError::Accept { msg: e.to_string() }
    }
}

/// Errors that concern only the connection being accepted, not the listening socket
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Interrupted
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener_thread(retry_transient_errors: bool) -> ListenerThread<fn(Connection)> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let local_addr = listener.local_addr().unwrap();
        let handler: fn(Connection) = |_connection| {};
        ListenerThread::new(
            listener,
            local_addr,
            WorkerPool::new(1).unwrap(),
            &Arc::new(handler),
            &Arc::new(AtomicBool::new(false)),
            4096,
            retry_transient_errors,
        )
    }

    #[test]
    fn should_retry_transient_accept_errors_when_configured() {
        let listener_thread = listener_thread(true);
        let error = io::Error::from(ErrorKind::ConnectionAborted);
        let outcome = listener_thread.on_accept_error(&error);

        assert_eq!(None, outcome);
        assert!(!listener_thread.stop_signal.load(Ordering::Acquire));
    }

    #[test]
    fn should_stop_on_permanent_accept_errors() {
        let listener_thread = listener_thread(true);
        let error = io::Error::from(ErrorKind::PermissionDenied);
        let outcome = listener_thread.on_accept_error(&error);

        assert!(matches!(outcome, Some(SocketError::Accept { .. })), "{outcome:?}");
        assert!(listener_thread.stop_signal.load(Ordering::Acquire));
    }

    #[test]
    fn should_treat_every_accept_error_as_fatal_without_retry() {
        let listener_thread = listener_thread(false);
        let error = io::Error::from(ErrorKind::Interrupted);
        let outcome = listener_thread.on_accept_error(&error);

        assert!(matches!(outcome, Some(SocketError::Accept { .. })), "{outcome:?}");
        assert!(listener_thread.stop_signal.load(Ordering::Acquire));
    }

    #[test]
    fn should_classify_transient_accept_errors() {
        assert!(is_transient(&io::Error::from(ErrorKind::ConnectionAborted)));
        assert!(is_transient(&io::Error::from(ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(ErrorKind::PermissionDenied)));
        assert!(!is_transient(&io::Error::from(ErrorKind::InvalidInput)));
    }
}
