use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{info, warn};

use super::{
    config::EndpointConfig, connection::Connection, handler::ConnectionHandler,
    listener_thread::ListenerThread, platform, subsystem::NetworkSubsystem,
};
use crate::{
    data_types::PortNumber,
    errors::{SocketError, SocketResult},
    worker_pool::WorkerPool,
};

const WAKE_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const CONNECTION_POOL_NAME: &str = "connection";

/// A socket that either connects to a remote host or listens for connections, passing
/// every established connection to its `ConnectionHandler`.
///
/// Client side, `connect()` calls the handler on the calling thread. Server side, `listen()`
/// (or `bind()` then `accept_loop()`) blocks the calling thread accepting connections, and
/// the handler runs on a pool of `worker_count` threads. Connections beyond that wait in
/// the pool queue, they are not dropped.
///
/// Use a `StopHandle` from another thread to make the accept loop return.
pub struct Endpoint<H: ConnectionHandler> {
    handler: Arc<H>,
    config: EndpointConfig,
    listener: Option<TcpListener>,
    local_addr: Option<SocketAddr>,
    stop_signal: Arc<AtomicBool>,
    _subsystem: NetworkSubsystem,
}

/// Stops the accept loop of an endpoint, from any thread
#[derive(Clone)]
pub struct StopHandle {
    stop_signal: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl<H: ConnectionHandler> Endpoint<H> {
    pub fn new(handler: H, config: EndpointConfig) -> SocketResult<Self> {
        config.validate()?;
        let subsystem = NetworkSubsystem::acquire()?;
        Ok(Self {
            handler: Arc::new(handler),
            config,
            listener: None,
            local_addr: None,
            stop_signal: Arc::new(AtomicBool::new(false)),
            _subsystem: subsystem,
        })
    }

    pub fn with_defaults(handler: H) -> SocketResult<Self> {
        Self::new(handler, EndpointConfig::default())
    }

    pub fn config(self: &Self) -> &EndpointConfig {
        &self.config
    }

    /// The address the endpoint is bound to, once `bind()` succeeded
    pub fn local_addr(self: &Self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Connects to `address` (a dotted IPv4 address or a host name) and, once connected,
    /// passes the connection to the handler on this thread. Returns after the handler returns.
    pub fn connect(self: &Self, address: &str, port: PortNumber) -> SocketResult<()> {
        let authority = format!("{address}:{port}");
        let remote = resolve_ipv4(address, port, &authority)?;

        let stream = TcpStream::connect(remote).map_err(|e| {
            if platform::is_allocation_failure(&e) {
                SocketError::Create { msg: e.to_string() }
            } else {
                SocketError::Connect {
                    address: authority.clone(),
                    msg: e.to_string(),
                }
            }
        })?;
        info!("Endpoint: Connected to {authority}");

        self.handler
            .on_accept(Connection::new(stream, self.config.receive_buffer_size));
        Ok(())
    }

    /// Binds to `port` on all local IPv4 interfaces. Port 0 picks a free port; the
    /// address actually bound is returned.
    pub fn bind(self: &mut Self, port: PortNumber) -> SocketResult<SocketAddr> {
        let bind_error = |msg: String| SocketError::Bind { port, msg };

        let listener = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
            .map_err(|e| {
                if platform::is_allocation_failure(&e) {
                    SocketError::Create { msg: e.to_string() }
                } else {
                    bind_error(e.to_string())
                }
            })?;
        platform::apply_backlog(&listener, self.config.listen_backlog)
            .map_err(|e| bind_error(e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| bind_error(e.to_string()))?;

        info!(
            "Endpoint: Bound to {local_addr} with a backlog of {}",
            self.config.listen_backlog
        );

        self.listener = Some(listener);
        self.local_addr = Some(local_addr);
        self.stop_signal = Arc::new(AtomicBool::new(false));
        Ok(local_addr)
    }

    /// A handle that stops the accept loop. Only available once the endpoint is bound
    pub fn stop_handle(self: &Self) -> Option<StopHandle> {
        self.local_addr.map(|local_addr| StopHandle {
            stop_signal: self.stop_signal.clone(),
            wake_addr: wake_addr(local_addr),
        })
    }

    /// Accepts connections on the bound socket until stopped, dispatching each one to a
    /// pool of `worker_count` threads. Blocks the calling thread. Returns `Ok(())` after a
    /// `StopHandle` was used and every accepted connection has been handled, or the first
    /// fatal accept error. The listening socket is closed when this returns.
    pub fn accept_loop(self: &mut Self) -> SocketResult<()> {
        let listener = self.listener.take().ok_or_else(|| SocketError::Accept {
            msg: String::from("endpoint is not bound"),
        })?;
        let local_addr = self.local_addr.take().unwrap_or_else(|| {
            SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
        });

        let pool = WorkerPool::named(CONNECTION_POOL_NAME, self.config.worker_count)?;

        ListenerThread::new(
            listener,
            local_addr,
            pool,
            &self.handler,
            &self.stop_signal,
            self.config.receive_buffer_size,
            self.config.retry_transient_accept_errors,
        )
        .run()
    }

    /// Binds to `port` then runs the accept loop on this thread
    pub fn listen(self: &mut Self, port: PortNumber) -> SocketResult<()> {
        self.bind(port)?;
        self.accept_loop()
    }
}

impl StopHandle {
    /// Signals the accept loop to stop and wakes it with a throwaway connection.
    /// Returns immediately; the loop finishes the connections it already accepted.
    pub fn stop(self: &Self) {
        if self.stop_signal.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("StopHandle: Stopping listener on {}", self.wake_addr);

        // We need to initiate a connection to wake the listener thread
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, WAKE_CONNECT_TIMEOUT) {
            warn!(
                "StopHandle: Failed to wake listener on {}, it stops on the next connection: {e}",
                self.wake_addr
            );
        }
    }

    pub fn is_stopped(self: &Self) -> bool {
        self.stop_signal.load(Ordering::Acquire)
    }
}

/// A listener bound to all interfaces is reached through loopback
fn wake_addr(local_addr: SocketAddr) -> SocketAddr {
    if local_addr.ip().is_unspecified() {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, local_addr.port()))
    } else {
        local_addr
    }
}

fn resolve_ipv4(address: &str, port: PortNumber, authority: &str) -> SocketResult<SocketAddr> {
    let connect_error = |msg: String| SocketError::Connect {
        address: String::from(authority),
        msg,
    };

    (address, port)
        .to_socket_addrs()
        .map_err(|e| connect_error(e.to_string()))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| connect_error(String::from("no IPv4 address found")))
}
