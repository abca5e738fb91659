use std::{
    io::{Read, Write},
    net::{Shutdown, SocketAddr, TcpStream},
    time::Duration,
};

use log::{info, warn};

#[cfg(debug_assertions)]
use log::debug;

use super::MESSAGE_TERMINATOR;
use crate::errors::{SocketError, SocketResult};

/// One established duplex byte stream with a peer.
///
/// A connection has exactly one owner at a time and cannot be cloned. The socket is closed
/// when the connection is dropped, or earlier through `close()`, so it can never be closed
/// twice or used after it was closed.
///
/// Messages are null terminated text. One `send()` is one write of the payload plus a
/// terminator, one `receive()` is one read of at most `receive_buffer_size` bytes. There is
/// no reassembly of messages split across reads and no retry of short writes.
pub struct Connection {
    stream: TcpStream,
    peer_addr: Option<SocketAddr>,
    receive_buffer_size: usize,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, receive_buffer_size: usize) -> Self {
        let peer_addr = stream.peer_addr().ok();
        Self {
            stream,
            peer_addr,
            receive_buffer_size,
        }
    }

    pub fn peer_addr(self: &Self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn receive_buffer_size(self: &Self) -> usize {
        self.receive_buffer_size
    }

    /// Makes `receive()` fail instead of blocking forever when the peer goes quiet
    pub fn set_read_timeout(self: &Self, timeout: Option<Duration>) -> SocketResult<()> {
        self.stream
            .set_read_timeout(timeout)
            .map_err(|e| SocketError::Receive { msg: e.to_string() })
    }

    /// Writes `payload` followed by the message terminator in a single write call.
    /// Returns the number of bytes the OS accepted, which is less than `payload.len() + 1`
    /// if the write was short.
    pub fn send(self: &mut Self, payload: &[u8]) -> SocketResult<usize> {
        let mut message = Vec::with_capacity(payload.len() + 1);
        message.extend_from_slice(payload);
        message.push(MESSAGE_TERMINATOR);

        #[cfg(debug_assertions)]
        debug!("Connection: Sending {} bytes to {:?}", message.len(), self.peer_addr);

        match self.stream.write(&message) {
            Ok(count) => {
                if count < message.len() {
                    warn!("Connection: Short write, {count} of {} bytes sent", message.len());
                }
                Ok(count)
            }
            Err(e) => Err(SocketError::Send { msg: e.to_string() }),
        }
    }

    pub fn send_string(self: &mut Self, text: &str) -> SocketResult<usize> {
        self.send(text.as_bytes())
    }

    /// Reads once from the stream and returns the bytes before the first terminator, or
    /// everything that was read if there is no terminator. A peer that closed the connection
    /// produces an empty message.
    pub fn receive(self: &mut Self) -> SocketResult<Vec<u8>> {
        let mut buffer = vec![0u8; self.receive_buffer_size];
        let count = self
            .stream
            .read(&mut buffer)
            .map_err(|e| SocketError::Receive { msg: e.to_string() })?;

        #[cfg(debug_assertions)]
        debug!("Connection: Received {count} bytes from {:?}", self.peer_addr);

        let length = until_terminator(&buffer[..count]).len();
        buffer.truncate(length);
        Ok(buffer)
    }

    /// Same as `receive()` with the bytes decoded as UTF-8. Invalid sequences are replaced
    pub fn receive_string(self: &mut Self) -> SocketResult<String> {
        let bytes = self.receive()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Shuts down both directions and closes the socket
    pub fn close(self: Self) {
        // The peer may already have closed its side
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            info!("Connection: Shutdown of {:?} reported {e}", self.peer_addr);
        }
        info!("Connection: Closed {:?}", self.peer_addr);
    }
}

fn until_terminator(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == MESSAGE_TERMINATOR) {
        Some(index) => &bytes[..index],
        None => bytes,
    }
}
