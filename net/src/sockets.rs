/*
Thin wrapper around sockets implemenation in the standard library.
Accepted connections are handed to a bounded pool of worker threads instead of a
thread per connection.
*/
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod handler;
pub mod subsystem;

mod listener_thread;
mod platform;

/// Marks the end of a message on the wire
pub const MESSAGE_TERMINATOR: u8 = 0;
