use super::connection::Connection;

/// What an endpoint does with each established connection.
///
/// On the server side `on_accept` runs on a worker pool thread, on the client side it runs
/// on the thread that called `Endpoint::connect()`. The handler owns the connection for
/// the duration of the call; the connection is closed when it is dropped.
///
/// Any `Fn(Connection)` closure that is `Send + Sync` is a handler.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn on_accept(self: &Self, connection: Connection);
}

impl<F> ConnectionHandler for F
where
    F: Fn(Connection) + Send + Sync + 'static,
{
    fn on_accept(self: &Self, connection: Connection) {
        self(connection)
    }
}
