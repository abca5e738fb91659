use log::{info, warn};
use tcp_pool_net::Connection;

/// The reply the server sends for a message: PONG for PING, anything else is echoed
pub(crate) fn reply_to(message: &str) -> &str {
    if message == "PING" {
        "PONG"
    } else {
        message
    }
}

/// Server side session. Replies to each message until the client sends an empty
/// message or goes away.
pub(crate) fn serve_connection(mut connection: Connection) {
    let peer = connection.peer_addr();
    loop {
        match connection.receive_string() {
            Ok(message) if message.is_empty() => break,
            Ok(message) => {
                info!("Echo: {peer:?} sent {message:?}");
                if let Err(e) = connection.send_string(reply_to(&message)) {
                    warn!("Echo: Failed to reply to {peer:?}: {e}");
                    break;
                }
            }
            Err(e) => {
                warn!("Echo: Failed to receive from {peer:?}: {e}");
                break;
            }
        }
    }
    connection.close();
}

/// Client side session. Sends one message, logs the reply and ends the session
pub(crate) fn request(mut connection: Connection, message: &str) -> Option<String> {
    if let Err(e) = connection.send_string(message) {
        warn!("Echo: Failed to send {message:?}: {e}");
        return None;
    }
    let reply = match connection.receive_string() {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Echo: No reply to {message:?}: {e}");
            return None;
        }
    };
    info!("Echo: Sent {message:?}, received {reply:?}");

    // An empty message tells the server we are done
    if let Err(e) = connection.send_string("") {
        warn!("Echo: Failed to end the session: {e}");
    }
    connection.close();
    Some(reply)
}
