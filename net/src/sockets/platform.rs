use std::{io, net::TcpListener};

use crate::data_types::ListenBacklog;

#[cfg(not(unix))]
use log::info;

/// True when the OS could not allocate the socket itself, as opposed to failing the
/// bind or connect that std performs in the same call
#[cfg(unix)]
pub(super) fn is_allocation_failure(error: &io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(libc::EMFILE) | Some(libc::ENFILE) | Some(libc::ENOBUFS) | Some(libc::ENOMEM)
    )
}

#[cfg(not(unix))]
pub(super) fn is_allocation_failure(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::OutOfMemory
}

/// Std listens with its own backlog. Calling listen(2) again on a listening socket
/// replaces the backlog with ours.
#[cfg(unix)]
pub(super) fn apply_backlog(listener: &TcpListener, backlog: ListenBacklog) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let backlog = libc::c_int::try_from(backlog).unwrap_or(libc::c_int::MAX);
    // SAFETY: the descriptor is owned by `listener` and stays open for the whole call
    let outcome = unsafe { libc::listen(listener.as_raw_fd(), backlog) };
    if outcome == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub(super) fn apply_backlog(_listener: &TcpListener, backlog: ListenBacklog) -> io::Result<()> {
    info!("Endpoint: Backlog of {backlog} ignored, using the platform default");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_not_treat_refusal_as_allocation_failure() {
        let error = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(!is_allocation_failure(&error));
    }

    #[cfg(unix)]
    #[test]
    fn should_treat_descriptor_exhaustion_as_allocation_failure() {
        let error = io::Error::from_raw_os_error(libc::EMFILE);
        assert!(is_allocation_failure(&error));
    }

    #[test]
    fn should_apply_backlog_to_bound_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        assert!(apply_backlog(&listener, 5).is_ok());
    }
}
