use std::sync::Mutex;

use lazy_static::lazy_static;
use log::info;

use crate::errors::{SocketError, SocketResult};

struct SubsystemState {
    active_endpoints: usize,
    generation: u64,
}

lazy_static! {
    static ref SUBSYSTEM: Mutex<SubsystemState> = Mutex::new(SubsystemState {
        active_endpoints: 0,
        generation: 0,
    });
}

/// Process wide network state shared by every endpoint. The first endpoint to be
/// constructed starts it and dropping the last one tears it down again.
///
/// Starting and tearing down only count references and log. The standard library performs
/// any platform socket startup itself, so no OS calls are made here.
///
/// An endpoint holds one `NetworkSubsystem` for its whole lifetime.
pub struct NetworkSubsystem {
    generation: u64,
}

impl NetworkSubsystem {
    pub fn acquire() -> SocketResult<Self> {
        let mut state = SUBSYSTEM.lock().map_err(|_| SocketError::Init {
            msg: String::from("network subsystem state is poisoned"),
        })?;

        if state.active_endpoints == 0 {
            state.generation += 1;
            info!("NetworkSubsystem: Started generation {}", state.generation);
        }
        state.active_endpoints += 1;

        Ok(Self {
            generation: state.generation,
        })
    }

    /// Number of endpoints currently holding the subsystem
    pub fn active_endpoints() -> usize {
        match SUBSYSTEM.lock() {
            Ok(state) => state.active_endpoints,
            Err(poisoned) => poisoned.into_inner().active_endpoints,
        }
    }

    /// Increments each time the subsystem is started after a full teardown
    pub fn generation(self: &Self) -> u64 {
        self.generation
    }
}

impl Drop for NetworkSubsystem {
    fn drop(&mut self) {
        let mut state = match SUBSYSTEM.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.active_endpoints = state.active_endpoints.saturating_sub(1);
        if state.active_endpoints == 0 {
            info!("NetworkSubsystem: Torn down generation {}", state.generation);
        }
    }
}
