//! Process-wide engine runtime.
//!
//! Backends may need one-time library setup shared by every world in the
//! process. Each world holds a [`RuntimeLease`] for its whole life; the first
//! lease brings the runtime up and the last one to drop tears it down.
//!
//! The count lives behind its own lock. World locks are never taken while it
//! is held, so destroying one world cannot deadlock against creating another.

use parking_lot::{const_mutex, Mutex};

/// Shared reference-counted runtime.
pub struct EngineRuntime {
    name: &'static str,
    state: Mutex<RuntimeState>,
}

#[derive(Debug, Default)]
struct RuntimeState {
    /// Live leases.
    worlds: u32,
    /// Number of times the runtime has been brought up.
    generation: u64,
}

/// The runtime every [`crate::World`] leases.
pub static ENGINE: EngineRuntime = EngineRuntime::new("dfx-physics");

impl EngineRuntime {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: const_mutex(RuntimeState {
                worlds: 0,
                generation: 0,
            }),
        }
    }

    /// Take a lease, initializing the runtime if this is the first one.
    pub fn acquire(&'static self) -> RuntimeLease {
        let mut state = self.state.lock();
        if state.worlds == 0 {
            state.generation += 1;
            log::info!("{}: runtime up (generation {})", self.name, state.generation);
        }
        state.worlds += 1;
        RuntimeLease { runtime: self }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        if state.worlds == 0 {
            log::warn!("{}: release without a live lease", self.name);
            return;
        }
        state.worlds -= 1;
        if state.worlds == 0 {
            log::info!("{}: runtime down", self.name);
        }
    }

    /// Number of live leases.
    pub fn active_worlds(&self) -> u32 {
        self.state.lock().worlds
    }

    /// Number of times the runtime has been initialized.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

/// Keeps the runtime alive. Releases on drop.
#[must_use]
pub struct RuntimeLease {
    runtime: &'static EngineRuntime,
}

impl std::fmt::Debug for RuntimeLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLease")
            .field("runtime", &self.runtime.name)
            .finish()
    }
}

impl Drop for RuntimeLease {
    fn drop(&mut self) {
        self.runtime.release();
    }
}
