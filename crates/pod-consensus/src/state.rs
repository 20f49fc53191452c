//! Local mining gate.
//!
//! The gate moves between three states. `enable_mining` unlocks the key and
//! moves Disabled to Pending; `resume_mining`/`suspend_mining` toggle Pending
//! and Active; `disable_mining` locks the key and returns to Disabled.

use std::sync::atomic::{AtomicBool, Ordering};

/// Observable state of the mining gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MiningState {
    Disabled,
    Pending,
    Active,
}

/// Atomic flags behind the mining gate. Read by the control loop every tick,
/// written by external commands.
#[derive(Debug)]
pub struct MiningGate {
    enabled: AtomicBool,
    pending: AtomicBool,
    beat_launched: AtomicBool,
}

impl MiningGate {
    /// Initial state: pending, not enabled.
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            pending: AtomicBool::new(true),
            beat_launched: AtomicBool::new(false),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn suspend(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Relaxed)
    }

    /// Whether the first heartbeat after enable already fired.
    pub fn beat_launched(&self) -> bool {
        self.beat_launched.load(Ordering::Relaxed)
    }

    pub fn mark_beat_launched(&self) {
        self.beat_launched.store(true, Ordering::SeqCst);
    }

    pub fn state(&self) -> MiningState {
        if !self.is_enabled() {
            MiningState::Disabled
        } else if self.is_pending() {
            MiningState::Pending
        } else {
            MiningState::Active
        }
    }
}

impl Default for MiningGate {
    fn default() -> Self {
        Self::new()
    }
}
