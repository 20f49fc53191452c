//! Dynasty rosters and the proposer schedule.
//!
//! A dynasty is the ordered committee of miners valid for one dynasty window.
//! The proposer for a slot is fixed by the slot's offset inside the window,
//! reduced modulo the roster size, so every node derives the same schedule
//! without communication.

use crate::domain::timing;
use crate::error::{PodError, PodResult};
use parking_lot::RwLock;
use pod_types::constants::{BLOCK_INTERVAL_MS, DYNASTY_INTERVAL_MS, SECOND_MS};
use pod_types::Address;
use std::collections::HashMap;

/// Ordered miner committee for one dynasty window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynastyRoster {
    members: Vec<Address>,
}

impl DynastyRoster {
    pub fn new(members: Vec<Address>) -> Self {
        Self { members }
    }

    /// Members in schedule order.
    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The proposer scheduled for the slot at `timestamp` seconds.
    pub fn proposer_at(&self, timestamp: i64) -> PodResult<Address> {
        find_proposer(timestamp, &self.members)
    }
}

/// Resolve the scheduled proposer for `timestamp` from an ordered miner list.
///
/// Fails with `InvalidBlockInterval` when the timestamp is not slot-aligned,
/// and with `DynastyNotFound` when the list is empty.
pub fn find_proposer(timestamp: i64, miners: &[Address]) -> PodResult<Address> {
    let ts_ms = timestamp * SECOND_MS;
    if ts_ms % BLOCK_INTERVAL_MS != 0 {
        return Err(PodError::InvalidBlockInterval);
    }
    if miners.is_empty() {
        return Err(PodError::DynastyNotFound(timing::serial(timestamp)));
    }
    let offset = (ts_ms % DYNASTY_INTERVAL_MS) / BLOCK_INTERVAL_MS;
    let index = offset as usize % miners.len();
    Ok(miners[index])
}

/// Cache of dynasty rosters keyed by serial.
///
/// Written only by the engine loop at dynasty boundaries, read by the
/// verification paths on chain threads. Entries are immutable once resident.
#[derive(Debug, Default)]
pub struct DynastyRegistry {
    rosters: RwLock<HashMap<i64, DynastyRoster>>,
}

impl DynastyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, serial: i64) -> Option<DynastyRoster> {
        self.rosters.read().get(&serial).cloned()
    }

    pub fn contains(&self, serial: i64) -> bool {
        self.rosters.read().contains_key(&serial)
    }

    /// Insert a roster for `serial`. A resident entry is never replaced.
    pub fn insert(&self, serial: i64, roster: DynastyRoster) {
        self.rosters.write().entry(serial).or_insert(roster);
    }

    pub fn len(&self) -> usize {
        self.rosters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.read().is_empty()
    }
}
