//! Pure consensus logic: timing, scheduling, ordering, finality, and the
//! bounded caches. Nothing in here talks to the chain, the network, or the
//! keychain.

pub mod dynasty;
pub mod finality;
pub mod fork_choice;
pub mod reversible;
pub mod slot_cache;
pub mod timing;
pub mod witness;

pub use dynasty::{find_proposer, DynastyRegistry, DynastyRoster};
pub use finality::{LibVerdict, ProposerTally};
pub use reversible::ReversibleCache;
pub use slot_cache::{classify_conflict, SlotCache};
pub use witness::WitnessPool;
