//! # Consensus Metrics
//!
//! Prometheus metrics for the mint pipeline.
//!
//! Enable with the `metrics` feature:
//! ```toml
//! pod-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `pod_mint_block_total` - Counter of blocks minted by this node
//! - `pod_block_packing_milliseconds` - Gauge of the last packing budget
//! - `pod_block_waiting_milliseconds` - Gauge of the last slot-boundary wait
//! - `pod_slot_cache_blocks` - Gauge of the slot cache population

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Blocks minted by this node
    pub static ref MINT_BLOCK: IntCounter = register_int_counter!(
        "pod_mint_block_total",
        "Total number of blocks minted by this node"
    )
    .expect("Failed to create MINT_BLOCK metric");

    /// Packing budget of the last mint attempt
    pub static ref BLOCK_PACKING_MS: IntGauge = register_int_gauge!(
        "pod_block_packing_milliseconds",
        "Packing budget of the last mint attempt in milliseconds"
    )
    .expect("Failed to create BLOCK_PACKING_MS metric");

    /// Slot-boundary wait of the last mint
    pub static ref BLOCK_WAITING_MS: IntGauge = register_int_gauge!(
        "pod_block_waiting_milliseconds",
        "Time the last minted block waited for its slot boundary"
    )
    .expect("Failed to create BLOCK_WAITING_MS metric");

    /// Slot cache population
    pub static ref SLOT_CACHE_BLOCKS: IntGauge = register_int_gauge!(
        "pod_slot_cache_blocks",
        "Number of blocks resident in the slot cache"
    )
    .expect("Failed to create SLOT_CACHE_BLOCKS metric");
}

/// Record one minted block
#[cfg(feature = "metrics")]
pub fn record_mint_block() {
    MINT_BLOCK.inc();
}

/// Record the packing budget of a mint attempt
#[cfg(feature = "metrics")]
pub fn record_packing_ms(ms: i64) {
    BLOCK_PACKING_MS.set(ms);
}

/// Record the slot-boundary wait of a mint
#[cfg(feature = "metrics")]
pub fn record_waiting_ms(ms: i64) {
    BLOCK_WAITING_MS.set(ms);
}

/// Record the slot cache population
#[cfg(feature = "metrics")]
pub fn record_slot_cache_size(len: usize) {
    SLOT_CACHE_BLOCKS.set(len as i64);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_mint_block() {}

#[cfg(not(feature = "metrics"))]
pub fn record_packing_ms(_ms: i64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_waiting_ms(_ms: i64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_slot_cache_size(_len: usize) {}
