//! Slot and dynasty timing.
//!
//! Wall-clock time is quantized into `BLOCK_INTERVAL_MS`-wide slots; each
//! slot admits exactly one scheduled proposer. A dynasty serial indexes the
//! `DYNASTY_INTERVAL_MS` window a timestamp falls into.

use crate::error::{PodError, PodResult};
use pod_types::constants::{
    BLOCK_INTERVAL_MS, DYNASTY_INTERVAL_MS, MAX_MINT_DURATION_MS, MIN_MINT_DURATION_MS, SECOND_MS,
};

/// The slot boundary strictly before `now_ms`.
pub fn last_slot(now_ms: i64) -> i64 {
    (now_ms - SECOND_MS) / BLOCK_INTERVAL_MS * BLOCK_INTERVAL_MS
}

/// The slot boundary at or after `now_ms`.
pub fn next_slot(now_ms: i64) -> i64 {
    (now_ms + BLOCK_INTERVAL_MS - SECOND_MS) / BLOCK_INTERVAL_MS * BLOCK_INTERVAL_MS
}

/// The packing deadline for a mint attempt starting at `now_ms`: the next
/// slot boundary, capped at `MAX_MINT_DURATION_MS` from now.
pub fn deadline(now_ms: i64) -> i64 {
    let next_slot_ms = next_slot(now_ms);
    let remain_ms = next_slot_ms - now_ms;
    if MAX_MINT_DURATION_MS > remain_ms {
        next_slot_ms
    } else {
        now_ms + MAX_MINT_DURATION_MS
    }
}

/// Serial of the dynasty a second-resolution timestamp belongs to.
pub fn serial(timestamp: i64) -> i64 {
    timestamp * SECOND_MS / DYNASTY_INTERVAL_MS
}

/// Decide whether a mint attempt may start now, given the tail timestamp.
///
/// Succeeds with a packing deadline when the tail occupies the previous slot,
/// or when so little of the current slot remains that waiting for its block
/// is pointless. Fails when the tail is already at or past the next slot
/// (the local clock is behind) or when the previous slot's block may still
/// arrive.
pub fn check_deadline(tail_timestamp_ms: i64, now_ms: i64) -> PodResult<i64> {
    let last_slot_ms = last_slot(now_ms);
    let next_slot_ms = next_slot(now_ms);

    if tail_timestamp_ms >= next_slot_ms {
        return Err(PodError::BlockMintedInNextSlot);
    }
    if tail_timestamp_ms == last_slot_ms {
        return Ok(deadline(now_ms));
    }
    if next_slot_ms - now_ms <= MIN_MINT_DURATION_MS {
        return Ok(deadline(now_ms));
    }
    Err(PodError::WaitingBlockInLastSlot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_boundaries_bracket_now() {
        for now_ms in [1_000, 14_999, 15_000, 15_001, 16_000, 29_999, 30_000, 1_234_567] {
            let last = last_slot(now_ms);
            let next = next_slot(now_ms);
            assert!(last < now_ms, "last_slot({now_ms}) = {last}");
            assert!(now_ms <= next, "next_slot({now_ms}) = {next}");
            assert_eq!(last % BLOCK_INTERVAL_MS, 0);
            assert_eq!(next % BLOCK_INTERVAL_MS, 0);
        }
    }

    #[test]
    fn test_deadline_is_bounded() {
        for now_ms in [1_000, 16_000, 25_000, 29_999, 30_000] {
            let d = deadline(now_ms);
            assert!(d <= next_slot(now_ms));
            assert!(d - now_ms <= MAX_MINT_DURATION_MS);
        }
    }

    #[test]
    fn test_tail_in_last_slot_returns_capped_deadline() {
        // Tail minted at 15s, we wake at 16s: work on the 30s slot, capped by
        // the max mint duration.
        let deadline_ms = check_deadline(15_000, 16_000).unwrap();
        assert_eq!(deadline_ms, 21_200);
    }

    #[test]
    fn test_small_gap_allows_late_attempt() {
        // 2s left before the 30s slot: stop waiting for the 15s block.
        let deadline_ms = check_deadline(0, 28_000).unwrap();
        assert_eq!(deadline_ms, 30_000);
    }

    #[test]
    fn test_waiting_for_last_slot_block() {
        // 10s left and the 15s block may still arrive.
        let err = check_deadline(0, 20_000).unwrap_err();
        assert!(matches!(err, PodError::WaitingBlockInLastSlot));
    }

    #[test]
    fn test_tail_from_the_future_fails() {
        let err = check_deadline(45_000, 30_000).unwrap_err();
        assert!(matches!(err, PodError::BlockMintedInNextSlot));
    }

    #[test]
    fn test_serial_quantizes_by_dynasty_window() {
        assert_eq!(serial(0), 0);
        assert_eq!(serial(3_599), 0);
        assert_eq!(serial(3_600), 1);
        assert_eq!(serial(7_200), 2);
    }
}
