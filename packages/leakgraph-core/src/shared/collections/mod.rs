//! Primitive hash containers keyed by 64-bit identifiers
//!
//! Open-addressing ("scatter") tables storing keys and values in flat arrays,
//! so indexing tens of millions of heap objects costs no per-entry allocation.
//!
//! # Layout
//! - Capacity is always a power of two, `mask = capacity - 1`
//! - Linear probing: `slot = (slot + 1) & mask`
//! - Key `0` marks an empty slot; a real `0` key lives out of band (`has_empty_key`)
//! - Grows (doubles) when `assigned == resize_at`, `resize_at = floor(capacity * 0.75)`
//! - No removal, so no tombstones
//!
//! Growth allocates the new arrays before touching the live ones. A failed
//! `try_*` call leaves the container exactly as it was.

mod long_object_scatter_map;
mod long_scatter_set;

pub use long_object_scatter_map::{LongIntScatterMap, LongObjectScatterMap};
pub use long_scatter_set::LongScatterSet;

/// Fraction of slots that may be assigned before doubling
pub const LOAD_FACTOR: f64 = 0.75;

/// Smallest table ever allocated
pub(crate) const MIN_CAPACITY: usize = 4;

/// Scrambles a key so sequential object ids spread across the table
/// (MurmurHash3 64-bit finalizer).
#[inline]
pub(crate) fn mix64(key: u64) -> u64 {
    let mut h = key;
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Capacity for `expected` elements at [`LOAD_FACTOR`], rounded to a power of two
#[inline]
pub(crate) fn capacity_for(expected: usize) -> usize {
    let min_slots = ((expected as f64) / LOAD_FACTOR).ceil() as usize + 1;
    min_slots.max(MIN_CAPACITY).next_power_of_two()
}

/// Assigned-slot threshold that triggers the next resize
#[inline]
pub(crate) fn resize_at(capacity: usize) -> usize {
    // Always leave at least one empty slot so probing terminates
    (((capacity as f64) * LOAD_FACTOR).floor() as usize).min(capacity - 1)
}
