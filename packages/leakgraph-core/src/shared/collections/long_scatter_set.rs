//! Open-addressing set of 64-bit keys

use super::{capacity_for, mix64, resize_at};
use std::collections::TryReserveError;

/// Set of `u64` keys backed by a single flat array
///
/// # Performance Characteristics
/// - add / contains: O(1) amortized, no allocation except when doubling
/// - Memory: 8 bytes per slot, at most 4/3 slots per key after growth
#[derive(Debug, Clone)]
pub struct LongScatterSet {
    /// Slots; `0` means empty
    keys: Vec<u64>,

    /// Non-zero keys stored in `keys`
    assigned: usize,

    mask: usize,

    resize_at: usize,

    /// Whether key `0` is a member (stored out of band)
    has_empty_key: bool,
}

impl Default for LongScatterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl LongScatterSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::with_expected_elements(4)
    }

    /// Create a set that holds `expected` keys without resizing
    pub fn with_expected_elements(expected: usize) -> Self {
        let capacity = capacity_for(expected);
        Self {
            keys: vec![0; capacity],
            assigned: 0,
            mask: capacity - 1,
            resize_at: resize_at(capacity),
            has_empty_key: false,
        }
    }

    /// Add a key. Returns `true` if the key was not already present.
    ///
    /// # Panics
    /// Panics if doubling the table cannot be allocated, like `Vec::push`.
    /// Use [`try_add`](Self::try_add) to handle that case.
    #[inline]
    pub fn add(&mut self, key: u64) -> bool {
        match self.try_add(key) {
            Ok(added) => added,
            Err(err) => panic!("LongScatterSet: allocation failed while growing: {}", err),
        }
    }

    /// Add a key, reporting allocation failure instead of aborting.
    ///
    /// On `Err` the set is unchanged and `key` was not added.
    pub fn try_add(&mut self, key: u64) -> Result<bool, TryReserveError> {
        if key == 0 {
            let added = !self.has_empty_key;
            self.has_empty_key = true;
            return Ok(added);
        }

        let mut slot = self.slot_of(key);
        loop {
            let existing = self.keys[slot];
            if existing == 0 {
                break;
            }
            if existing == key {
                return Ok(false);
            }
            slot = (slot + 1) & self.mask;
        }

        if self.assigned == self.resize_at {
            self.grow_then_insert(key)?;
        } else {
            self.keys[slot] = key;
        }
        self.assigned += 1;
        Ok(true)
    }

    /// Add every key of an iterator
    pub fn extend(&mut self, keys: impl IntoIterator<Item = u64>) {
        for key in keys {
            self.add(key);
        }
    }

    /// Check membership
    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        if key == 0 {
            return self.has_empty_key;
        }

        let mut slot = self.slot_of(key);
        loop {
            let existing = self.keys[slot];
            if existing == 0 {
                return false;
            }
            if existing == key {
                return true;
            }
            slot = (slot + 1) & self.mask;
        }
    }

    /// Number of distinct keys, including `0` when present
    #[inline]
    pub fn size(&self) -> usize {
        self.assigned + usize::from(self.has_empty_key)
    }

    /// Alias of [`size`](Self::size)
    #[inline]
    pub fn len(&self) -> usize {
        self.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Current slot count (power of two)
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Make room for `expected` keys up front
    pub fn ensure_capacity(&mut self, expected: usize) -> Result<(), TryReserveError> {
        if expected > self.resize_at {
            let new_capacity = capacity_for(expected);
            if new_capacity > self.keys.len() {
                let new_keys = self.rehashed(new_capacity)?;
                self.install(new_keys);
            }
        }
        Ok(())
    }

    /// Iterate keys in slot order (`0` first when present)
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        let empty = if self.has_empty_key { Some(0) } else { None };
        empty
            .into_iter()
            .chain(self.keys.iter().copied().filter(|&k| k != 0))
    }

    /// Keys sorted ascending
    pub fn to_sorted_vec(&self) -> Vec<u64> {
        let mut keys: Vec<u64> = self.iter().collect();
        keys.sort_unstable();
        keys
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internal: Growth
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    fn slot_of(&self, key: u64) -> usize {
        (mix64(key) as usize) & self.mask
    }

    /// Allocate a table twice as large, rehash live keys plus `key`, then swap.
    fn grow_then_insert(&mut self, key: u64) -> Result<(), TryReserveError> {
        let new_capacity = self.keys.len() * 2;
        let mut new_keys = self.rehashed(new_capacity)?;
        let new_mask = new_capacity - 1;
        let mut slot = (mix64(key) as usize) & new_mask;
        while new_keys[slot] != 0 {
            slot = (slot + 1) & new_mask;
        }
        new_keys[slot] = key;
        self.install(new_keys);
        Ok(())
    }

    /// Fresh table of `new_capacity` slots holding every live key
    fn rehashed(&self, new_capacity: usize) -> Result<Vec<u64>, TryReserveError> {
        let mut new_keys: Vec<u64> = Vec::new();
        new_keys.try_reserve_exact(new_capacity)?;
        new_keys.resize(new_capacity, 0);

        let new_mask = new_capacity - 1;
        for &key in self.keys.iter().filter(|&&k| k != 0) {
            let mut slot = (mix64(key) as usize) & new_mask;
            while new_keys[slot] != 0 {
                slot = (slot + 1) & new_mask;
            }
            new_keys[slot] = key;
        }
        Ok(new_keys)
    }

    fn install(&mut self, new_keys: Vec<u64>) {
        let capacity = new_keys.len();
        self.keys = new_keys;
        self.mask = capacity - 1;
        self.resize_at = resize_at(capacity);
    }
}

impl FromIterator<u64> for LongScatterSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut set = LongScatterSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_reports_new_keys() {
        let mut set = LongScatterSet::new();
        assert!(set.add(42));
        assert!(!set.add(42));
        assert!(set.contains(42));
        assert!(!set.contains(43));
        assert_eq!(set.size(), 1);
    }

    #[test]
    fn test_zero_key_is_stored_out_of_band() {
        let mut set = LongScatterSet::new();
        assert!(!set.contains(0));
        assert!(set.add(0));
        assert!(!set.add(0));
        assert!(set.contains(0));
        assert_eq!(set.size(), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_growth_doubles_capacity() {
        let mut set = LongScatterSet::new();
        let initial = set.capacity();
        for key in 1..=1000u64 {
            set.add(key);
        }
        assert_eq!(set.size(), 1000);
        assert!(set.capacity() > initial);
        assert!(set.capacity().is_power_of_two());
        for key in 1..=1000u64 {
            assert!(set.contains(key));
        }
        assert!(!set.contains(1001));
    }

    #[test]
    fn test_resize_happens_exactly_at_threshold() {
        let mut set = LongScatterSet::with_expected_elements(0);
        assert_eq!(set.capacity(), 4);
        set.add(1);
        set.add(2);
        set.add(3);
        assert_eq!(set.capacity(), 4);
        set.add(4);
        assert_eq!(set.capacity(), 8);
    }

    #[test]
    fn test_high_bit_keys() {
        let mut set = LongScatterSet::new();
        let keys = [u64::MAX, 1 << 63, 0xffff_ffff_0000_0000, 7];
        for key in keys {
            assert!(set.add(key));
        }
        for key in keys {
            assert!(set.contains(key));
        }
        assert_eq!(set.to_sorted_vec(), vec![7, 1 << 63, 0xffff_ffff_0000_0000, u64::MAX]);
    }

    #[test]
    fn test_ensure_capacity_keeps_members() {
        let mut set: LongScatterSet = (1..=10u64).collect();
        set.ensure_capacity(10_000).unwrap();
        assert!(set.capacity() >= 10_000);
        assert_eq!(set.size(), 10);
        assert!((1..=10u64).all(|k| set.contains(k)));
    }
}
