//! Open-addressing map from 64-bit keys to inline values

use super::{capacity_for, mix64, resize_at};
use std::collections::TryReserveError;

/// Map of `u64` keys to values stored inline in a parallel array
///
/// Keys and values live in two flat vectors indexed by the same slot, so an
/// entry never owns a separate heap node.
#[derive(Debug, Clone)]
pub struct LongObjectScatterMap<V> {
    keys: Vec<u64>,
    values: Vec<Option<V>>,
    assigned: usize,
    mask: usize,
    resize_at: usize,

    /// Value of key `0` (stored out of band)
    empty_key_value: Option<V>,
}

/// `u64 -> i32` map; missing keys read as [`LongIntScatterMap::SENTINEL`]
pub type LongIntScatterMap = LongObjectScatterMap<i32>;

impl<V> Default for LongObjectScatterMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> LongObjectScatterMap<V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self::with_expected_elements(4)
    }

    /// Create a map that holds `expected` entries without resizing
    pub fn with_expected_elements(expected: usize) -> Self {
        let capacity = capacity_for(expected);
        let mut values = Vec::with_capacity(capacity);
        values.resize_with(capacity, || None);
        Self {
            keys: vec![0; capacity],
            values,
            assigned: 0,
            mask: capacity - 1,
            resize_at: resize_at(capacity),
            empty_key_value: None,
        }
    }

    /// Insert or replace a value. Returns the previous value.
    ///
    /// # Panics
    /// Panics if doubling the table cannot be allocated, like `Vec::push`.
    pub fn insert(&mut self, key: u64, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(previous) => previous,
            Err(err) => panic!("LongObjectScatterMap: allocation failed while growing: {}", err),
        }
    }

    /// Insert, reporting allocation failure instead of aborting.
    ///
    /// On `Err` the map is unchanged.
    pub fn try_insert(&mut self, key: u64, value: V) -> Result<Option<V>, TryReserveError> {
        if key == 0 {
            return Ok(self.empty_key_value.replace(value));
        }

        let mut slot = self.slot_of(key);
        loop {
            let existing = self.keys[slot];
            if existing == 0 {
                break;
            }
            if existing == key {
                return Ok(self.values[slot].replace(value));
            }
            slot = (slot + 1) & self.mask;
        }

        if self.assigned == self.resize_at {
            self.grow_then_insert(key, value)?;
        } else {
            self.keys[slot] = key;
            self.values[slot] = Some(value);
        }
        self.assigned += 1;
        Ok(None)
    }

    /// Look up a value
    #[inline]
    pub fn get(&self, key: u64) -> Option<&V> {
        if key == 0 {
            return self.empty_key_value.as_ref();
        }
        self.find_slot(key).and_then(|slot| self.values[slot].as_ref())
    }

    /// Look up a value for in-place update
    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        if key == 0 {
            return self.empty_key_value.as_mut();
        }
        match self.find_slot(key) {
            Some(slot) => self.values[slot].as_mut(),
            None => None,
        }
    }

    #[inline]
    pub fn contains_key(&self, key: u64) -> bool {
        if key == 0 {
            return self.empty_key_value.is_some();
        }
        self.find_slot(key).is_some()
    }

    /// Number of entries, including key `0` when present
    #[inline]
    pub fn size(&self) -> usize {
        self.assigned + usize::from(self.empty_key_value.is_some())
    }

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

    /// Iterate entries in slot order (key `0` first when present)
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> + '_ {
        let empty = self.empty_key_value.as_ref().map(|v| (0u64, v));
        empty.into_iter().chain(
            self.keys
                .iter()
                .zip(self.values.iter())
                .filter_map(|(&k, v)| if k == 0 { None } else { v.as_ref().map(|v| (k, v)) }),
        )
    }

    /// Iterate keys in slot order
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter().map(|(k, _)| k)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internal: Probing and Growth
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    fn slot_of(&self, key: u64) -> usize {
        (mix64(key) as usize) & self.mask
    }

    #[inline]
    fn find_slot(&self, key: u64) -> Option<usize> {
        let mut slot = self.slot_of(key);
        loop {
            let existing = self.keys[slot];
            if existing == 0 {
                return None;
            }
            if existing == key {
                return Some(slot);
            }
            slot = (slot + 1) & self.mask;
        }
    }

    /// Allocate both doubled arrays first; moving entries cannot fail.
    fn grow_then_insert(&mut self, key: u64, value: V) -> Result<(), TryReserveError> {
        let new_capacity = self.keys.len() * 2;

        let mut new_keys: Vec<u64> = Vec::new();
        new_keys.try_reserve_exact(new_capacity)?;
        let mut new_values: Vec<Option<V>> = Vec::new();
        new_values.try_reserve_exact(new_capacity)?;
        new_keys.resize(new_capacity, 0);
        new_values.resize_with(new_capacity, || None);

        let new_mask = new_capacity - 1;
        let old_keys = std::mem::take(&mut self.keys);
        let old_values = std::mem::take(&mut self.values);
        let entries = old_keys
            .into_iter()
            .zip(old_values)
            .filter(|(k, _)| *k != 0)
            .chain(std::iter::once((key, Some(value))));

        for (k, v) in entries {
            let mut slot = (mix64(k) as usize) & new_mask;
            while new_keys[slot] != 0 {
                slot = (slot + 1) & new_mask;
            }
            new_keys[slot] = k;
            new_values[slot] = v;
        }

        self.keys = new_keys;
        self.values = new_values;
        self.mask = new_mask;
        self.resize_at = resize_at(new_capacity);
        Ok(())
    }
}

impl<V: Copy> LongObjectScatterMap<V> {
    /// Value for `key`, or `sentinel` when absent
    #[inline]
    pub fn get_or(&self, key: u64, sentinel: V) -> V {
        self.get(key).copied().unwrap_or(sentinel)
    }
}

impl LongObjectScatterMap<i32> {
    /// Value read for absent keys by [`get_or_sentinel`](Self::get_or_sentinel)
    pub const SENTINEL: i32 = -1;

    /// Value for `key`, or [`Self::SENTINEL`] when absent
    #[inline]
    pub fn get_or_sentinel(&self, key: u64) -> i32 {
        self.get_or(key, Self::SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut map = LongObjectScatterMap::new();
        assert_eq!(map.insert(10, "ten"), None);
        assert_eq!(map.insert(10, "TEN"), Some("ten"));
        assert_eq!(map.get(10), Some(&"TEN"));
        assert_eq!(map.get(11), None);
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn test_zero_key() {
        let mut map = LongObjectScatterMap::new();
        map.insert(0, 1u8);
        assert!(map.contains_key(0));
        assert_eq!(map.get(0), Some(&1));
        assert_eq!(map.size(), 1);
        assert_eq!(map.iter().next(), Some((0, &1)));
    }

    #[test]
    fn test_growth_preserves_entries() {
        let mut map = LongObjectScatterMap::new();
        for key in 1..=5000u64 {
            map.insert(key * 31, key as u32);
        }
        assert_eq!(map.size(), 5000);
        assert!(map.capacity().is_power_of_two());
        for key in 1..=5000u64 {
            assert_eq!(map.get(key * 31), Some(&(key as u32)));
        }
    }

    #[test]
    fn test_get_mut() {
        let mut map = LongObjectScatterMap::new();
        map.insert(7, vec![1]);
        map.get_mut(7).unwrap().push(2);
        assert_eq!(map.get(7), Some(&vec![1, 2]));
        assert!(map.get_mut(8).is_none());
    }

    #[test]
    fn test_int_map_sentinel() {
        let mut map = LongIntScatterMap::new();
        map.insert(99, 3);
        assert_eq!(map.get_or_sentinel(99), 3);
        assert_eq!(map.get_or_sentinel(100), LongIntScatterMap::SENTINEL);
    }

    #[test]
    fn test_iter_visits_all_entries() {
        let mut map = LongObjectScatterMap::new();
        for key in 0..100u64 {
            map.insert(key, key * 2);
        }
        let mut seen: Vec<(u64, u64)> = map.iter().map(|(k, v)| (k, *v)).collect();
        seen.sort_unstable();
        assert_eq!(seen.len(), 100);
        assert!(seen.iter().all(|(k, v)| *v == k * 2));
    }
}
