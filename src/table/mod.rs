// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Open-addressed hash table (`spec.md` §4.2).
//!
//! Linear probing, tombstones, max load factor 0.75, growth by doubling
//! from a minimum capacity of 8. Used for the VM's globals table, for
//! string interning, and for each class's method table and each instance's
//! field table. Keys are always interned-string [`Handle`]s; the caller
//! supplies the string's precomputed hash (`spec.md`: "hash is precomputed
//! at string interning time") so this module has no dependency on the heap.
//!
//! The teacher repo never needed a hand-rolled hash table — Lonala's
//! namespaces used the host `HashMap` (`namespace.rs`) — but `spec.md`
//! calls this out as a distinct, testable core component (tombstone
//! handling, load-factor growth), so it is implemented from the book's
//! algorithm rather than wrapped around `std::collections::HashMap`.

#[cfg(test)]
mod table_test;

use crate::gc::Handle;
use crate::value::Value;

const MAX_LOAD_FACTOR: f64 = 0.75;
const MIN_CAPACITY: usize = 8;

#[derive(Clone, Copy)]
enum Entry {
    Empty,
    Tombstone,
    Occupied { key: Handle, hash: u32, value: Value },
}

/// An open-addressed `Handle -> Value` table.
#[derive(Default, Clone)]
pub struct Table {
    entries: Vec<Entry>,
    /// Occupied slots plus tombstones; drives the load-factor growth check
    /// (tombstones count against load factor just like live entries,
    /// `spec.md` §4.2: "lookup skips tombstones but treats them as
    /// occupied for probe continuation").
    count: usize,
    live: usize,
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            count: 0,
            live: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Find the slot a key with `hash` probes to, honoring the "first
    /// tombstone in the chain is reused" rule for insertion while still
    /// distinguishing a genuine match for lookup.
    fn find_slot(entries: &[Entry], capacity: usize, key: Handle, hash: u32) -> usize {
        let mut index = (hash as usize) % capacity;
        let mut first_tombstone: Option<usize> = None;
        loop {
            match entries[index] {
                Entry::Empty => return first_tombstone.unwrap_or(index),
                Entry::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Entry::Occupied { key: k, .. } if k == key => return index,
                Entry::Occupied { .. } => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn grow(&mut self, new_capacity: usize) {
        let mut new_entries = vec![Entry::Empty; new_capacity];
        let mut live = 0;
        for entry in &self.entries {
            if let Entry::Occupied { key, hash, value } = *entry {
                let slot = Self::find_slot(&new_entries, new_capacity, key, hash);
                new_entries[slot] = Entry::Occupied { key, hash, value };
                live += 1;
            }
        }
        self.entries = new_entries;
        self.count = live;
        self.live = live;
    }

    /// Insert or overwrite `key`. Returns `true` if this created a new
    /// entry (the key was previously absent), matching clox's `tableSet`
    /// return convention (used by `DEFINE_GLOBAL` vs. error-on-missing
    /// `SET_GLOBAL`).
    pub fn set(&mut self, key: Handle, hash: u32, value: Value) -> bool {
        if self.capacity() == 0
            || (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD_FACTOR
        {
            let new_capacity = (self.capacity() * 2).max(MIN_CAPACITY);
            self.grow(new_capacity);
        }
        let slot = Self::find_slot(&self.entries, self.capacity(), key, hash);
        let is_new = !matches!(self.entries[slot], Entry::Occupied { .. });
        if is_new && !matches!(self.entries[slot], Entry::Tombstone) {
            self.count += 1;
        }
        if is_new {
            self.live += 1;
        }
        self.entries[slot] = Entry::Occupied { key, hash, value };
        is_new
    }

    #[must_use]
    pub fn get(&self, key: Handle, hash: u32) -> Option<Value> {
        if self.capacity() == 0 {
            return None;
        }
        match self.entries[Self::find_slot(&self.entries, self.capacity(), key, hash)] {
            Entry::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, key: Handle, hash: u32) -> bool {
        self.get(key, hash).is_some()
    }

    /// Mark the slot as a tombstone. `spec.md` §4.2: "deletion marks
    /// tombstone".
    pub fn delete(&mut self, key: Handle, hash: u32) -> bool {
        if self.capacity() == 0 {
            return false;
        }
        let slot = Self::find_slot(&self.entries, self.capacity(), key, hash);
        if matches!(self.entries[slot], Entry::Occupied { .. }) {
            self.entries[slot] = Entry::Tombstone;
            self.live -= 1;
            true
        } else {
            false
        }
    }

    /// Probe for an interned string equal to the not-yet-allocated
    /// candidate, comparing by hash first and then by `eq` (byte content),
    /// per `spec.md` §4.2: "a specialized lookup that compares by hash,
    /// length, and bytewise content to locate an equivalent live string
    /// before allocating".
    #[must_use]
    pub fn find_string(&self, hash: u32, eq: impl Fn(Handle) -> bool) -> Option<Handle> {
        if self.capacity() == 0 {
            return None;
        }
        let capacity = self.capacity();
        let mut index = (hash as usize) % capacity;
        loop {
            match self.entries[index] {
                Entry::Empty => return None,
                Entry::Occupied {
                    key,
                    hash: entry_hash,
                    ..
                } if entry_hash == hash && eq(key) => return Some(key),
                _ => {}
            }
            index = (index + 1) % capacity;
        }
    }

    /// Copy every entry of `other` into `self`, overwriting on conflict.
    /// Used by `OP_INHERIT` (`spec.md` §4.4) to fold a superclass's method
    /// table into a subclass's at class-declaration time.
    pub fn copy_from(&mut self, other: &Table) {
        for entry in &other.entries {
            if let Entry::Occupied { key, hash, value } = *entry {
                self.set(key, hash, value);
            }
        }
    }

    /// Iterate live entries, e.g. for GC tracing or `OP_INHERIT`.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, Value)> + '_ {
        self.entries.iter().filter_map(|e| match *e {
            Entry::Occupied { key, value, .. } => Some((key, value)),
            _ => None,
        })
    }

    /// Remove every entry whose key fails `keep`. Used to implement the
    /// string table's weak-reference sweep (`spec.md` §4.7: "before sweep,
    /// remove unmarked strings from the intern table").
    pub fn retain_keys(&mut self, mut keep: impl FnMut(Handle) -> bool) {
        for entry in &mut self.entries {
            if let Entry::Occupied { key, .. } = *entry {
                if !keep(key) {
                    *entry = Entry::Tombstone;
                    self.live -= 1;
                }
            }
        }
    }
}
