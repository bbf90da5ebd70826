//! Chained hash table with incremental resize.
//!
//! Two bucket arrays live side by side: `tables[0]` serves every lookup,
//! and while a resize is in flight `tables[1]` receives migrated buckets
//! one rehash step at a time. `rehash_idx` is the migration frontier in
//! `tables[0]`; every bucket below it is already empty. Entries carry
//! their digest so migration never rehashes keys.

use core::borrow::Borrow;
use core::cell::Cell;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::config;
use crate::hashing::SipHashBuilder;

/// Error from [`Dict::add`] when the key is already present.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsertError {
    #[error("key already present")]
    DuplicateKey,
}

/// Refused resize requests. Callers may ignore these; the table keeps
/// working at its current size.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResizeError {
    #[error("a rehash is already in progress")]
    RehashInProgress,
    #[error("requested size is below the current entry count")]
    BelowUsage,
    #[error("table is already at the requested size")]
    Unchanged,
    #[error("resizing is disabled")]
    Disabled,
}

pub(crate) type Link<K, V> = Option<Box<Node<K, V>>>;

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
    pub(crate) next: Link<K, V>,
}

pub(crate) struct Table<K, V> {
    pub(crate) buckets: Vec<Link<K, V>>,
    pub(crate) used: usize,
}

impl<K, V> Table<K, V> {
    fn unallocated() -> Self {
        Table {
            buckets: Vec::new(),
            used: 0,
        }
    }

    fn with_buckets(size: usize) -> Self {
        let mut buckets = Vec::with_capacity(size);
        buckets.resize_with(size, || None);
        Table { buckets, used: 0 }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(crate) fn mask(&self) -> u64 {
        (self.buckets.len() as u64).wrapping_sub(1)
    }

    #[inline]
    fn is_unallocated(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl<K, V> Drop for Table<K, V> {
    fn drop(&mut self) {
        // Unlink chains iteratively; box-recursive drops would otherwise
        // recurse once per chained entry.
        for bucket in &mut self.buckets {
            let mut cur = bucket.take();
            while let Some(mut node) = cur {
                cur = node.next.take();
            }
        }
    }
}

/// Hash table with power-of-two bucket arrays, chained collisions, and
/// incremental two-table rehash.
pub struct Dict<K, V, S = SipHashBuilder> {
    pub(crate) tables: [Table<K, V>; 2],
    pub(crate) rehash_idx: isize,
    pub(crate) pinned: Cell<u32>,
    can_resize: Option<bool>,
    hasher: S,
}

impl<K, V> Dict<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self::with_hasher(SipHashBuilder::new())
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self::with_capacity_and_hasher(cap, SipHashBuilder::new())
    }
}

impl<K, V> Default for Dict<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Dict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Dict {
            tables: [Table::unallocated(), Table::unallocated()],
            rehash_idx: -1,
            pinned: Cell::new(0),
            can_resize: None,
            hasher,
        }
    }

    pub fn with_capacity_and_hasher(cap: usize, hasher: S) -> Self {
        let mut dict = Self::with_hasher(hasher);
        if cap > 0 {
            let _ = dict.expand(cap);
        }
        dict
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tables[0].used + self.tables[1].used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated buckets across both tables.
    pub fn bucket_count(&self) -> usize {
        self.tables[0].size() + self.tables[1].size()
    }

    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx != -1
    }

    /// Override the process-wide resize switch for this table only.
    pub fn set_resize_enabled(&mut self, on: bool) {
        self.can_resize = Some(on);
    }

    fn resize_allowed(&self) -> bool {
        self.can_resize.unwrap_or_else(config::resize_enabled)
    }

    #[inline]
    fn hash_key<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        self.hasher.hash_one(key)
    }

    // ---- sizing -----------------------------------------------------

    /// Grow (or first-allocate) to the smallest power of two holding
    /// `size` buckets. Installing the second table starts a rehash.
    pub fn expand(&mut self, size: usize) -> Result<(), ResizeError> {
        if self.is_rehashing() {
            return Err(ResizeError::RehashInProgress);
        }
        if self.tables[0].used > size {
            return Err(ResizeError::BelowUsage);
        }
        let real = size.max(config::initial_size()).next_power_of_two();
        if real == self.tables[0].size() {
            return Err(ResizeError::Unchanged);
        }
        let fresh = Table::with_buckets(real);
        if self.tables[0].is_unallocated() {
            self.tables[0] = fresh;
            return Ok(());
        }
        debug!(from = self.tables[0].size(), to = real, "rehash started");
        self.tables[1] = fresh;
        self.rehash_idx = 0;
        Ok(())
    }

    /// Resize down to the entry count (floored at the initial size).
    pub fn shrink(&mut self) -> Result<(), ResizeError> {
        if !self.resize_allowed() {
            return Err(ResizeError::Disabled);
        }
        if self.is_rehashing() {
            return Err(ResizeError::RehashInProgress);
        }
        self.expand(self.tables[0].used)
    }

    fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }
        if self.tables[0].is_unallocated() {
            let _ = self.expand(config::initial_size());
            return;
        }
        let used = self.tables[0].used;
        let size = self.tables[0].size();
        if used >= size && (self.resize_allowed() || used / size > config::force_resize_ratio()) {
            let _ = self.expand(used * 2);
        }
    }

    // ---- incremental rehash -----------------------------------------

    /// Migrate up to `steps` nonempty buckets, visiting at most
    /// `10 * steps` empty ones before yielding. Returns whether work
    /// remains.
    pub fn rehash(&mut self, steps: usize) -> bool {
        if !self.is_rehashing() {
            return false;
        }
        let mut empty_visits = steps * 10;
        let mut steps = steps;
        while steps > 0 && self.tables[0].used != 0 {
            steps -= 1;
            // Entries remain, so a nonempty bucket exists at or past the
            // frontier and the scan below stays in bounds.
            debug_assert!((self.rehash_idx as usize) < self.tables[0].size());
            let mut idx = self.rehash_idx as usize;
            while self.tables[0].buckets[idx].is_none() {
                idx += 1;
                self.rehash_idx = idx as isize;
                empty_visits -= 1;
                if empty_visits == 0 {
                    return true;
                }
            }
            let (front, back) = self.tables.split_at_mut(1);
            let t0 = &mut front[0];
            let t1 = &mut back[0];
            let mask = t1.mask();
            let mut chain = t0.buckets[idx].take();
            while let Some(mut node) = chain {
                chain = node.next.take();
                let slot = (node.hash & mask) as usize;
                node.next = t1.buckets[slot].take();
                t1.buckets[slot] = Some(node);
                t0.used -= 1;
                t1.used += 1;
            }
            self.rehash_idx = (idx + 1) as isize;
        }
        if self.tables[0].used == 0 {
            let promoted = mem::replace(&mut self.tables[1], Table::unallocated());
            self.tables[0] = promoted;
            self.rehash_idx = -1;
            debug!(size = self.tables[0].size(), "rehash complete");
            return false;
        }
        true
    }

    /// Run 100-bucket rehash batches until `budget` elapses or the
    /// migration finishes. Returns the number of batch steps performed.
    pub fn rehash_for(&mut self, budget: Duration) -> usize {
        let start = Instant::now();
        let mut migrated = 0;
        while self.rehash(100) {
            migrated += 100;
            if start.elapsed() > budget {
                break;
            }
        }
        migrated
    }

    fn rehash_step(&mut self) {
        if self.pinned.get() == 0 {
            self.rehash(1);
        }
    }

    // ---- lookup -----------------------------------------------------

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        let hash = self.hash_key(key);
        let (t, b, pos) = self.locate(hash, key)?;
        let mut cur = self.tables[t].buckets[b].as_deref();
        for _ in 0..pos {
            cur = cur.and_then(|node| node.next.as_deref());
        }
        cur.map(|node| &node.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.rehash_step();
        if self.is_empty() {
            return None;
        }
        let hash = self.hash_key(key);
        let (t, b, pos) = self.locate(hash, key)?;
        Some(&mut self.node_mut(t, b, pos).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        !self.is_empty() && self.locate(self.hash_key(key), key).is_some()
    }

    /// Find the (table, bucket, chain position) of `key`, probing the
    /// second table only while rehashing.
    fn locate<Q>(&self, hash: u64, key: &Q) -> Option<(usize, usize, usize)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        for t in 0..2 {
            let table = &self.tables[t];
            if table.is_unallocated() {
                if !self.is_rehashing() {
                    break;
                }
                continue;
            }
            let bucket = (hash & table.mask()) as usize;
            let mut pos = 0usize;
            let mut cur = table.buckets[bucket].as_deref();
            while let Some(node) = cur {
                if node.hash == hash && node.key.borrow() == key {
                    return Some((t, bucket, pos));
                }
                pos += 1;
                cur = node.next.as_deref();
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    fn node_mut(&mut self, t: usize, bucket: usize, pos: usize) -> &mut Node<K, V> {
        let mut link = &mut self.tables[t].buckets[bucket];
        let mut remaining = pos;
        while let Some(node) = link {
            if remaining == 0 {
                return node;
            }
            remaining -= 1;
            link = &mut node.next;
        }
        unreachable!("located chain position is in bounds")
    }

    // ---- mutation ---------------------------------------------------

    /// Occupied-or-vacant view of `key`'s slot. A vacant insert prepends
    /// to its bucket in the insertion table (the new table while
    /// rehashing). Runs one rehash step and the grow check.
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        self.rehash_step();
        self.expand_if_needed();
        let hash = self.hash_key(&key);
        match self.locate(hash, &key) {
            Some((table, bucket, pos)) => Entry::Occupied(OccupiedEntry {
                dict: self,
                table,
                bucket,
                pos,
                key,
            }),
            None => Entry::Vacant(VacantEntry {
                dict: self,
                key,
                hash,
            }),
        }
    }

    /// Insert a new key, failing if it is already present.
    pub fn add(&mut self, key: K, value: V) -> Result<(), InsertError> {
        match self.entry(key) {
            Entry::Occupied(_) => Err(InsertError::DuplicateKey),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Insert or overwrite, returning the previous value (`None` when
    /// the key was newly added). The replacement is installed before the
    /// old value is dropped, so a value that references itself (e.g. a
    /// refcount handle) survives being set to itself.
    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        match self.entry(key) {
            Entry::Occupied(mut occupied) => Some(occupied.insert(value)),
            Entry::Vacant(slot) => {
                slot.insert(value);
                None
            }
        }
    }

    /// Remove and drop `key`'s entry. Returns whether it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(key).is_some()
    }

    /// Unlink `key`'s entry and hand the pair back for deferred
    /// disposal.
    pub fn take<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        self.rehash_step();
        let hash = self.hash_key(key);
        let rehashing = self.is_rehashing();
        for t in 0..2 {
            let table = &mut self.tables[t];
            if table.is_unallocated() {
                if !rehashing {
                    break;
                }
                continue;
            }
            let bucket = (hash & table.mask()) as usize;
            if let Some(node) = unlink_from_chain(&mut table.buckets[bucket], hash, key) {
                table.used -= 1;
                let node = *node;
                return Some((node.key, node.value));
            }
            if !rehashing {
                break;
            }
        }
        None
    }

    /// Drop every entry and release both tables.
    pub fn clear(&mut self) {
        self.tables[0] = Table::unallocated();
        self.tables[1] = Table::unallocated();
        self.rehash_idx = -1;
    }

    // ---- random sampling --------------------------------------------

    /// One random entry: a uniformly random nonempty bucket, then a
    /// uniformly random chain member. Deliberately not uniform over
    /// entries; long chains are undersampled per member.
    pub fn random_entry<R>(&mut self, rng: &mut R) -> Option<(&K, &V)>
    where
        R: Rng + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        self.rehash_step();
        let head = if self.is_rehashing() {
            let t0_size = self.tables[0].size() as u64;
            let t1_size = self.tables[1].size() as u64;
            // Buckets below the frontier are empty; never roll them.
            let floor = self.rehash_idx as u64;
            loop {
                let slot = floor + rng.gen_range(0..t0_size + t1_size - floor);
                let head = if slot >= t0_size {
                    self.tables[1].buckets[(slot - t0_size) as usize].as_deref()
                } else {
                    self.tables[0].buckets[slot as usize].as_deref()
                };
                if let Some(node) = head {
                    break node;
                }
            }
        } else {
            loop {
                let slot = rng.gen_range(0..self.tables[0].size());
                if let Some(node) = self.tables[0].buckets[slot].as_deref() {
                    break node;
                }
            }
        };
        let mut chain_len = 0usize;
        let mut cur = Some(head);
        while let Some(node) = cur {
            chain_len += 1;
            cur = node.next.as_deref();
        }
        let mut pick = rng.gen_range(0..chain_len);
        let mut node = head;
        while pick > 0 {
            node = node.next.as_deref().expect("pick is below the counted length");
            pick -= 1;
        }
        Some((&node.key, &node.value))
    }

    /// Collect up to `count` entries from random positions by walking
    /// whole buckets forward. Fast but loose: the sample is not
    /// uniform, and the same entry can appear twice while both tables
    /// are populated.
    pub fn sample<R>(&mut self, rng: &mut R, count: usize) -> Vec<(&K, &V)>
    where
        R: Rng + ?Sized,
    {
        let count = count.min(self.len());
        if count == 0 {
            return Vec::new();
        }
        // Pay down rehash debt proportional to the request.
        for _ in 0..count {
            if self.is_rehashing() {
                self.rehash_step();
            } else {
                break;
            }
        }
        let tables = if self.is_rehashing() { 2 } else { 1 };
        let mut max_mask = self.tables[0].mask();
        if tables > 1 && self.tables[1].mask() > max_mask {
            max_mask = self.tables[1].mask();
        }
        let mut out: Vec<(&K, &V)> = Vec::with_capacity(count);
        let mut slot = rng.gen_range(0..=max_mask);
        let mut empty_run = 0usize;
        let mut max_steps = count * 10;
        while out.len() < count && max_steps > 0 {
            max_steps -= 1;
            for t in 0..tables {
                if tables == 2 && t == 0 && slot < self.rehash_idx as u64 {
                    // The vacated prefix holds nothing; when the other
                    // table is also out of range, jump to the frontier.
                    if slot >= self.tables[1].size() as u64 {
                        slot = self.rehash_idx as u64;
                    } else {
                        continue;
                    }
                }
                if slot >= self.tables[t].size() as u64 {
                    continue;
                }
                let mut cur = self.tables[t].buckets[slot as usize].as_deref();
                if cur.is_none() {
                    empty_run += 1;
                    if empty_run >= 5 && empty_run > count {
                        slot = rng.gen_range(0..=max_mask);
                        empty_run = 0;
                    }
                } else {
                    empty_run = 0;
                    while let Some(node) = cur {
                        out.push((&node.key, &node.value));
                        if out.len() == count {
                            return out;
                        }
                        cur = node.next.as_deref();
                    }
                }
            }
            slot = (slot + 1) & max_mask;
        }
        out
    }

    // ---- fingerprint & stats ----------------------------------------

    /// Shape digest: table addresses, sizes, and entry counts folded
    /// through an order-sensitive integer mixer. Any structural change
    /// (insert, delete, resize, rehash step) changes it.
    pub fn fingerprint(&self) -> u64 {
        shape_fingerprint([
            self.tables[0].buckets.as_ptr() as u64,
            self.tables[0].size() as u64,
            self.tables[0].used as u64,
            self.tables[1].buckets.as_ptr() as u64,
            self.tables[1].size() as u64,
            self.tables[1].used as u64,
        ])
    }

    pub fn stats(&self) -> DictStats {
        DictStats {
            main: table_stats(&self.tables[0]),
            rehashing: self.is_rehashing().then(|| table_stats(&self.tables[1])),
        }
    }
}

fn unlink_from_chain<K, V, Q>(head: &mut Link<K, V>, hash: u64, key: &Q) -> Option<Box<Node<K, V>>>
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    let mut cur = head;
    loop {
        match cur {
            None => return None,
            Some(node) if node.hash == hash && node.key.borrow() == key => {
                let next = node.next.take();
                return mem::replace(cur, next);
            }
            Some(node) => cur = &mut node.next,
        }
    }
}

// ---- entry API -------------------------------------------------------

pub enum Entry<'a, K, V, S = SipHashBuilder>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    Occupied(OccupiedEntry<'a, K, V, S>),
    Vacant(VacantEntry<'a, K, V, S>),
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(default),
        }
    }

    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        match self {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(default()),
        }
    }
}

pub struct OccupiedEntry<'a, K, V, S = SipHashBuilder>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    dict: &'a mut Dict<K, V, S>,
    table: usize,
    bucket: usize,
    pos: usize,
    key: K,
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// The key that was probed (the stored key stays in place).
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn get(&self) -> &V {
        let mut cur = self.dict.tables[self.table].buckets[self.bucket].as_deref();
        for _ in 0..self.pos {
            cur = cur.and_then(|node| node.next.as_deref());
        }
        &cur.expect("entry position is in bounds").value
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self
            .dict
            .node_mut(self.table, self.bucket, self.pos)
            .value
    }

    pub fn into_mut(self) -> &'a mut V {
        &mut self
            .dict
            .node_mut(self.table, self.bucket, self.pos)
            .value
    }

    /// Swap in a new value, returning the old one. The new value is in
    /// place before the old leaves, preserving set-then-release order.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }
}

pub struct VacantEntry<'a, K, V, S = SipHashBuilder>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    dict: &'a mut Dict<K, V, S>,
    key: K,
    hash: u64,
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn insert(self, value: V) -> &'a mut V {
        let t = usize::from(self.dict.is_rehashing());
        let table = &mut self.dict.tables[t];
        let bucket = (self.hash & table.mask()) as usize;
        let next = table.buckets[bucket].take();
        table.buckets[bucket] = Some(Box::new(Node {
            key: self.key,
            value,
            hash: self.hash,
            next,
        }));
        table.used += 1;
        &mut table.buckets[bucket]
            .as_mut()
            .expect("just inserted")
            .value
    }
}

// ---- fingerprint mixer ----------------------------------------------

fn wang_mix(mut h: u64) -> u64 {
    h = (!h).wrapping_add(h << 21);
    h ^= h >> 24;
    h = h.wrapping_add(h << 3).wrapping_add(h << 8);
    h ^= h >> 14;
    h = h.wrapping_add(h << 2).wrapping_add(h << 4);
    h ^= h >> 28;
    h.wrapping_add(h << 31)
}

/// Fold the shape tuple through the mixer, one round per integer.
/// Order-sensitive: permuting the tuple changes the digest.
pub(crate) fn shape_fingerprint(ints: [u64; 6]) -> u64 {
    let mut hash = 0u64;
    for v in ints {
        hash = wang_mix(hash.wrapping_add(v));
    }
    hash
}

// ---- stats -----------------------------------------------------------

/// Slots in [`TableStats::histogram`]; longer chains aggregate into the
/// last slot.
pub const CHAIN_HISTOGRAM_LEN: usize = 50;

/// Occupancy summary of one bucket array.
#[derive(Clone, Debug)]
pub struct TableStats {
    pub size: usize,
    pub used: usize,
    /// Buckets holding at least one entry.
    pub occupied: usize,
    pub max_chain: usize,
    /// `histogram[n]` counts buckets with chain length `n`; the last
    /// slot aggregates everything at or past it.
    pub histogram: [usize; CHAIN_HISTOGRAM_LEN],
}

#[derive(Clone, Debug)]
pub struct DictStats {
    pub main: TableStats,
    pub rehashing: Option<TableStats>,
}

fn table_stats<K, V>(table: &Table<K, V>) -> TableStats {
    let mut stats = TableStats {
        size: table.size(),
        used: table.used,
        occupied: 0,
        max_chain: 0,
        histogram: [0; CHAIN_HISTOGRAM_LEN],
    };
    for bucket in &table.buckets {
        let mut chain = 0usize;
        let mut cur = bucket.as_deref();
        while let Some(node) = cur {
            chain += 1;
            cur = node.next.as_deref();
        }
        stats.histogram[chain.min(CHAIN_HISTOGRAM_LEN - 1)] += 1;
        if chain > 0 {
            stats.occupied += 1;
            stats.max_chain = stats.max_chain.max(chain);
        }
    }
    stats
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.used == 0 {
            return writeln!(f, "empty table");
        }
        writeln!(f, " table size: {}", self.size)?;
        writeln!(f, " number of elements: {}", self.used)?;
        writeln!(f, " different slots: {}", self.occupied)?;
        writeln!(f, " max chain length: {}", self.max_chain)?;
        writeln!(
            f,
            " avg chain length: {:.02}",
            self.used as f64 / self.occupied as f64
        )?;
        writeln!(f, " chain length distribution:")?;
        for (len, &buckets) in self.histogram.iter().enumerate() {
            if buckets == 0 {
                continue;
            }
            let marker = if len == CHAIN_HISTOGRAM_LEN - 1 { ">= " } else { "" };
            writeln!(
                f,
                "   {marker}{len}: {buckets} ({:.02}%)",
                buckets as f64 / self.size as f64 * 100.0
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for DictStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "main hash table:")?;
        write!(f, "{}", self.main)?;
        if let Some(rehashing) = &self.rehashing {
            writeln!(f, "rehashing target:")?;
            write!(f, "{rehashing}")?;
        }
        Ok(())
    }
}

// ---- test-only invariant audit --------------------------------------

#[cfg(test)]
impl<K, V, S> Dict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Walk both tables checking every structural invariant at once.
    pub(crate) fn audit(&self) {
        if self.rehash_idx == -1 {
            assert_eq!(self.tables[1].size(), 0, "idle dict must not hold a second table");
        } else {
            assert!(self.tables[1].size() > 0);
            for idx in 0..self.rehash_idx as usize {
                assert!(
                    self.tables[0].buckets[idx].is_none(),
                    "bucket {idx} below the rehash frontier must be empty"
                );
            }
        }
        let mut counted = 0usize;
        for table in &self.tables {
            let mut table_count = 0usize;
            for (idx, bucket) in table.buckets.iter().enumerate() {
                let mut cur = bucket.as_deref();
                while let Some(node) = cur {
                    assert_eq!(
                        (node.hash & table.mask()) as usize,
                        idx,
                        "entry chained under the wrong bucket"
                    );
                    assert_eq!(node.hash, self.hash_key(&node.key));
                    table_count += 1;
                    cur = node.next.as_deref();
                }
            }
            assert_eq!(table_count, table.used, "used count out of sync");
            counted += table_count;
        }
        assert_eq!(counted, self.len());
    }
}
