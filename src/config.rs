//! Process-wide tuning knobs.
//!
//! All of these are embedder-settable at runtime. The hash seed is
//! one-shot: it must be installed before the first table is built and
//! cannot change afterwards, since every bucket placement depends on it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;

static HASH_SEED: OnceLock<[u8; 16]> = OnceLock::new();

/// Install the process-wide 16-byte hash seed. Returns `false` if a seed
/// (possibly the implicit zero seed) was already fixed by an earlier call
/// or by building a hasher.
pub fn set_hash_seed(seed: [u8; 16]) -> bool {
    HASH_SEED.set(seed).is_ok()
}

/// The current hash seed. Reading it fixes the zero seed if none was set.
pub fn hash_seed() -> [u8; 16] {
    *HASH_SEED.get_or_init(|| [0u8; 16])
}

static CAN_RESIZE: AtomicBool = AtomicBool::new(true);
static FORCE_RESIZE_RATIO: AtomicUsize = AtomicUsize::new(5);
static INITIAL_SIZE: AtomicUsize = AtomicUsize::new(4);
static PACKED_MAX_ENTRIES: AtomicUsize = AtomicUsize::new(128);
static PACKED_MAX_VALUE: AtomicUsize = AtomicUsize::new(64);

/// Globally allow or forbid automatic table resizing. While forbidden,
/// tables still grow once the fill ratio exceeds [`force_resize_ratio`].
/// Typically flipped off around copy-on-write forks.
pub fn set_resize_enabled(on: bool) {
    CAN_RESIZE.store(on, Ordering::Relaxed);
}

pub fn resize_enabled() -> bool {
    CAN_RESIZE.load(Ordering::Relaxed)
}

/// Fill ratio (used / buckets) past which a table grows even when
/// resizing is globally disabled. Default 5.
pub fn set_force_resize_ratio(ratio: usize) {
    FORCE_RESIZE_RATIO.store(ratio.max(1), Ordering::Relaxed);
}

pub fn force_resize_ratio() -> usize {
    FORCE_RESIZE_RATIO.load(Ordering::Relaxed)
}

fn clamp_initial_size(size: usize) -> usize {
    size.max(4).next_power_of_two()
}

/// Smallest bucket-array size ever allocated. Must be a power of two;
/// values below 4 are clamped up. Default 4.
pub fn set_initial_size(size: usize) {
    INITIAL_SIZE.store(clamp_initial_size(size), Ordering::Relaxed);
}

pub fn initial_size() -> usize {
    INITIAL_SIZE.load(Ordering::Relaxed)
}

/// Default entry-count limit above which a packed hash converts to a
/// table. Default 128.
pub fn set_packed_max_entries(n: usize) {
    PACKED_MAX_ENTRIES.store(n, Ordering::Relaxed);
}

pub fn packed_max_entries() -> usize {
    PACKED_MAX_ENTRIES.load(Ordering::Relaxed)
}

/// Default byte-length limit for a single packed field or value.
/// Default 64.
pub fn set_packed_max_value(n: usize) {
    PACKED_MAX_VALUE.store(n, Ordering::Relaxed);
}

pub fn packed_max_value() -> usize {
    PACKED_MAX_VALUE.load(Ordering::Relaxed)
}
