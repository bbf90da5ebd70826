//! Seeded SipHash build-hashers.
//!
//! Both builders key SipHash with the process-wide seed from
//! [`crate::config::hash_seed`], split little-endian into the two 64-bit
//! lanes. `NocaseSipHashBuilder` folds ASCII case while feeding the
//! hasher, for tables whose keys compare case-insensitively.

use core::hash::{BuildHasher, Hasher};
use siphasher::sip::SipHasher;

use crate::config::hash_seed;

fn seed_keys() -> (u64, u64) {
    let seed = hash_seed();
    let k0 = u64::from_le_bytes(seed[0..8].try_into().expect("seed half"));
    let k1 = u64::from_le_bytes(seed[8..16].try_into().expect("seed half"));
    (k0, k1)
}

/// Case-sensitive seeded SipHash.
#[derive(Clone, Copy, Debug)]
pub struct SipHashBuilder {
    k0: u64,
    k1: u64,
}

impl SipHashBuilder {
    pub fn new() -> Self {
        let (k0, k1) = seed_keys();
        Self { k0, k1 }
    }

    /// Builder with explicit keys, independent of the global seed.
    pub fn with_keys(k0: u64, k1: u64) -> Self {
        Self { k0, k1 }
    }
}

impl Default for SipHashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildHasher for SipHashBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> SipHasher {
        SipHasher::new_with_keys(self.k0, self.k1)
    }
}

/// Seeded SipHash over ASCII-lowercased input.
///
/// Pair this with a key type whose `Eq` ignores ASCII case; the builder
/// only guarantees equal digests for byte strings that are equal after
/// ASCII folding.
#[derive(Clone, Copy, Debug)]
pub struct NocaseSipHashBuilder {
    k0: u64,
    k1: u64,
}

impl NocaseSipHashBuilder {
    pub fn new() -> Self {
        let (k0, k1) = seed_keys();
        Self { k0, k1 }
    }
}

impl Default for NocaseSipHashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildHasher for NocaseSipHashBuilder {
    type Hasher = NocaseSipHasher;

    fn build_hasher(&self) -> NocaseSipHasher {
        NocaseSipHasher(SipHasher::new_with_keys(self.k0, self.k1))
    }
}

/// Hasher that ASCII-folds every input chunk before digesting it.
pub struct NocaseSipHasher(SipHasher);

impl Hasher for NocaseSipHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut folded = [0u8; 64];
        for chunk in bytes.chunks(folded.len()) {
            for (dst, src) in folded.iter_mut().zip(chunk) {
                *dst = src.to_ascii_lowercase();
            }
            self.0.write(&folded[..chunk.len()]);
        }
    }

    fn finish(&self) -> u64 {
        self.0.finish()
    }
}

/// Digest a byte string with the process seed (case-sensitive).
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h = SipHashBuilder::new().build_hasher();
    h.write(data);
    h.finish()
}

/// Digest a byte string with the process seed, ignoring ASCII case.
pub fn hash_bytes_nocase(data: &[u8]) -> u64 {
    let mut h = NocaseSipHashBuilder::new().build_hasher();
    h.write(data);
    h.finish()
}
