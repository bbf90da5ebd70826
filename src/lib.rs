//! dictset: in-memory container engines for a key-value store's hash
//! type.
//!
//! Three engines live here:
//!
//! - [`IntSet`] — a sorted integer set stored contiguously at the
//!   narrowest sufficient element width, widening on demand.
//! - [`Dict`] — a chained hash table that resizes incrementally across
//!   two live bucket arrays, with a stateless reversed-bit-cursor
//!   [`scan`](Dict::scan) that survives resizes between calls.
//! - [`HashObject`] — a field→value map that starts as a packed pair
//!   list and converts one-way into a [`Dict`] once it outgrows the
//!   packed limits.
//!
//! Hashing is seeded SipHash (see [`config::set_hash_seed`]); the
//! resize policy and packed-conversion thresholds are embedder-settable
//! through [`config`].

pub mod config;
mod dict;
mod dict_iter;
#[cfg(test)]
mod dict_proptest;
mod hash_object;
mod hashing;
mod int_set;
#[cfg(test)]
mod int_set_proptest;
mod pair_list;
mod scan;

pub use dict::{
    Dict, DictStats, Entry, InsertError, OccupiedEntry, ResizeError, TableStats, VacantEntry,
};
pub use dict_iter::{DetachedIter, Iter, IterTamperedError};
pub use hash_object::{HashIter, HashObject};
pub use hashing::{hash_bytes, hash_bytes_nocase, NocaseSipHashBuilder, SipHashBuilder};
pub use int_set::{Encoding, IntSet};
pub use pair_list::{End, PairList, Value};
