//! Field→value map with two representations.
//!
//! Small hashes live in a packed pair list (fields and values
//! alternating, insertion order preserved, linear lookup). Once any
//! single value outgrows the byte limit or the entry count passes the
//! entry limit, the map converts to a [`Dict`] and never goes back.

use core::hash::{BuildHasher, Hash};

use tracing::debug;

use crate::config;
use crate::dict::Dict;
use crate::dict_iter::Iter as DictIter;
use crate::pair_list::{End, PairList, Value};

enum Repr {
    Packed(PairList),
    Table(Dict<Vec<u8>, Vec<u8>>),
}

pub struct HashObject {
    repr: Repr,
    max_packed_entries: usize,
    max_packed_value: usize,
}

impl HashObject {
    /// Empty packed hash with the process-default conversion limits.
    pub fn new() -> Self {
        Self::with_limits(config::packed_max_entries(), config::packed_max_value())
    }

    /// Empty packed hash with explicit conversion limits.
    pub fn with_limits(max_packed_entries: usize, max_packed_value: usize) -> Self {
        HashObject {
            repr: Repr::Packed(PairList::new()),
            max_packed_entries,
            max_packed_value,
        }
    }

    /// Whether the map is still in its packed representation.
    pub fn is_packed(&self) -> bool {
        matches!(self.repr, Repr::Packed(_))
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Packed(list) => list.len() / 2,
            Repr::Table(dict) => dict.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to the table representation if any of `args` (fields or
    /// values about to be stored) is longer than the packed byte limit.
    /// Callers batch this check before a run of [`set`](Self::set)s.
    pub fn try_convert(&mut self, args: &[&[u8]]) {
        if !self.is_packed() {
            return;
        }
        if args.iter().any(|arg| arg.len() > self.max_packed_value) {
            self.convert_to_table();
        }
    }

    pub fn get(&self, field: &[u8]) -> Option<Value<'_>> {
        match &self.repr {
            Repr::Packed(list) => {
                let (_, value_off) = packed_offsets(list, field)?;
                Some(list.get(value_off))
            }
            Repr::Table(dict) => dict.get(field).map(|v| Value::Str(v.as_slice())),
        }
    }

    /// Byte length of the stored value, 0 when the field is absent.
    /// Inlined integers report their decimal width.
    pub fn value_len(&self, field: &[u8]) -> usize {
        self.get(field).map(|v| v.byte_len()).unwrap_or(0)
    }

    pub fn contains_field(&self, field: &[u8]) -> bool {
        match &self.repr {
            Repr::Packed(list) => packed_offsets(list, field).is_some(),
            Repr::Table(dict) => dict.contains_key(field),
        }
    }

    /// Insert or overwrite a field. Returns whether it existed before.
    /// A packed hash that grows past its entry limit converts to a
    /// table afterwards; oversized values are [`try_convert`]'s job.
    ///
    /// [`try_convert`]: Self::try_convert
    pub fn set(&mut self, field: &[u8], value: &[u8]) -> bool {
        let existed = match &mut self.repr {
            Repr::Packed(list) => match packed_offsets(list, field) {
                Some((_, value_off)) => {
                    // Replace the value entry in place; the field entry
                    // keeps its position.
                    list.remove(value_off);
                    list.insert(value_off, value);
                    true
                }
                None => {
                    list.push(field, End::Tail);
                    list.push(value, End::Tail);
                    false
                }
            },
            Repr::Table(dict) => dict.replace(field.to_vec(), value.to_vec()).is_some(),
        };
        if self.is_packed() && self.len() > self.max_packed_entries {
            self.convert_to_table();
        }
        existed
    }

    /// Remove a field and its value. Returns whether it was present.
    /// Table-backed hashes ask the dict to shrink once it is mostly
    /// empty.
    pub fn remove(&mut self, field: &[u8]) -> bool {
        match &mut self.repr {
            Repr::Packed(list) => match packed_offsets(list, field) {
                Some((field_off, _)) => {
                    list.remove(field_off);
                    // The value slid into the field's offset.
                    list.remove(field_off);
                    true
                }
                None => false,
            },
            Repr::Table(dict) => {
                let removed = dict.remove(field);
                if removed && needs_shrink(dict) {
                    let _ = dict.shrink();
                }
                removed
            }
        }
    }

    /// Field/value pairs: insertion order while packed, bucket order
    /// once table-backed.
    pub fn iter(&self) -> HashIter<'_> {
        match &self.repr {
            Repr::Packed(list) => HashIter {
                inner: HashIterRepr::Packed {
                    list,
                    cursor: list.head(),
                },
            },
            Repr::Table(dict) => HashIter {
                inner: HashIterRepr::Table(dict.iter()),
            },
        }
    }

    /// Cursor-driven scan. Table-backed hashes step the dict scan;
    /// packed hashes are small enough to emit in full, so the first
    /// call delivers everything and finishes with cursor 0.
    pub fn scan<F>(&self, cursor: u64, mut emit: F) -> u64
    where
        F: FnMut(Value<'_>, Value<'_>),
    {
        match &self.repr {
            Repr::Table(dict) => dict.scan(cursor, |field, value| {
                emit(Value::Str(field.as_slice()), Value::Str(value.as_slice()))
            }),
            Repr::Packed(list) => {
                let mut cursor = list.head();
                while let Some(field_off) = cursor {
                    let value_off = pair_value_offset(list, field_off);
                    emit(list.get(field_off), list.get(value_off));
                    cursor = list.next(value_off);
                }
                0
            }
        }
    }

    fn convert_to_table(&mut self) {
        let list = match &self.repr {
            Repr::Packed(list) => list,
            Repr::Table(_) => return,
        };
        let mut dict: Dict<Vec<u8>, Vec<u8>> = Dict::with_capacity(list.len() / 2);
        let mut cursor = list.head();
        while let Some(field_off) = cursor {
            let value_off = pair_value_offset(list, field_off);
            let field = list.get(field_off).to_vec();
            let value = list.get(value_off).to_vec();
            if dict.add(field, value).is_err() {
                panic!("packed hash corruption: duplicate field during conversion");
            }
            cursor = list.next(value_off);
        }
        debug!(entries = dict.len(), "packed hash converted to table");
        self.repr = Repr::Table(dict);
    }
}

impl Default for HashObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Offsets of a field entry and its value entry.
fn packed_offsets(list: &PairList, field: &[u8]) -> Option<(usize, usize)> {
    let head = list.head()?;
    let field_off = list.find(head, field, 1)?;
    Some((field_off, pair_value_offset(list, field_off)))
}

fn pair_value_offset(list: &PairList, field_off: usize) -> usize {
    list.next(field_off)
        .expect("every field entry is followed by its value")
}

fn needs_shrink<K, V, S>(dict: &Dict<K, V, S>) -> bool
where
    K: Hash + Eq,
    S: BuildHasher,
{
    let size = dict.bucket_count();
    size > config::initial_size() && dict.len() * 100 / size < 10
}

pub struct HashIter<'a> {
    inner: HashIterRepr<'a>,
}

enum HashIterRepr<'a> {
    Packed {
        list: &'a PairList,
        cursor: Option<usize>,
    },
    Table(DictIter<'a, Vec<u8>, Vec<u8>>),
}

impl<'a> Iterator for HashIter<'a> {
    type Item = (Value<'a>, Value<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            HashIterRepr::Packed { list, cursor } => {
                let field_off = (*cursor)?;
                let value_off = pair_value_offset(list, field_off);
                let item = (list.get(field_off), list.get(value_off));
                *cursor = list.next(value_off);
                Some(item)
            }
            HashIterRepr::Table(iter) => iter
                .next()
                .map(|(field, value)| (Value::Str(field.as_slice()), Value::Str(value.as_slice()))),
        }
    }
}
