//! Fixed-capacity snapshot records
//!
//! Records are built on the stack at the call site and handed to the host by
//! reference. They never allocate and never grow past their capacity.

use super::attribute::{AttributeKey, Entry, Variant};
use thiserror::Error;

/// Returned when a record is already full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("snapshot record is full (capacity {capacity})")]
pub struct CapacityError {
    pub capacity: usize,
}

/// Scope flags for a pushed snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SnapshotScope {
    pub process: bool,
    pub thread: bool,
}

impl SnapshotScope {
    pub const PROCESS_THREAD: SnapshotScope = SnapshotScope {
        process: true,
        thread: true,
    };
}

/// Ordered (attribute, value) record with capacity `N`
#[derive(Debug, Clone, Copy)]
pub struct FixedSnapshot<'a, const N: usize> {
    entries: [Entry<'a>; N],
    len: usize,
}

impl<'a, const N: usize> FixedSnapshot<'a, N> {
    pub const CAPACITY: usize = N;

    pub fn new() -> Self {
        Self {
            entries: [Entry::EMPTY; N],
            len: 0,
        }
    }

    /// Build a full record from parallel attribute/value arrays
    pub fn from_pairs(attrs: [AttributeKey; N], values: [Variant<'a>; N]) -> Self {
        let mut record = Self::new();
        for (attr, value) in attrs.into_iter().zip(values) {
            record.entries[record.len] = Entry::new(attr, value);
            record.len += 1;
        }
        record
    }

    pub fn push(&mut self, attr: AttributeKey, value: Variant<'a>) -> Result<(), CapacityError> {
        if self.len == N {
            return Err(CapacityError { capacity: N });
        }
        self.entries[self.len] = Entry::new(attr, value);
        self.len += 1;
        Ok(())
    }

    pub fn as_slice(&self) -> &[Entry<'a>] {
        &self.entries[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Value recorded for `attr`, if any
    pub fn get(&self, attr: AttributeKey) -> Option<Variant<'a>> {
        self.as_slice()
            .iter()
            .find(|e| e.attr == attr)
            .map(|e| e.value)
    }
}

impl<const N: usize> Default for FixedSnapshot<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut record: FixedSnapshot<'_, 3> = FixedSnapshot::new();
        assert!(record.is_empty());

        record.push(AttributeKey::new(0), Variant::UInt(1)).unwrap();
        record.push(AttributeKey::new(1), Variant::UInt(2)).unwrap();
        record.push(AttributeKey::new(2), Variant::Str(b"x")).unwrap();
        assert!(record.is_full());

        let err = record.push(AttributeKey::new(3), Variant::Bool(true)).unwrap_err();
        assert_eq!(err.capacity, 3);
        assert_eq!(record.len(), 3);
        assert_eq!(record.get(AttributeKey::new(3)), None);
    }

    #[test]
    fn test_from_pairs_preserves_order() {
        let record = FixedSnapshot::from_pairs(
            [AttributeKey::new(10), AttributeKey::new(11), AttributeKey::new(12), AttributeKey::new(13)],
            [Variant::UInt(0), Variant::UInt(1), Variant::UInt(2), Variant::Str(b"stream\0")],
        );

        let attrs: Vec<u64> = record.as_slice().iter().map(|e| e.attr.id()).collect();
        assert_eq!(attrs, vec![10, 11, 12, 13]);
        assert_eq!(record.get(AttributeKey::new(13)).unwrap().text(), Some("stream"));
        assert_eq!(FixedSnapshot::<'_, 4>::CAPACITY, 4);
    }
}
