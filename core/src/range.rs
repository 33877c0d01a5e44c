use std::ops::Bound;

use crate::key::Key;

/// A range of keys with independently open, closed or unbounded ends.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRange {
    pub lower: Bound<Key>,
    pub upper: Bound<Key>,
}

impl KeyRange {
    pub fn all() -> Self { Self { lower: Bound::Unbounded, upper: Bound::Unbounded } }

    /// Exactly one key.
    pub fn only(key: impl Into<Key>) -> Self {
        let key = key.into();
        Self { lower: Bound::Included(key.clone()), upper: Bound::Included(key) }
    }

    pub fn at_least(key: impl Into<Key>) -> Self { Self { lower: Bound::Included(key.into()), upper: Bound::Unbounded } }

    pub fn greater_than(key: impl Into<Key>) -> Self { Self { lower: Bound::Excluded(key.into()), upper: Bound::Unbounded } }

    pub fn at_most(key: impl Into<Key>) -> Self { Self { lower: Bound::Unbounded, upper: Bound::Included(key.into()) } }

    pub fn less_than(key: impl Into<Key>) -> Self { Self { lower: Bound::Unbounded, upper: Bound::Excluded(key.into()) } }

    pub fn between(lower: impl Into<Key>, upper: impl Into<Key>, lower_open: bool, upper_open: bool) -> Self {
        let (lower, upper) = (lower.into(), upper.into());
        Self {
            lower: if lower_open { Bound::Excluded(lower) } else { Bound::Included(lower) },
            upper: if upper_open { Bound::Excluded(upper) } else { Bound::Included(upper) },
        }
    }

    pub fn is_all(&self) -> bool { matches!((&self.lower, &self.upper), (Bound::Unbounded, Bound::Unbounded)) }

    /// The single key this range matches, if it is an equality range.
    pub fn as_only(&self) -> Option<&Key> {
        match (&self.lower, &self.upper) {
            (Bound::Included(lo), Bound::Included(hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        let above = match &self.lower {
            Bound::Included(lo) => key >= lo,
            Bound::Excluded(lo) => key > lo,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(hi) => key <= hi,
            Bound::Excluded(hi) => key < hi,
            Bound::Unbounded => true,
        };
        above && below
    }

    /// True when no key can satisfy both ends.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
            (Bound::Included(lo), Bound::Excluded(hi)) | (Bound::Excluded(lo), Bound::Included(hi)) | (Bound::Excluded(lo), Bound::Excluded(hi)) => {
                lo >= hi
            }
            _ => false,
        }
    }

    /// Byte bounds over `Key::encode` output, for engines that store keys as ordered bytes.
    ///
    /// The bounds cover every entry whose key *starts with* a matching encoded key, so
    /// they work both for plain keys and for composite keys of the form
    /// `encode(index key) ++ encode(primary key)`. Returns `None` for an empty range.
    pub fn encoded_bounds(&self) -> Option<(Bound<Vec<u8>>, Bound<Vec<u8>>)> {
        if self.is_empty() {
            return None;
        }
        let lower = match &self.lower {
            Bound::Included(k) => Bound::Included(k.encode()),
            Bound::Excluded(k) => Bound::Included(prefix_end(&k.encode())?),
            Bound::Unbounded => Bound::Unbounded,
        };
        let upper = match &self.upper {
            Bound::Included(k) => match prefix_end(&k.encode()) {
                Some(end) => Bound::Excluded(end),
                None => Bound::Unbounded,
            },
            Bound::Excluded(k) => Bound::Excluded(k.encode()),
            Bound::Unbounded => Bound::Unbounded,
        };
        Some((lower, upper))
    }
}

impl Default for KeyRange {
    fn default() -> Self { Self::all() }
}

impl From<Key> for KeyRange {
    fn from(key: Key) -> Self { Self::only(key) }
}

/// Smallest byte string greater than every string starting with `prefix`.
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
