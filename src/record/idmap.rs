//! Stable dense ids for external image keys.
//!
//! Parsers see images under whatever key the raw source uses (a filename,
//! a database row id, ...). [`IdMap`] turns those keys into dense
//! [`ImageId`]s in first-seen order and remembers the mapping so errors
//! can name the image the way the user knows it.

use std::collections::HashMap;
use std::hash::Hash;

use super::ids::ImageId;

/// First id handed out by [`IdMap::new`].
pub const DEFAULT_ID_BASE: u64 = 1;

/// Bidirectional mapping between external image keys and [`ImageId`]s.
///
/// Ids are assigned from a fixed base in first-seen order and are never
/// reused or reassigned. There is no removal.
#[derive(Clone, Debug)]
pub struct IdMap<K = String> {
    base: u64,
    forward: HashMap<K, ImageId>,
    reverse: Vec<K>,
}

impl<K: Hash + Eq + Clone> IdMap<K> {
    /// Creates an empty map starting at [`DEFAULT_ID_BASE`].
    pub fn new() -> Self {
        Self::with_base(DEFAULT_ID_BASE)
    }

    /// Creates an empty map whose first assigned id is `base`.
    pub fn with_base(base: u64) -> Self {
        Self {
            base,
            forward: HashMap::new(),
            reverse: Vec::new(),
        }
    }

    /// Creates a map pre-seeded with `keys`, in order.
    ///
    /// Duplicate keys keep their first id.
    pub fn seeded<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let mut map = Self::new();
        for key in keys {
            map.lookup(key);
        }
        map
    }

    /// Returns the id for `key`, assigning the next unused one on first sight.
    pub fn lookup(&mut self, key: K) -> ImageId {
        if let Some(&id) = self.forward.get(&key) {
            return id;
        }

        let id = ImageId::new(self.base + self.reverse.len() as u64);
        self.forward.insert(key.clone(), id);
        self.reverse.push(key);
        id
    }

    /// Returns the id already assigned to `key`, without assigning one.
    pub fn get(&self, key: &K) -> Option<ImageId> {
        self.forward.get(key).copied()
    }

    /// Reverse lookup: the external key an id was assigned to.
    pub fn external_id(&self, id: ImageId) -> Option<&K> {
        let offset = id.as_u64().checked_sub(self.base)?;
        self.reverse.get(usize::try_from(offset).ok()?)
    }

    /// The first id this map hands out.
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Iterates `(id, key)` pairs in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &K)> + '_ {
        self.reverse
            .iter()
            .enumerate()
            .map(move |(i, key)| (ImageId::new(self.base + i as u64), key))
    }
}

impl<K: Hash + Eq + Clone> Default for IdMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
