use super::int_box::IntBox;
use rstar::{AABB, RTree};
use std::collections::HashMap;

/// Envelope index over values of type `T`, addressed by a caller chosen key.
pub struct SpatialIndex<T> {
    tree: RTree<IndexedBox>,
    values: HashMap<u64, (IntBox, T)>,
}

#[derive(Clone, Debug, PartialEq)]
struct IndexedBox {
    envelope: AABB<[f64; 2]>,
    key: u64,
}

impl rstar::RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_aabb(b: &IntBox) -> AABB<[f64; 2]> {
    AABB::from_corners([b.ll.x as f64, b.ll.y as f64], [b.ur.x as f64, b.ur.y as f64])
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            values: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inserts `value` under `key`, replacing an earlier value with the same key.
    pub fn insert(&mut self, key: u64, bounds: IntBox, value: T) {
        self.remove(key);
        self.tree.insert(IndexedBox {
            envelope: to_aabb(&bounds),
            key,
        });
        self.values.insert(key, (bounds, value));
    }

    pub fn remove(&mut self, key: u64) -> Option<T> {
        let (bounds, value) = self.values.remove(&key)?;
        self.tree.remove(&IndexedBox {
            envelope: to_aabb(&bounds),
            key,
        });
        Some(value)
    }

    pub fn get(&self, key: u64) -> Option<&T> {
        self.values.get(&key).map(|(_, v)| v)
    }

    /// All values whose bounds intersect `bounds`, borders included.
    pub fn query(&self, bounds: &IntBox) -> Vec<(u64, &T)> {
        let mut keys: Vec<u64> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(bounds))
            .map(|item| item.key)
            .collect();
        keys.sort_unstable();
        keys.into_iter()
            .filter_map(|k| self.values.get(&k).map(|(_, v)| (k, v)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> {
        self.values.iter().map(|(k, (_, v))| (*k, v))
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.values.clear();
    }
}
