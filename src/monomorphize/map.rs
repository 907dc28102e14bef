use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::types::{ObjId, TypeEnv, TypeId};

use super::instance::Instance;

/// Map keyed by [`Instance`].
///
/// Entries are bucketed per object by a combined hash of the nesting and
/// type arguments. Storage is append-only with tombstones, so deleting any
/// entry never moves another one: a [`Cursor`] walking the map while entries
/// are deleted visits every live, not-yet-visited key exactly once.
/// Tombstones are only reclaimed by [`compact`](Self::compact).
#[derive(Debug, Clone)]
pub struct InstanceMap<V> {
    entries: Vec<Option<(Instance, V)>>,
    buckets: HashMap<ObjId, HashMap<u64, Vec<usize>>>,
    len: usize,
}

impl<V> Default for InstanceMap<V> {
    fn default() -> Self {
        Self { entries: Vec::new(), buckets: HashMap::new(), len: 0 }
    }
}

/// Combined hash of several types. Xor keeps the bit distribution of the
/// individual hashes.
fn type_hash(nest: &[TypeId], args: &[TypeId]) -> u64 {
    let mut hash = 0u64;
    for ty in nest.iter().chain(args) {
        let mut hasher = DefaultHasher::new();
        ty.hash(&mut hasher);
        hash ^= hasher.finish();
    }
    hash
}

impl<V> InstanceMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn find_index(&self, key: &Instance) -> Option<usize> {
        let bucket = self
            .buckets
            .get(&key.object)?
            .get(&type_hash(&key.nest_args, &key.type_args))?;
        bucket.iter().copied().find(|&i| {
            self.entries[i].as_ref().is_some_and(|(candidate, _)| {
                candidate.nest_args == key.nest_args && candidate.type_args == key.type_args
            })
        })
    }

    pub fn get(&self, key: &Instance) -> Option<&V> {
        let i = self.find_index(key)?;
        self.entries[i].as_ref().map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &Instance) -> Option<&mut V> {
        let i = self.find_index(key)?;
        self.entries[i].as_mut().map(|(_, v)| v)
    }

    pub fn has(&self, key: &Instance) -> bool {
        self.find_index(key).is_some()
    }

    /// Store `value` for `key`, returning the previous value if there was one.
    pub fn set(&mut self, key: Instance, value: V) -> Option<V> {
        if let Some(i) = self.find_index(&key)
            && let Some((_, slot)) = self.entries[i].as_mut()
        {
            return Some(std::mem::replace(slot, value));
        }
        let hash = type_hash(&key.nest_args, &key.type_args);
        let index = self.entries.len();
        self.buckets.entry(key.object).or_default().entry(hash).or_default().push(index);
        self.entries.push(Some((key, value)));
        self.len += 1;
        None
    }

    /// Remove the entry for `key`, returning its value if it was present.
    pub fn delete(&mut self, key: &Instance) -> Option<V> {
        let i = self.find_index(key)?;
        let (_, value) = self.entries[i].take()?;
        if let Some(per_obj) = self.buckets.get_mut(&key.object) {
            let hash = type_hash(&key.nest_args, &key.type_args);
            if let Some(bucket) = per_obj.get_mut(&hash) {
                bucket.retain(|&j| j != i);
            }
        }
        self.len -= 1;
        Some(value)
    }

    /// Live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Instance, &V)> {
        self.entries.iter().filter_map(|e| e.as_ref().map(|(k, v)| (k, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Instance, &mut V)> {
        self.entries.iter_mut().filter_map(|e| e.as_mut().map(|(k, v)| (&*k, v)))
    }

    pub fn keys(&self) -> Vec<Instance> {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Instance, &mut V) -> bool) {
        let doomed: Vec<Instance> = self
            .iter_mut()
            .filter_map(|(k, v)| if keep(k, v) { None } else { Some(k.clone()) })
            .collect();
        for key in doomed {
            self.delete(&key);
        }
    }

    /// Drop the tombstones left by deletions, keeping live entries in
    /// insertion order. Cursors taken before compacting must not be reused.
    pub fn compact(&mut self) {
        if self.entries.len() == self.len {
            return;
        }
        let live = std::mem::take(&mut self.entries);
        self.buckets.clear();
        self.len = 0;
        for (key, value) in live.into_iter().flatten() {
            self.set(key, value);
        }
    }

    /// Number of storage slots, live or deleted.
    #[cfg(test)]
    fn slots(&self) -> usize {
        self.entries.len()
    }

    /// A cursor positioned before the first entry.
    pub fn cursor(&self) -> Cursor {
        Cursor { pos: 0 }
    }

    /// Render entries as `{key:value, ...}`, sorted by their text.
    pub fn render(&self, env: &TypeEnv, value: impl Fn(&V) -> String) -> String {
        let mut entries: Vec<String> =
            self.iter().map(|(k, v)| format!("{}:{}", k.display(env), value(v))).collect();
        entries.sort();
        format!("{{{}}}", entries.join(", "))
    }
}

/// Position in an [`InstanceMap`] that survives mutation of the map.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pos: usize,
}

impl Cursor {
    /// The next live key at or after the cursor position.
    pub fn next<V>(&mut self, map: &InstanceMap<V>) -> Option<Instance> {
        while self.pos < map.entries.len() {
            let entry = &map.entries[self.pos];
            self.pos += 1;
            if let Some((key, _)) = entry {
                return Some(key.clone());
            }
        }
        None
    }
}
