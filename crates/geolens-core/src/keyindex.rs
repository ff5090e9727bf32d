//! Case-insensitive lookups across vector-keyed maps.
//!
//! Weights, details, scores and citations for the same run are keyed by the
//! same vector names, except the model does not keep the casing consistent.
//! `KeyIndex` is built once per map and answers lookups with an exact match
//! first and a lower-cased match second.

use std::collections::{BTreeMap, HashMap};

pub struct KeyIndex<'a, V> {
    map: &'a BTreeMap<String, V>,
    folded: HashMap<String, &'a str>,
}

impl<'a, V> KeyIndex<'a, V> {
    pub fn new(map: &'a BTreeMap<String, V>) -> Self {
        let mut folded = HashMap::with_capacity(map.len());
        for key in map.keys() {
            // First key in sorted order wins when two keys fold together.
            folded.entry(fold(key)).or_insert(key.as_str());
        }
        Self { map, folded }
    }

    pub fn get(&self, name: &str) -> Option<&'a V> {
        if let Some(v) = self.map.get(name) {
            return Some(v);
        }
        self.folded
            .get(&fold(name))
            .and_then(|orig| self.map.get(*orig))
    }
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}
