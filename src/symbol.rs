use fxhash::FxBuildHasher;
use indexmap::IndexMap;

// Insertion-ordered so diagnostics and dumps list labels in source order
type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Table of label -> byte offset, owned by one assembly run.
///
/// Offsets are the buffer's write cursor at the point of definition.
/// Redefining a label overwrites the earlier offset.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: FxMap<String, u8>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            map: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn define(&mut self, label: &str, offset: u8) {
        self.map.insert(label.to_string(), offset);
    }

    pub fn get(&self, label: &str) -> Option<u8> {
        self.map.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.map.contains_key(label)
    }
}
