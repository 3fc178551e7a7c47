use std::collections::HashMap;

/// Interned string keys with stable, dense `u16` ids.
///
/// Id 0 is reserved for the empty sentinel key so a zeroed id always means
/// "unset". Ids are assigned in first-seen order, which follows the block
/// definition order of the config file and is therefore deterministic.
#[derive(Clone, Debug)]
pub struct NameCatalog {
    names: Vec<String>,
    by_name: HashMap<String, u16>,
}

impl Default for NameCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl NameCatalog {
    pub fn new() -> Self {
        Self {
            names: vec![String::new()],
            by_name: HashMap::new(),
        }
    }

    /// Returns the id for `key`, assigning the next free id on first use.
    pub fn intern(&mut self, key: &str) -> u16 {
        if key.is_empty() {
            return 0;
        }
        if let Some(id) = self.by_name.get(key) {
            return *id;
        }
        let id = self.names.len() as u16;
        self.names.push(key.to_string());
        self.by_name.insert(key.to_string(), id);
        id
    }

    pub fn get_id(&self, key: &str) -> Option<u16> {
        self.by_name.get(key).copied()
    }

    pub fn name(&self, id: u16) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Number of ids including the sentinel.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }

    /// Iterates `(id, key)` pairs in id order, skipping the sentinel.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.names
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, n)| (i as u16, n.as_str()))
    }
}
