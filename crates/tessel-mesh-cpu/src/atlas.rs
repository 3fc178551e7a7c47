use std::sync::{RwLock, RwLockReadGuard};

use hashbrown::HashMap;

use crate::services::AtlasId;
use crate::tessellator::TesselateError;

/// The registered atlas set. Buffer arrays are sized by `len()` and indexed
/// by `index_of(id)`.
#[derive(Clone, Debug, Default)]
pub struct AtlasSet {
    ids: Vec<AtlasId>,
    index: HashMap<AtlasId, usize>,
    generation: u64,
}

impl AtlasSet {
    fn from_ids(ids: &[AtlasId], generation: u64) -> Self {
        let mut set = AtlasSet {
            ids: Vec::with_capacity(ids.len()),
            index: HashMap::with_capacity(ids.len()),
            generation,
        };
        for &id in ids {
            if !set.index.contains_key(&id) {
                set.index.insert(id, set.ids.len());
                set.ids.push(id);
            }
        }
        set
    }

    #[inline]
    pub fn index_of(&self, id: AtlasId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[inline]
    pub fn id_at(&self, index: usize) -> Option<AtlasId> {
        self.ids.get(index).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ids(&self) -> &[AtlasId] {
        &self.ids
    }
}

/// Process-wide atlas configuration shared by every tesselator.
///
/// A tesselation holds the read guard for its whole duration, so
/// `set_atlases` waits for in-flight chunks and no chunk ever sees a
/// half-applied change.
#[derive(Debug, Default)]
pub struct AtlasRegistry {
    inner: RwLock<AtlasSet>,
}

impl AtlasRegistry {
    pub fn new(ids: &[AtlasId]) -> Self {
        Self {
            inner: RwLock::new(AtlasSet::from_ids(ids, 1)),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, AtlasSet>, TesselateError> {
        self.inner.read().map_err(|_| TesselateError::AtlasLockPoisoned)
    }

    /// Replaces the atlas set and returns the new generation.
    pub fn set_atlases(&self, ids: &[AtlasId]) -> Result<u64, TesselateError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| TesselateError::AtlasLockPoisoned)?;
        let generation = guard.generation + 1;
        *guard = AtlasSet::from_ids(ids, generation);
        log::debug!(target: "tessel::tess", "atlas set now {:?} (generation {})", guard.ids, generation);
        Ok(generation)
    }

    pub fn generation(&self) -> Result<u64, TesselateError> {
        Ok(self.read()?.generation)
    }
}
