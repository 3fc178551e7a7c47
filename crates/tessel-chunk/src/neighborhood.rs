use std::sync::{Arc, RwLock};

use hashbrown::HashMap;

use crate::coord::ChunkCoord;
use crate::data::ChunkData;

/// A chunk and its 26 neighbors, indexed by offset in `-1..=1` per axis.
/// Absent entries are unloaded chunks.
#[derive(Clone, Debug, Default)]
pub struct Neighborhood {
    slots: [Option<Arc<ChunkData>>; 27],
}

impl Neighborhood {
    #[inline]
    fn slot(dx: i32, dy: i32, dz: i32) -> usize {
        debug_assert!((-1..=1).contains(&dx) && (-1..=1).contains(&dy) && (-1..=1).contains(&dz));
        ((dx + 1) * 9 + (dy + 1) * 3 + (dz + 1)) as usize
    }

    pub fn new(center: Option<Arc<ChunkData>>) -> Self {
        let mut n = Self::default();
        n.set(0, 0, 0, center);
        n
    }

    #[inline]
    pub fn set(&mut self, dx: i32, dy: i32, dz: i32, chunk: Option<Arc<ChunkData>>) {
        self.slots[Self::slot(dx, dy, dz)] = chunk;
    }

    #[inline]
    pub fn get(&self, dx: i32, dy: i32, dz: i32) -> Option<&Arc<ChunkData>> {
        self.slots[Self::slot(dx, dy, dz)].as_ref()
    }

    #[inline]
    pub fn center(&self) -> Option<&Arc<ChunkData>> {
        self.get(0, 0, 0)
    }

    pub fn loaded(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Source of chunk data for the mesher.
pub trait ChunkProvider: Send + Sync {
    fn chunk(&self, coord: ChunkCoord) -> Option<Arc<ChunkData>>;

    fn neighborhood(&self, coord: ChunkCoord) -> Neighborhood {
        let mut n = Neighborhood::default();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    n.set(dx, dy, dz, self.chunk(coord.offset(dx, dy, dz)));
                }
            }
        }
        n
    }
}

/// Loaded chunks in a shared map.
#[derive(Default)]
pub struct MapChunkProvider {
    chunks: RwLock<HashMap<ChunkCoord, Arc<ChunkData>>>,
}

impl MapChunkProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, chunk: ChunkData) -> Option<Arc<ChunkData>> {
        let coord = chunk.coord;
        self.insert_arc(coord, Arc::new(chunk))
    }

    pub fn insert_arc(&self, coord: ChunkCoord, chunk: Arc<ChunkData>) -> Option<Arc<ChunkData>> {
        match self.chunks.write() {
            Ok(mut g) => g.insert(coord, chunk),
            Err(poisoned) => poisoned.into_inner().insert(coord, chunk),
        }
    }

    pub fn remove(&self, coord: ChunkCoord) -> Option<Arc<ChunkData>> {
        match self.chunks.write() {
            Ok(mut g) => g.remove(&coord),
            Err(poisoned) => poisoned.into_inner().remove(&coord),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut v: Vec<ChunkCoord> = self
            .chunks
            .read()
            .map(|g| g.keys().copied().collect())
            .unwrap_or_default();
        v.sort();
        v
    }
}

impl ChunkProvider for MapChunkProvider {
    fn chunk(&self, coord: ChunkCoord) -> Option<Arc<ChunkData>> {
        self.chunks.read().ok()?.get(&coord).cloned()
    }
}
