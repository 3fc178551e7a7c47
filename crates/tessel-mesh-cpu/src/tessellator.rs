use std::sync::Arc;
use std::time::Instant;

use tessel_blocks::{AIR, BlockRegistry};
use tessel_chunk::{ChunkCoord, ChunkData, MAX_CHUNK_SIZE, Neighborhood};
use thiserror::Error;

use crate::atlas::{AtlasRegistry, AtlasSet};
use crate::context::{Binder, EmitContext, EmitEnv, EmitSink, TextureCache};
use crate::decor::{self, DecorRotations, DrawnDecor};
use crate::draw::strategy_for;
use crate::grid::ExtendedGrid;
use crate::pool::{ChunkMeshState, MeshPool, MeshRecycler};
use crate::services::{AtlasId, ClimateSampler, ShapeVoxelizer, TextureResolver};
use crate::util::WarnOnce;
use crate::visibility::{CullEnv, FaceMasks};
use crate::walk::{Partition, VoxelWalk};

#[derive(Debug, Error)]
pub enum TesselateError {
    #[error("atlas registry lock poisoned")]
    AtlasLockPoisoned,
    #[error("chunk size {0} outside 1..={max}", max = MAX_CHUNK_SIZE)]
    InvalidChunkSize(usize),
    #[error("chunk {coord} has size {found}, tesselator expects {expected}")]
    ChunkSizeMismatch {
        coord: ChunkCoord,
        expected: usize,
        found: usize,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct TesselatorConfig {
    pub chunk_size: usize,
    pub sea_level: i32,
    /// Spare snapshot buffers the recycler keeps for reuse.
    pub max_spare_meshes: usize,
}

impl Default for TesselatorConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_CHUNK_SIZE,
            sea_level: 64,
            max_spare_meshes: 256,
        }
    }
}

/// External collaborators the tesselator queries while emitting.
#[derive(Clone)]
pub struct TesselatorServices {
    pub textures: Arc<dyn TextureResolver>,
    pub climate: Arc<dyn ClimateSampler>,
    pub shapes: Arc<dyn ShapeVoxelizer>,
}

/// Chunk the grid interior was last filled from.
struct LastBuild {
    coord: ChunkCoord,
    center: Option<Arc<ChunkData>>,
}

impl LastBuild {
    fn matches(&self, coord: ChunkCoord, neighbors: &Neighborhood) -> bool {
        self.coord == coord
            && match (&self.center, neighbors.center()) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TesselatorStats {
    pub chunks: u64,
    pub edge_only: u64,
    /// Edge-only requests rebuilt in full.
    pub upgraded: u64,
    /// Chunks with no visible face.
    pub empty: u64,
    pub last_vertices: usize,
    pub total_vertices: u64,
}

/// Turns one chunk and its neighbors into per-(pass, atlas) mesh parts.
///
/// One tesselator serves one thread; its grid, masks and pool are reused
/// across calls. Geometry is emitted in chunk-local coordinates.
pub struct ChunkTesselator {
    cfg: TesselatorConfig,
    reg: Arc<BlockRegistry>,
    atlases: Arc<AtlasRegistry>,
    rotations: Arc<DecorRotations>,
    services: TesselatorServices,
    recycler: Arc<MeshRecycler>,
    grid: ExtendedGrid,
    masks: FaceMasks,
    pool: MeshPool,
    textures: TextureCache,
    warned: WarnOnce,
    decors: Vec<DrawnDecor>,
    generation: u64,
    last_complete: Option<LastBuild>,
    walk: VoxelWalk,
    stats: TesselatorStats,
}

impl ChunkTesselator {
    pub fn new(
        cfg: TesselatorConfig,
        reg: Arc<BlockRegistry>,
        atlases: Arc<AtlasRegistry>,
        rotations: Arc<DecorRotations>,
        services: TesselatorServices,
    ) -> Result<Self, TesselateError> {
        if cfg.chunk_size == 0 || cfg.chunk_size > MAX_CHUNK_SIZE {
            return Err(TesselateError::InvalidChunkSize(cfg.chunk_size));
        }
        let (atlas_count, generation) = {
            let set = atlases.read()?;
            (set.len(), set.generation())
        };
        Ok(Self {
            grid: ExtendedGrid::new(cfg.chunk_size),
            masks: FaceMasks::new(cfg.chunk_size),
            pool: MeshPool::new(atlas_count),
            recycler: MeshRecycler::new(cfg.max_spare_meshes),
            textures: TextureCache::new(),
            warned: WarnOnce::default(),
            decors: Vec::new(),
            generation,
            last_complete: None,
            walk: VoxelWalk::Full,
            stats: TesselatorStats::default(),
            cfg,
            reg,
            atlases,
            rotations,
            services,
        })
    }

    #[inline]
    pub fn config(&self) -> &TesselatorConfig {
        &self.cfg
    }

    #[inline]
    pub fn stats(&self) -> TesselatorStats {
        self.stats
    }

    #[inline]
    pub fn recycler(&self) -> &Arc<MeshRecycler> {
        &self.recycler
    }

    /// Forgets the last completed build so the next edge-only request
    /// rebuilds in full.
    pub fn invalidate(&mut self) {
        self.last_complete = None;
    }

    /// Masks from the last `begin`. Cells outside the last walk are stale.
    #[inline]
    pub fn face_masks(&self) -> &FaceMasks {
        &self.masks
    }

    /// Builds the extended grid and visibility masks for `coord`. Returns
    /// whether anything in the walked region is visible.
    ///
    /// An edge-only request is rebuilt in full unless the previous call
    /// completed for the same chunk data under the current atlas generation.
    pub fn begin_process_chunk(
        &mut self,
        coord: ChunkCoord,
        neighbors: &Neighborhood,
        edge_only: bool,
    ) -> Result<bool, TesselateError> {
        let generation = self.atlases.generation()?;
        self.begin(coord, neighbors, edge_only, generation)
    }

    fn begin(
        &mut self,
        coord: ChunkCoord,
        neighbors: &Neighborhood,
        edge_only: bool,
        generation: u64,
    ) -> Result<bool, TesselateError> {
        self.check_sizes(neighbors)?;
        let reusable = self.generation == generation
            && self
                .last_complete
                .as_ref()
                .is_some_and(|last| last.matches(coord, neighbors));
        let walk = if edge_only && reusable {
            VoxelWalk::Ring
        } else {
            if edge_only {
                self.stats.upgraded += 1;
                log::debug!(
                    target: "tessel::tess",
                    "edge-only request for {} upgraded to full rebuild",
                    coord
                );
            }
            VoxelWalk::Full
        };
        self.last_complete = None;
        self.walk = walk;

        self.grid.build(neighbors, walk == VoxelWalk::Ring);
        let cull = CullEnv {
            reg: &self.reg,
            grid: &self.grid,
            coord,
        };
        let mut any = cull.compute(&mut self.masks, walk, &mut self.warned);
        match neighbors.center() {
            Some(chunk) => {
                decor::collect(chunk, &self.reg, &self.masks, walk, &mut self.decors);
                any |= !self.decors.is_empty();
            }
            None => self.decors.clear(),
        }

        self.last_complete = Some(LastBuild {
            coord,
            center: neighbors.center().cloned(),
        });
        Ok(any)
    }

    fn check_sizes(&self, neighbors: &Neighborhood) -> Result<(), TesselateError> {
        let expected = self.cfg.chunk_size;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(c) = neighbors.get(dx, dy, dz) {
                        if c.size != expected {
                            return Err(TesselateError::ChunkSizeMismatch {
                                coord: c.coord,
                                expected,
                                found: c.size,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Tesselates `coord` into `state`. With `edge_only` (and a reusable
    /// previous build of the same chunk) only the edge partition is rebuilt
    /// and `state.center` is left as is. Returns the state's vertex count.
    pub fn process_chunk(
        &mut self,
        coord: ChunkCoord,
        neighbors: &Neighborhood,
        edge_only: bool,
        state: &mut ChunkMeshState,
    ) -> Result<usize, TesselateError> {
        let t0 = Instant::now();
        let atlases = Arc::clone(&self.atlases);
        let set = atlases.read()?;

        let edge_only = edge_only && state.coord == Some(coord);
        let any = self.begin(coord, neighbors, edge_only, set.generation())?;
        if set.generation() != self.generation {
            log::debug!(
                target: "tessel::tess",
                "atlas generation {} -> {}; resizing pool for {} atlases",
                self.generation,
                set.generation(),
                set.len()
            );
            self.pool.reset(set.len());
            self.textures.clear();
            self.generation = set.generation();
        }

        let walk = self.walk;
        for partition in [Partition::Center, Partition::Edge] {
            if walk.rebuilds(partition) {
                self.pool.clear(partition);
            }
        }
        if any {
            self.emit(coord, &set);
        }

        state.edge = self.pool.assemble(Partition::Edge, set.ids(), &self.recycler);
        if walk == VoxelWalk::Full {
            state.center = self.pool.assemble(Partition::Center, set.ids(), &self.recycler);
        }
        state.coord = Some(coord);
        state.recount();

        self.stats.chunks += 1;
        if walk == VoxelWalk::Ring {
            self.stats.edge_only += 1;
        }
        if !any {
            self.stats.empty += 1;
        }
        self.stats.last_vertices = state.vertex_count;
        self.stats.total_vertices += state.vertex_count as u64;
        log::trace!(
            target: "tessel::tess",
            "us={} tesselate coord={} walk={:?} parts={} verts={}",
            t0.elapsed().as_micros(),
            coord,
            walk,
            state.center.len() + state.edge.len(),
            state.vertex_count
        );
        Ok(state.vertex_count)
    }

    /// Replaces the registered atlas set. Pools resize on their next call.
    pub fn notify_atlases_changed(&self, ids: &[AtlasId]) -> Result<(), TesselateError> {
        self.atlases.set_atlases(ids).map(|_| ())
    }

    fn emit(&mut self, coord: ChunkCoord, set: &AtlasSet) {
        let size = self.cfg.chunk_size;
        let reg: &BlockRegistry = &self.reg;
        let grid = &self.grid;
        let masks = &self.masks;
        let env = EmitEnv {
            reg,
            resolver: &*self.services.textures,
            shapes: &*self.services.shapes,
            atlases: set,
        };
        let binder = Binder {
            reg,
            grid,
            climate: &*self.services.climate,
            coord,
            sea_level: self.cfg.sea_level,
        };
        let mut sink = EmitSink {
            pool: &mut self.pool,
            textures: &mut self.textures,
            warned: &mut self.warned,
            env: &env,
        };
        let mut ctx = EmitContext::new(reg.block(AIR));

        self.walk.for_each(size, |x, y, z| {
            let mi = masks.index(x, y, z);
            let gi = grid.local_index(x, y, z);
            let partition = Partition::of(x, y, z, size);
            for (id, mask) in [(grid.solid[gi], masks.solid[mi]), (grid.fluid[gi], masks.fluid[mi])] {
                if mask == 0 {
                    continue;
                }
                let block = reg.block(id);
                let Some(strategy) = strategy_for(block.draw) else {
                    continue;
                };
                binder.bind_voxel(&mut ctx, block, (x, y, z), mask, partition);
                strategy.emit(&ctx, &mut sink);
            }
        });

        let (bx, by, bz) = coord.world_origin(size);
        for d in &self.decors {
            let decor = reg.block(d.block);
            let Some(strategy) = strategy_for(decor.draw) else {
                continue;
            };
            let (x, y, z) = d.host;
            let host = reg.block(grid.solid[grid.local_index(x, y, z)]);
            let world = (bx + x as i32, by + y as i32, bz + z as i32);
            let placement = decor::placement(&self.rotations, d.key, decor, host, world);
            binder.bind_decor(&mut ctx, decor, d.host, Partition::of(x, y, z, size), placement);
            strategy.emit(&ctx, &mut sink);
        }
    }
}
