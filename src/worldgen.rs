use std::sync::Arc;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use tessel_blocks::{AIR, BlockId, BlockRegistry, CullMode, CullPredicate, CullQuery, RegistryError, SnowCover};
use tessel_chunk::{ChunkCoord, ChunkData};
use tessel_geom::Face;

use crate::config::WorldConfig;

/// Heightmap shared by the generator and the climate map.
pub struct Terrain {
    noise: FastNoiseLite,
    min_h: i32,
    max_h: i32,
}

impl Terrain {
    pub fn new(seed: i32, cfg: &WorldConfig, world_height: i32) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(cfg.frequency));
        Self {
            noise,
            min_h: (world_height as f32 * cfg.min_y_ratio) as i32,
            max_h: (world_height as f32 * cfg.max_y_ratio) as i32,
        }
    }

    /// Continuous surface height; used where a smooth value is wanted.
    pub fn height_f(&self, wx: f32, wz: f32) -> f32 {
        let h = self.noise.get_noise_2d(wx, wz);
        // map [-1,1] -> [min_h, max_h]
        (h + 1.0) * 0.5 * (self.max_h - self.min_h) as f32 + self.min_h as f32
    }

    /// Number of filled cells in the column.
    pub fn height_at(&self, wx: i32, wz: i32) -> i32 {
        (self.height_f(wx as f32, wz as f32) as i32).max(1)
    }
}

// splitmix-style integer hash for scatter decisions
fn hash3(seed: i32, x: i32, y: i32, z: i32) -> u32 {
    let mut h = (seed as u32).wrapping_mul(0x9E37_79B9)
        ^ (x as u32).wrapping_mul(0x85EB_CA6B)
        ^ (y as u32).wrapping_mul(0xC2B2_AE35)
        ^ (z as u32).wrapping_mul(0x27D4_EB2F);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h = h.wrapping_mul(0x297A_2D39);
    h ^ (h >> 15)
}

fn chance(h: u32) -> f32 {
    (h >> 8) as f32 / (1u32 << 24) as f32
}

struct Palette {
    stone: BlockId,
    dirt: BlockId,
    grass: BlockId,
    sand: BlockId,
    snow: BlockId,
    snow_layer: BlockId,
    water: BlockId,
    tallgrass: BlockId,
    fern: BlockId,
    reeds: BlockId,
    lantern: BlockId,
    moss: BlockId,
    lichen: BlockId,
}

impl Palette {
    fn resolve(reg: &BlockRegistry) -> Self {
        let id = |name: &str| match reg.id_by_name(name) {
            Some(id) => id,
            None => {
                log::warn!("worldgen: block `{}` not defined; using air", name);
                AIR
            }
        };
        Self {
            stone: id("stone"),
            dirt: id("dirt"),
            grass: id("grass"),
            sand: id("sand"),
            snow: id("snow"),
            snow_layer: id("snow_layer"),
            water: id("water"),
            tallgrass: id("tallgrass"),
            fern: id("fern"),
            reeds: id("reeds"),
            lantern: id("lantern"),
            moss: id("moss"),
            lichen: id("lichen"),
        }
    }
}

/// Rolling heightmap world: stone under a few layers of dirt, grass, sand
/// near the water line and snow above the snow line; scatters plants,
/// lanterns, reeds in shallow water and surface decors.
pub struct WorldGen {
    terrain: Terrain,
    cfg: WorldConfig,
    palette: Palette,
    seed: i32,
    sea_level: i32,
    snow_line: i32,
}

impl WorldGen {
    pub fn new(reg: &BlockRegistry, seed: i32, sea_level: i32, world_height: i32, cfg: &WorldConfig) -> Self {
        Self {
            terrain: Terrain::new(seed, cfg, world_height),
            cfg: cfg.clone(),
            palette: Palette::resolve(reg),
            seed,
            sea_level,
            snow_line: snow_line(cfg, world_height),
        }
    }

    fn top_block(&self, h: i32) -> BlockId {
        let p = &self.palette;
        if h >= self.snow_line {
            p.snow
        } else if h <= self.sea_level + 1 {
            p.sand
        } else {
            p.grass
        }
    }

    fn fill_block(&self, h: i32, wy: i32) -> BlockId {
        let p = &self.palette;
        if wy == h - 1 {
            self.top_block(h)
        } else if wy + self.cfg.topsoil_thickness >= h {
            if h <= self.sea_level + 1 { p.sand } else { p.dirt }
        } else {
            p.stone
        }
    }

    pub fn generate(&self, coord: ChunkCoord, size: usize) -> ChunkData {
        let p = &self.palette;
        let (bx, by, bz) = coord.world_origin(size);
        let mut chunk = ChunkData::empty(coord, size);
        for z in 0..size {
            for x in 0..size {
                let (wx, wz) = (bx + x as i32, bz + z as i32);
                let h = self.terrain.height_at(wx, wz);
                for y in 0..size {
                    let wy = by + y as i32;
                    if wy < h {
                        chunk.set_solid(x, y, z, self.fill_block(h, wy));
                    } else if wy < self.sea_level {
                        chunk.set_fluid(x, y, z, p.water);
                    }
                }
                // cell directly above the surface
                let above = h - by;
                if (0..size as i32).contains(&above) {
                    self.scatter_surface(&mut chunk, (x, above as usize, z), (wx, h, wz));
                }
                let top = h - 1 - by;
                if (0..size as i32).contains(&top) {
                    self.scatter_decors(&mut chunk, (x, top as usize, z), (wx, h - 1, wz), h);
                }
            }
        }
        chunk
    }

    fn scatter_surface(&self, chunk: &mut ChunkData, (x, y, z): (usize, usize, usize), (wx, wy, wz): (i32, i32, i32)) {
        let p = &self.palette;
        let roll = chance(hash3(self.seed, wx, wy, wz));
        if wy >= self.snow_line {
            chunk.set_solid(x, y, z, p.snow_layer);
        } else if wy < self.sea_level {
            if wy + 2 >= self.sea_level && roll < self.cfg.plant_density {
                chunk.set_solid(x, y, z, p.reeds);
            }
        } else if wy > self.sea_level + 1 {
            if roll < 0.004 {
                chunk.set_solid(x, y, z, p.lantern);
            } else if roll < self.cfg.plant_density {
                let plant = if wy + 4 >= self.snow_line { p.fern } else { p.tallgrass };
                chunk.set_solid(x, y, z, plant);
            }
        }
    }

    fn scatter_decors(&self, chunk: &mut ChunkData, cell: (usize, usize, usize), (wx, wy, wz): (i32, i32, i32), h: i32) {
        let p = &self.palette;
        let hash = hash3(self.seed ^ 0x5bd1, wx, wy, wz);
        if chance(hash) >= self.cfg.moss_density {
            return;
        }
        let (u, v) = ((hash & 15) as u8, ((hash >> 4) & 15) as u8);
        let rotation = ((hash >> 24) & 3) as u8;
        if h > self.sea_level + 1 && h < self.snow_line {
            chunk.add_decor(cell, Face::PosY, (u, v), rotation, p.moss);
        }
        // lichen on a cliff side facing a lower neighbor column
        for face in Face::HORIZONTAL {
            let (dx, _, dz) = face.delta();
            if self.terrain.height_at(wx + dx, wz + dz) + 1 < h {
                chunk.add_decor(cell, face, (u, v), rotation, p.lichen);
                break;
            }
        }
    }
}

struct SelfOrOpaque(BlockId);

impl CullPredicate for SelfOrOpaque {
    fn cull(&self, q: &CullQuery<'_>) -> bool {
        q.neighbor.id == self.0 || q.neighbor.side_opaque(q.face.opposite())
    }
}

fn snow_line(cfg: &WorldConfig, world_height: i32) -> i32 {
    (world_height as f32 * cfg.snow_threshold) as i32
}

/// Installs runtime predicates for every block whose config defers to one:
/// `snow_cover = "callback"` blocks carry snow above the snow line, and
/// `cull = "callback"` blocks hide faces against themselves or an opaque side.
pub fn install_predicates(reg: &mut BlockRegistry, cfg: &WorldConfig, world_height: i32) -> Result<(), RegistryError> {
    let line = snow_line(cfg, world_height);
    let snow: Vec<String> = reg
        .blocks
        .iter()
        .filter(|b| matches!(b.snow_cover, SnowCover::Pending))
        .map(|b| b.name.clone())
        .collect();
    for name in snow {
        reg.set_snow_predicate(&name, Arc::new(move |_wx: i32, wy: i32, _wz: i32| wy >= line))?;
    }
    let callbacks: Vec<(String, BlockId)> = reg
        .blocks
        .iter()
        .filter(|b| b.cull == CullMode::Callback)
        .map(|b| (b.name.clone(), b.id))
        .collect();
    for (name, id) in callbacks {
        reg.set_cull_predicate(&name, Arc::new(SelfOrOpaque(id)))?;
    }
    Ok(())
}
