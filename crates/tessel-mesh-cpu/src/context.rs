use std::marker::PhantomData;
use std::sync::Arc;

use hashbrown::HashMap;
use tessel_blocks::{BlockId, BlockRegistry, BlockType, DrawType, RenderPass, TextureRole};
use tessel_chunk::ChunkCoord;
use tessel_geom::{Face, Mat3, Vec3};

use crate::atlas::AtlasSet;
use crate::constants::{
    FLAG_FACE_NONE, FLAG_LIQUID, FLAG_NUDGE_SHIFT, FLAG_WIND, RAINFALL_LAPSE, TEMPERATURE_LAPSE,
};
use crate::grid::ExtendedGrid;
use crate::pool::{MeshPool, QuadAttrs};
use crate::services::{ClimateSampler, ShapeMesh, ShapeVoxelizer, TexRect, TextureResolver};
use crate::util::{WarnKind, WarnOnce, climate_jitter, random_offset};
use crate::walk::Partition;

/// Index of the voxel's own cell in `EmitContext::light`.
pub(crate) const OWN_LIGHT: usize = 6;

/// Per-vertex color-map selector: season map id, climate map id, and the
/// altitude-adjusted temperature and rainfall, one byte each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorMapData(pub u32);

impl ColorMapData {
    pub fn pack(season_map: u8, climate_map: u8, temperature: f32, rainfall: f32) -> Self {
        let t = (temperature.clamp(0.0, 1.0) * 255.0).round() as u32;
        let r = (rainfall.clamp(0.0, 1.0) * 255.0).round() as u32;
        ColorMapData(u32::from(season_map) | u32::from(climate_map) << 8 | t << 16 | r << 24)
    }

    #[inline]
    pub fn season_map(self) -> u8 {
        self.0 as u8
    }
    #[inline]
    pub fn climate_map(self) -> u8 {
        (self.0 >> 8) as u8
    }
    #[inline]
    pub fn temperature(self) -> u8 {
        (self.0 >> 16) as u8
    }
    #[inline]
    pub fn rainfall(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

/// A texture resolved to a pool atlas index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedTexture {
    pub atlas: usize,
    pub rect: TexRect,
}

/// Where and how a decor is drawn. Decor geometry is authored facing +Y;
/// `offset` applies in that authored space before `rotation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecorPlacement {
    pub face: Face,
    pub rotation: Mat3,
    pub offset: Vec3,
    pub nudge: u8,
}

/// The "current voxel" record, rebound for every voxel and decor entry.
/// Single writer; not `Send`.
pub struct EmitContext<'a> {
    pub block: &'a BlockType,
    pub world: (i32, i32, i32),
    pub local: (usize, usize, usize),
    /// Padded grid index of the cell.
    pub cell: usize,
    pub mask: u8,
    pub partition: Partition,
    pub lod: usize,
    /// Chunk-local corner of the cell geometry is placed in.
    pub origin: Vec3,
    pub jitter: Vec3,
    pub color_map: ColorMapData,
    /// Packed RGBA light per face (light of the cell across it), then the own cell.
    pub light: [[u8; 4]; 7],
    /// Top-corner shoreline weights in `box_face(PosY)` corner order.
    pub oceanity: [f32; 4],
    pub liquid_above: bool,
    pub snow: bool,
    pub decor: Option<DecorPlacement>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> EmitContext<'a> {
    pub fn new(block: &'a BlockType) -> Self {
        Self {
            block,
            world: (0, 0, 0),
            local: (0, 0, 0),
            cell: 0,
            mask: 0,
            partition: Partition::Center,
            lod: 0,
            origin: Vec3::ZERO,
            jitter: Vec3::ZERO,
            color_map: ColorMapData::default(),
            light: [[0; 4]; 7],
            oceanity: [0.0; 4],
            liquid_above: false,
            snow: false,
            decor: None,
            _not_send: PhantomData,
        }
    }

    /// Maps an authored cell-space point into chunk-local space.
    #[inline]
    pub fn place(&self, p: Vec3) -> Vec3 {
        let q = match &self.decor {
            Some(d) => d.rotation.transform_about_center(p + d.offset),
            None => p,
        };
        self.origin + self.jitter + q
    }
}

/// Binds context fields that depend on the grid and the climate map.
pub(crate) struct Binder<'a> {
    pub reg: &'a BlockRegistry,
    pub grid: &'a ExtendedGrid,
    pub climate: &'a dyn ClimateSampler,
    pub coord: ChunkCoord,
    pub sea_level: i32,
}

impl<'a> Binder<'a> {
    /// Binds a voxel's `block` at local `(x, y, z)` with visibility `mask`.
    pub(crate) fn bind_voxel(
        &self,
        ctx: &mut EmitContext<'a>,
        block: &'a BlockType,
        (x, y, z): (usize, usize, usize),
        mask: u8,
        partition: Partition,
    ) {
        let (bx, by, bz) = self.coord.world_origin(self.grid.size());
        let world = (bx + x as i32, by + y as i32, bz + z as i32);
        let cell = self.grid.local_index(x, y, z);
        ctx.block = block;
        ctx.world = world;
        ctx.local = (x, y, z);
        ctx.cell = cell;
        ctx.mask = mask;
        ctx.partition = partition;
        ctx.lod = usize::from(block.lod);
        ctx.origin = Vec3::new(x as f32, y as f32, z as f32);
        ctx.jitter = if block.random_offset {
            random_offset(world.0, world.1, world.2)
        } else {
            Vec3::ZERO
        };
        ctx.decor = None;
        self.bind_light(ctx, cell);
        ctx.color_map = self.color_map(block, world);
        let up = self.grid.neighbor(cell, Face::PosY);
        ctx.liquid_above = self.reg.block(self.grid.fluid[up]).draw.is_liquid();
        ctx.snow = block.draw.is_snow_overlay() && block.allows_snow(world.0, world.1, world.2);
        let has_surface = block.draw == DrawType::Liquid || block.draw.is_water_surface_overlay();
        ctx.oceanity = if has_surface
            && world.1 == self.sea_level - 1
            && mask & Face::PosY.bit() != 0
        {
            self.oceanity(cell, world)
        } else {
            [0.0; 4]
        };
    }

    /// Binds decor `block` attached to `face` of the host cell at local
    /// `(x, y, z)`. Geometry lands in the cell across `face`.
    pub(crate) fn bind_decor(
        &self,
        ctx: &mut EmitContext<'a>,
        block: &'a BlockType,
        host: (usize, usize, usize),
        partition: Partition,
        placement: DecorPlacement,
    ) {
        let (x, y, z) = host;
        let (bx, by, bz) = self.coord.world_origin(self.grid.size());
        let world = (bx + x as i32, by + y as i32, bz + z as i32);
        let host_cell = self.grid.local_index(x, y, z);
        let (dx, dy, dz) = placement.face.delta();
        let cell = self.grid.neighbor(host_cell, placement.face);
        ctx.block = block;
        ctx.world = world;
        ctx.local = host;
        ctx.cell = cell;
        ctx.mask = Face::PosY.bit();
        ctx.partition = partition;
        ctx.lod = 0;
        ctx.origin = Vec3::new((x as i32 + dx) as f32, (y as i32 + dy) as f32, (z as i32 + dz) as f32);
        ctx.jitter = Vec3::ZERO;
        ctx.decor = Some(placement);
        // `cell` may be a halo cell with no neighbors of its own; decor
        // quads only read the light of the cell they sit in.
        ctx.light = [self.grid.light[cell].to_rgba(); 7];
        ctx.color_map = self.color_map(block, world);
        ctx.liquid_above = false;
        ctx.snow = false;
        ctx.oceanity = [0.0; 4];
    }

    fn bind_light(&self, ctx: &mut EmitContext<'a>, cell: usize) {
        for face in Face::ALL {
            ctx.light[face.index()] = self.grid.light[self.grid.neighbor(cell, face)].to_rgba();
        }
        ctx.light[OWN_LIGHT] = self.grid.light[cell].to_rgba();
    }

    fn color_map(&self, block: &BlockType, (wx, wy, wz): (i32, i32, i32)) -> ColorMapData {
        if !block.has_color_map() {
            return ColorMapData::default();
        }
        let (jx, jz) = climate_jitter(wx, wy, wz);
        let c = self.climate.climate_at(wx as f32 + jx, wz as f32 + jz);
        let altitude = (wy - self.sea_level).max(0) as f32;
        ColorMapData::pack(
            block.season_map.0,
            block.climate_map.0,
            c.temperature - altitude * TEMPERATURE_LAPSE,
            c.rainfall - altitude * RAINFALL_LAPSE,
        )
    }

    /// A corner qualifies when the three horizontal cells sharing it hold
    /// open liquid.
    fn oceanity(&self, cell: usize, (wx, _, wz): (i32, i32, i32)) -> [f32; 4] {
        const CORNERS: [(i32, i32); 4] = [(0, 0), (0, 1), (1, 1), (1, 0)];
        CORNERS.map(|(cx, cz)| {
            let sx = if cx == 0 { -1 } else { 1 };
            let sz = if cz == 0 { -1 } else { 1 };
            let open = [(sx, 0), (0, sz), (sx, sz)].iter().all(|&(dx, dz)| {
                let n = self.grid.offset(cell, dx, 0, dz);
                self.reg.block(self.grid.fluid[n]).draw.is_liquid()
                    && !self.reg.block(self.grid.solid[n]).draw.is_full_cube()
            });
            if open {
                self.climate
                    .oceanity_at((wx + cx) as f32, (wz + cz) as f32)
                    .clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
    }
}

/// One quad in authored cell space.
#[derive(Clone, Copy, Debug)]
pub struct Quad {
    pub corners: [Vec3; 4],
    /// Tile-local texture coordinates in `[0, 1]`.
    pub uvs: [(f32, f32); 4],
    /// Axis the quad faces; selects light and the face flag.
    pub face: Option<Face>,
    pub pass: RenderPass,
    pub texture: Option<ResolvedTexture>,
    pub liquid: bool,
    pub custom: [f32; 4],
}

pub(crate) type TextureCache = HashMap<(BlockId, TextureRole), Option<ResolvedTexture>>;

/// Shared read-only services for one tesselation.
pub(crate) struct EmitEnv<'a> {
    pub reg: &'a BlockRegistry,
    pub resolver: &'a dyn TextureResolver,
    pub shapes: &'a dyn ShapeVoxelizer,
    pub atlases: &'a AtlasSet,
}

/// Destination of strategy output: resolves textures and shapes and writes
/// transformed quads into the pool bucket the context selects.
pub struct EmitSink<'a> {
    pub(crate) pool: &'a mut MeshPool,
    pub(crate) textures: &'a mut TextureCache,
    pub(crate) warned: &'a mut WarnOnce,
    pub(crate) env: &'a EmitEnv<'a>,
}

impl<'a> EmitSink<'a> {
    #[inline]
    pub fn registry(&self) -> &'a BlockRegistry {
        self.env.reg
    }

    pub fn texture(&mut self, block: &BlockType, role: TextureRole) -> Option<ResolvedTexture> {
        if let Some(hit) = self.textures.get(&(block.id, role)) {
            return *hit;
        }
        let atlases = self.env.atlases;
        let found = self.env.resolver.resolve(block, role).and_then(|loc| {
            atlases.index_of(loc.atlas).map(|atlas| ResolvedTexture { atlas, rect: loc.rect })
        });
        let resolved = match found {
            Some(t) => Some(t),
            None => {
                if self.warned.first(WarnKind::Texture, block.id) {
                    log::warn!(
                        target: "tessel::tess",
                        "no texture for block `{}` ({:?}); using placeholder",
                        block.name,
                        role
                    );
                }
                self.unknown_texture()
            }
        };
        self.textures.insert((block.id, role), resolved);
        resolved
    }

    pub fn unknown_texture(&self) -> Option<ResolvedTexture> {
        let loc = self.env.resolver.unknown();
        self.env
            .atlases
            .index_of(loc.atlas)
            .map(|atlas| ResolvedTexture { atlas, rect: loc.rect })
    }

    pub fn shape(&mut self, block: &BlockType) -> Option<Arc<ShapeMesh>> {
        let shape = self.env.shapes.shape_for(block);
        if shape.is_none() && self.warned.first(WarnKind::Shape, block.id) {
            log::warn!(
                target: "tessel::tess",
                "no shape `{}` for block `{}`; drawing a placeholder cube",
                block.shape_key,
                block.name
            );
        }
        shape
    }

    /// Looks up a registry-level overlay block (snow, water), warning once if unset.
    pub fn overlay_block(&mut self, id: Option<BlockId>, owner: &BlockType) -> Option<&'a BlockType> {
        let reg = self.env.reg;
        match id {
            Some(id) => reg.get(id),
            None => {
                if self.warned.first(WarnKind::OverlayBlock, owner.id) {
                    log::warn!(
                        target: "tessel::tess",
                        "block `{}` needs an overlay block the registry does not name",
                        owner.name
                    );
                }
                None
            }
        }
    }

    pub fn quad(&mut self, ctx: &EmitContext<'_>, q: &Quad) {
        let Some(tex) = q.texture else {
            return;
        };
        let (light, face_flag) = match (&ctx.decor, q.face) {
            (Some(d), _) => (ctx.light[OWN_LIGHT], d.face.index() as u32),
            (None, Some(f)) => (ctx.light[f.index()], f.index() as u32),
            (None, None) => (ctx.light[OWN_LIGHT], FLAG_FACE_NONE),
        };
        let mut flags = face_flag;
        if ctx.block.wind_wave {
            flags |= FLAG_WIND;
        }
        if q.liquid {
            flags |= FLAG_LIQUID;
        }
        if let Some(d) = &ctx.decor {
            flags |= u32::from(d.nudge & 0x3) << FLAG_NUDGE_SHIFT;
        }
        let corners = q.corners.map(|p| ctx.place(p));
        let uvs = q.uvs.map(|uv| tex.rect.map(uv));
        self.pool
            .buffer_mut(ctx.partition, ctx.lod, q.pass, tex.atlas)
            .push_quad(
                corners,
                uvs,
                q.custom,
                QuadAttrs {
                    rgba: light,
                    flags,
                    color_map: ctx.color_map.0,
                },
            );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tessel_chunk::{ChunkData, Neighborhood};

    use super::*;
    use crate::services::{Climate, FlatClimate};

    #[test]
    fn color_map_packing() {
        let c = ColorMapData::pack(2, 5, 1.0, 0.5);
        assert_eq!(c.season_map(), 2);
        assert_eq!(c.climate_map(), 5);
        assert_eq!(c.temperature(), 255);
        assert_eq!(c.rainfall(), 128);
        assert_eq!(ColorMapData::pack(0, 0, -3.0, 9.0).rainfall(), 255);
    }

    const BLOCKS: &str = r#"
[[blocks]]
name = "water"
draw = "liquid"

[[blocks]]
name = "grass_tuft"
draw = "cross"
climate_map = "grass"
season_map = "seasons"
random_offset = true
"#;

    const CLIMATE: FlatClimate = FlatClimate {
        climate: Climate {
            temperature: 0.5,
            rainfall: 0.25,
        },
        oceanity: 0.75,
    };

    fn grid(chunk: ChunkData) -> ExtendedGrid {
        let mut g = ExtendedGrid::new(chunk.size);
        g.build(&Neighborhood::new(Some(Arc::new(chunk))), false);
        g
    }

    #[test]
    fn oceanity_marks_corners_with_open_water_around() {
        let reg = BlockRegistry::from_toml_str(BLOCKS).unwrap();
        let water = reg.id_by_name("water").unwrap();
        let mut chunk = ChunkData::empty(ChunkCoord::default(), 4);
        for x in 0..3 {
            for z in 0..3 {
                chunk.set_fluid(x, 1, z, water);
                chunk.set_fluid(x, 0, z, water);
            }
        }
        let grid = grid(chunk);
        let binder = Binder {
            reg: &reg,
            grid: &grid,
            climate: &CLIMATE,
            coord: ChunkCoord::default(),
            sea_level: 2,
        };
        let block = reg.block(water);
        let mut ctx = EmitContext::new(block);
        let top = Face::PosY.bit();

        binder.bind_voxel(&mut ctx, block, (1, 1, 1), top, Partition::Center);
        assert_eq!(ctx.oceanity, [0.75; 4]);
        // only the +X+Z corner has water on all three sides
        binder.bind_voxel(&mut ctx, block, (0, 1, 0), top, Partition::Edge);
        assert_eq!(ctx.oceanity, [0.0, 0.0, 0.75, 0.0]);
        // one below sea_level - 1
        binder.bind_voxel(&mut ctx, block, (1, 0, 1), top, Partition::Center);
        assert_eq!(ctx.oceanity, [0.0; 4]);
        // hidden top
        binder.bind_voxel(&mut ctx, block, (1, 1, 1), Face::PosX.bit(), Partition::Center);
        assert_eq!(ctx.oceanity, [0.0; 4]);
    }

    #[test]
    fn color_map_and_jitter_follow_world_position() {
        let reg = BlockRegistry::from_toml_str(BLOCKS).unwrap();
        let tuft = reg.block(reg.id_by_name("grass_tuft").unwrap());
        let coord = ChunkCoord::new(1, 0, -1);
        let grid = grid(ChunkData::empty(coord, 4));
        let binder = Binder {
            reg: &reg,
            grid: &grid,
            climate: &CLIMATE,
            coord,
            sea_level: 0,
        };
        let mut ctx = EmitContext::new(tuft);

        // world (4, 0, -4) sits at sea level: no altitude lapse
        binder.bind_voxel(&mut ctx, tuft, (0, 0, 0), Face::PosY.bit(), Partition::Edge);
        assert_eq!(ctx.world, (4, 0, -4));
        assert_eq!(ctx.jitter, random_offset(4, 0, -4));
        assert_eq!(
            ctx.color_map,
            ColorMapData::pack(tuft.season_map.0, tuft.climate_map.0, 0.5, 0.25)
        );
        assert_eq!(ctx.color_map.temperature(), 128);
        assert_eq!(ctx.color_map.rainfall(), 64);
        assert_ne!(ctx.color_map.climate_map(), ctx.color_map.season_map());

        // three blocks up the climate is colder and drier
        binder.bind_voxel(&mut ctx, tuft, (0, 3, 0), Face::PosY.bit(), Partition::Edge);
        assert_eq!(ctx.jitter, random_offset(4, 3, -4));
        assert_eq!(
            ctx.color_map,
            ColorMapData::pack(
                tuft.season_map.0,
                tuft.climate_map.0,
                0.5 - 3.0 * TEMPERATURE_LAPSE,
                0.25 - 3.0 * RAINFALL_LAPSE
            )
        );

        let water = reg.block(reg.id_by_name("water").unwrap());
        binder.bind_voxel(&mut ctx, water, (1, 1, 1), Face::PosY.bit(), Partition::Center);
        assert_eq!(ctx.jitter, Vec3::ZERO);
        assert_eq!(ctx.color_map, ColorMapData::default());
    }
}
