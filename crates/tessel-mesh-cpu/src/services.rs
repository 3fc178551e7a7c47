//! Collaborators the mesher consumes, plus small in-process implementations
//! used by tests, benches and the demo driver.

use std::sync::Arc;

use hashbrown::HashMap;
use tessel_blocks::{BlockType, TextureRole};
use tessel_geom::{Face, Vec3};

use crate::pool::ChunkMeshPart;

pub type AtlasId = u32;

/// Sub-rectangle of an atlas in normalized texture coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl TexRect {
    pub const FULL: TexRect = TexRect { u0: 0.0, v0: 0.0, u1: 1.0, v1: 1.0 };

    /// Maps tile-local `(u, v)` in `[0, 1]` into this rectangle.
    #[inline]
    pub fn map(&self, (u, v): (f32, f32)) -> (f32, f32) {
        (
            self.u0 + (self.u1 - self.u0) * u,
            self.v0 + (self.v1 - self.v0) * v,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureLocation {
    pub atlas: AtlasId,
    pub rect: TexRect,
}

pub trait TextureResolver: Send + Sync {
    /// Location of `block`'s texture for `role`, or `None` when unresolvable.
    fn resolve(&self, block: &BlockType, role: TextureRole) -> Option<TextureLocation>;
    /// Placeholder used for anything `resolve` cannot place.
    fn unknown(&self) -> TextureLocation;
}

/// Climate channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Climate {
    pub temperature: f32,
    pub rainfall: f32,
}

pub trait ClimateSampler: Send + Sync {
    fn climate_at(&self, wx: f32, wz: f32) -> Climate;
    /// Shoreline blend weight in `[0, 1]` at a world X/Z corner.
    fn oceanity_at(&self, wx: f32, wz: f32) -> f32;
}

/// One pre-baked quad of a custom shape, authored in cell space `[0, 1]^3`.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeQuad {
    pub corners: [Vec3; 4],
    pub uvs: [(f32, f32); 4],
    pub role: TextureRole,
    /// Axis the quad faces, for lighting and flags; `None` for free-standing quads.
    pub face: Option<Face>,
    /// Dropped when this face of the cell is hidden.
    pub cull_face: Option<Face>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeMesh {
    pub quads: Vec<ShapeQuad>,
}

impl ShapeMesh {
    /// Axis-aligned box; faces lying on the cell boundary get a cull face.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let quads = Face::ALL
            .iter()
            .map(|&face| {
                let corners = crate::draw::box_face(face, min, max);
                let on_boundary = match face {
                    Face::PosY => max.y >= 1.0,
                    Face::NegY => min.y <= 0.0,
                    Face::PosX => max.x >= 1.0,
                    Face::NegX => min.x <= 0.0,
                    Face::PosZ => max.z >= 1.0,
                    Face::NegZ => min.z <= 0.0,
                };
                ShapeQuad {
                    uvs: corners.map(|p| crate::draw::face_uv(face, p)),
                    corners,
                    role: TextureRole::for_face(face),
                    face: Some(face),
                    cull_face: on_boundary.then_some(face),
                }
            })
            .collect();
        ShapeMesh { quads }
    }

    pub fn merged(parts: impl IntoIterator<Item = ShapeMesh>) -> Self {
        ShapeMesh {
            quads: parts.into_iter().flat_map(|p| p.quads).collect(),
        }
    }
}

pub trait ShapeVoxelizer: Send + Sync {
    fn shape_for(&self, block: &BlockType) -> Option<Arc<ShapeMesh>>;
}

/// Receives finished mesh parts, e.g. a GPU upload queue.
pub trait MeshUploader {
    type Handle;

    fn upload(&mut self, part: &ChunkMeshPart) -> Self::Handle;

    fn release(&mut self, _handle: Self::Handle) {}
}

/// Lays textures out on square grids of `columns x columns` tiles, filling
/// atlases in order. Texture ids past the last atlas are unresolvable.
#[derive(Clone, Debug)]
pub struct GridTextureResolver {
    atlases: Vec<AtlasId>,
    columns: u32,
}

impl GridTextureResolver {
    pub fn new(atlases: Vec<AtlasId>, columns: u32) -> Self {
        Self {
            atlases,
            columns: columns.max(1),
        }
    }

    fn tile(&self, slot: u32) -> Option<TextureLocation> {
        let per_atlas = self.columns * self.columns;
        let atlas = *self.atlases.get((slot / per_atlas) as usize)?;
        let local = slot % per_atlas;
        let size = 1.0 / self.columns as f32;
        let (cx, cy) = ((local % self.columns) as f32, (local / self.columns) as f32);
        Some(TextureLocation {
            atlas,
            rect: TexRect {
                u0: cx * size,
                v0: cy * size,
                u1: (cx + 1.0) * size,
                v1: (cy + 1.0) * size,
            },
        })
    }
}

impl TextureResolver for GridTextureResolver {
    fn resolve(&self, block: &BlockType, role: TextureRole) -> Option<TextureLocation> {
        let id = block.texture(role).0;
        if id == 0 {
            return None;
        }
        // Slot 0 of the first atlas is the placeholder.
        self.tile(u32::from(id))
    }

    fn unknown(&self) -> TextureLocation {
        self.tile(0).unwrap_or(TextureLocation {
            atlas: 0,
            rect: TexRect::FULL,
        })
    }
}

/// The same climate everywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatClimate {
    pub climate: Climate,
    pub oceanity: f32,
}

impl ClimateSampler for FlatClimate {
    fn climate_at(&self, _wx: f32, _wz: f32) -> Climate {
        self.climate
    }

    fn oceanity_at(&self, _wx: f32, _wz: f32) -> f32 {
        self.oceanity
    }
}

/// Shapes registered by shape key.
#[derive(Clone, Debug, Default)]
pub struct ShapeLibrary {
    shapes: HashMap<String, Arc<ShapeMesh>>,
}

impl ShapeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, mesh: ShapeMesh) {
        self.shapes.insert(key.into(), Arc::new(mesh));
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl ShapeVoxelizer for ShapeLibrary {
    fn shape_for(&self, block: &BlockType) -> Option<Arc<ShapeMesh>> {
        self.shapes.get(&block.shape_key).cloned()
    }
}

/// Counts uploads; handles are sequence numbers.
#[derive(Debug, Default)]
pub struct CountingUploader {
    pub uploads: u64,
    pub released: u64,
    pub vertices: u64,
}

impl MeshUploader for CountingUploader {
    type Handle = u64;

    fn upload(&mut self, part: &ChunkMeshPart) -> u64 {
        self.uploads += 1;
        self.vertices += part.vertex_count() as u64;
        self.uploads
    }

    fn release(&mut self, _handle: u64) {
        self.released += 1;
    }
}
