//! CPU chunk tesselator: face culling, draw strategies, decors and pooled mesh output.
#![forbid(unsafe_code)]

pub mod atlas;
pub mod constants;
pub mod context;
pub mod decor;
pub mod draw;
pub mod grid;
pub mod pool;
pub mod services;
mod tessellator;
mod util;
pub mod visibility;
pub mod walk;

pub use atlas::{AtlasRegistry, AtlasSet};
pub use context::{ColorMapData, DecorPlacement, EmitContext, EmitSink, Quad, ResolvedTexture};
pub use decor::DecorRotations;
pub use draw::{DrawStrategy, strategy_for};
pub use pool::{ChunkMeshPart, ChunkMeshState, MeshBuffer, MeshPool, MeshRecycler, RecycledMesh};
pub use services::{
    AtlasId, Climate, ClimateSampler, CountingUploader, FlatClimate, GridTextureResolver,
    MeshUploader, ShapeLibrary, ShapeMesh, ShapeQuad, ShapeVoxelizer, TexRect, TextureLocation,
    TextureResolver,
};
pub use tessellator::{
    ChunkTesselator, TesselateError, TesselatorConfig, TesselatorServices, TesselatorStats,
};
pub use walk::{Partition, VoxelWalk};
