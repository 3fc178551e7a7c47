//! Block types, draw types, cull modes and the TOML-backed block registry.
#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod predicates;
pub mod registry;
pub mod types;

pub use catalog::NameCatalog;
pub use predicates::{CullHook, CullPredicate, CullQuery, SnowCover, SnowCoverPredicate};
pub use registry::{BlockRegistry, BlockType, RegistryError};
pub use types::{
    AIR, BlockId, BlockTextures, ColorMapId, CullMode, DrawType, MaterialId, RenderPass,
    TextureId, TextureRole,
};
