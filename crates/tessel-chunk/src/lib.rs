//! Chunk storage, decor keys and neighbor lookup for the mesher.
#![forbid(unsafe_code)]

mod coord;
mod data;
mod decor;
mod neighborhood;

pub use coord::ChunkCoord;
pub use data::{ChunkData, PackedLight};
pub use decor::DecorKey;
pub use neighborhood::{ChunkProvider, MapChunkProvider, Neighborhood};

/// Largest chunk edge whose local indices fit a `DecorKey`.
pub const MAX_CHUNK_SIZE: usize = 32;
