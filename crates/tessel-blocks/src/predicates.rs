use std::fmt;
use std::sync::Arc;

use tessel_geom::Face;

use crate::registry::BlockType;

/// Inputs handed to a block's cull callback for one face.
pub struct CullQuery<'a> {
    pub face: Face,
    pub neighbor: &'a BlockType,
    /// Index of the current voxel in the mesher's padded grid.
    pub flat_index: usize,
}

/// Block-specific face culling rule for `CullMode::Callback` blocks.
/// Returns `true` when the face should be hidden.
pub trait CullPredicate: Send + Sync {
    fn cull(&self, query: &CullQuery<'_>) -> bool;
}

impl<F> CullPredicate for F
where
    F: Fn(&CullQuery<'_>) -> bool + Send + Sync,
{
    #[inline]
    fn cull(&self, query: &CullQuery<'_>) -> bool {
        self(query)
    }
}

/// Decides whether snow may cover a block at a world position.
pub trait SnowCoverPredicate: Send + Sync {
    fn allows_snow(&self, wx: i32, wy: i32, wz: i32) -> bool;
}

impl<F> SnowCoverPredicate for F
where
    F: Fn(i32, i32, i32) -> bool + Send + Sync,
{
    #[inline]
    fn allows_snow(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self(wx, wy, wz)
    }
}

#[derive(Clone)]
pub struct CullHook(pub Arc<dyn CullPredicate>);

impl fmt::Debug for CullHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CullHook(..)")
    }
}

#[derive(Clone, Default)]
pub enum SnowCover {
    #[default]
    Always,
    Never,
    /// Configured as `callback` but no predicate registered yet; treated as `Always`.
    Pending,
    Predicate(Arc<dyn SnowCoverPredicate>),
}

impl SnowCover {
    #[inline]
    pub fn allows(&self, wx: i32, wy: i32, wz: i32) -> bool {
        match self {
            SnowCover::Always | SnowCover::Pending => true,
            SnowCover::Never => false,
            SnowCover::Predicate(p) => p.allows_snow(wx, wy, wz),
        }
    }
}

impl fmt::Debug for SnowCover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnowCover::Always => f.write_str("Always"),
            SnowCover::Never => f.write_str("Never"),
            SnowCover::Pending => f.write_str("Pending"),
            SnowCover::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
