use hashbrown::HashSet;
use tessel_blocks::BlockId;
use tessel_geom::Vec3;

use crate::constants::{CLIMATE_JITTER, RANDOM_OFFSET_MAX};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum WarnKind {
    Texture,
    Shape,
    CullPredicate,
    OverlayBlock,
}

/// Remembers which (problem, block) pairs were already logged.
#[derive(Debug, Default)]
pub(crate) struct WarnOnce {
    seen: HashSet<(WarnKind, BlockId)>,
}

impl WarnOnce {
    /// True the first time `(kind, block)` is reported.
    #[inline]
    pub(crate) fn first(&mut self, kind: WarnKind, block: BlockId) -> bool {
        self.seen.insert((kind, block))
    }
}

/// Stable 32-bit hash of a world position and a salt.
#[inline]
pub(crate) fn hash3(x: i32, y: i32, z: i32, salt: u32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x8DA6_B343)
        ^ (y as u32).wrapping_mul(0xD816_3841)
        ^ (z as u32).wrapping_mul(0xCB1A_B31F)
        ^ salt.wrapping_mul(0x1656_67B1);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h = h.wrapping_mul(0x297A_2D39);
    h ^ (h >> 15)
}

/// Maps a hash to `[-1, 1]`.
#[inline]
fn unit(h: u32) -> f32 {
    (h & 0xFFFF) as f32 / 32767.5 - 1.0
}

/// Horizontal draw offset for blocks with `random_offset`.
#[inline]
pub(crate) fn random_offset(wx: i32, wy: i32, wz: i32) -> Vec3 {
    Vec3::new(
        unit(hash3(wx, wy, wz, 1)) * RANDOM_OFFSET_MAX,
        0.0,
        unit(hash3(wx, wy, wz, 2)) * RANDOM_OFFSET_MAX,
    )
}

/// Offset in X/Z at which the climate map is sampled for a voxel.
#[inline]
pub(crate) fn climate_jitter(wx: i32, wy: i32, wz: i32) -> (f32, f32) {
    (
        unit(hash3(wx, wy, wz, 3)) * CLIMATE_JITTER,
        unit(hash3(wx, wy, wz, 4)) * CLIMATE_JITTER,
    )
}
