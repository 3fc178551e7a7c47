use tessel_blocks::{BlockId, BlockRegistry, BlockType, DrawType};
use tessel_chunk::{ChunkData, DecorKey};
use tessel_geom::{Axis, Face, Mat3, Vec3};

use crate::constants::{DECOR_LIFT, DECOR_NUDGE_STEP, HEIGHT_STEPS, SUB_POSITION_STEPS};
use crate::context::DecorPlacement;
use crate::visibility::FaceMasks;
use crate::walk::{VoxelWalk, is_ring};

/// Decor rotation for every (face, quarter-turn step) pair.
///
/// Floors turn about +Y, walls about their own normal, and ceilings turn
/// the other way so a step reads the same seen from below.
#[derive(Clone, Debug)]
pub struct DecorRotations {
    table: [[Mat3; 4]; 6],
}

impl DecorRotations {
    pub fn new() -> Self {
        let table = std::array::from_fn(|fi| {
            let face = Face::ALL[fi];
            std::array::from_fn(|step| {
                let step = step as u8;
                let turn = if face == Face::NegY { (4 - step) % 4 } else { step };
                face.align_from_up() * Mat3::quarter_turns(Axis::Y, turn)
            })
        });
        Self { table }
    }

    #[inline]
    pub fn get(&self, face: Face, step: u8) -> Mat3 {
        self.table[face.index()][usize::from(step & 3)]
    }
}

impl Default for DecorRotations {
    fn default() -> Self {
        Self::new()
    }
}

/// A decor that passed culling, ready to bind.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DrawnDecor {
    pub key: DecorKey,
    pub block: BlockId,
    pub host: (usize, usize, usize),
}

/// Collects decors whose host face is visible, in key order. A `Ring` walk
/// keeps only decors hosted in the chunk's outer ring.
pub(crate) fn collect(
    chunk: &ChunkData,
    reg: &BlockRegistry,
    masks: &FaceMasks,
    walk: VoxelWalk,
    out: &mut Vec<DrawnDecor>,
) {
    out.clear();
    let size = chunk.size;
    for (&key, &block) in &chunk.decors {
        let index = key.index();
        if index >= size * size * size {
            continue;
        }
        let (x, y, z) = chunk.local_of(index);
        if walk == VoxelWalk::Ring && !is_ring(x, y, z, size) {
            continue;
        }
        let decor = reg.block(block);
        if decor.is_air() {
            continue;
        }
        let host_mask = masks.solid[masks.index(x, y, z)];
        if host_mask & key.face().bit() != 0 || decor.decor_always_visible {
            out.push(DrawnDecor {
                key,
                block,
                host: (x, y, z),
            });
        }
    }
}

/// Placement of `decor` attached at `key` to `host`, a block at world `(wx, wy, wz)`.
pub(crate) fn placement(
    rotations: &DecorRotations,
    key: DecorKey,
    decor: &BlockType,
    host: &BlockType,
    (wx, wy, wz): (i32, i32, i32),
) -> DecorPlacement {
    let face = key.face();
    let (u, v) = (key.u(), key.v());
    let nudge = if decor.decor_nudge {
        1 + ((wx + wy + wz + i32::from(u) + i32::from(v)) & 1) as u8
    } else {
        0
    };
    let half = SUB_POSITION_STEPS / 2.0;
    let mut offset = Vec3::new(
        (f32::from(u) - half) / SUB_POSITION_STEPS,
        DECOR_LIFT + f32::from(nudge) * DECOR_NUDGE_STEP,
        (f32::from(v) - half) / SUB_POSITION_STEPS,
    );
    if decor.decor_height_adjustable && face == Face::PosY {
        offset.y -= 1.0 - host_top(host);
    }
    DecorPlacement {
        face,
        rotation: rotations.get(face, key.rotation()),
        offset,
        nudge,
    }
}

#[inline]
fn host_top(host: &BlockType) -> f32 {
    match host.draw {
        DrawType::CubeHeight => f32::from(host.height) / HEIGHT_STEPS,
        DrawType::SurfaceLayer => crate::constants::SURFACE_LAYER_TOP,
        _ => 1.0,
    }
}
