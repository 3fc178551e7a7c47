use tessel_blocks::{AIR, BlockId, BlockRegistry, BlockType, CullMode, CullQuery};
use tessel_chunk::ChunkCoord;
use tessel_geom::Face;

use crate::constants::WATER_SURFACE;
use crate::grid::ExtendedGrid;
use crate::util::{WarnKind, WarnOnce};
use crate::walk::VoxelWalk;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Solid,
    Fluid,
}

/// Per-voxel visible-face masks for both layers, indexed `(x * size + y) * size + z`.
#[derive(Clone, Debug)]
pub struct FaceMasks {
    size: usize,
    pub solid: Vec<u8>,
    pub fluid: Vec<u8>,
}

impl FaceMasks {
    pub fn new(size: usize) -> Self {
        let n = size * size * size;
        Self {
            size,
            solid: vec![0; n],
            fluid: vec![0; n],
        }
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.size + y) * self.size + z
    }

    #[inline]
    pub fn get(&self, layer: Layer, x: usize, y: usize, z: usize) -> u8 {
        let i = self.index(x, y, z);
        match layer {
            Layer::Solid => self.solid[i],
            Layer::Fluid => self.fluid[i],
        }
    }
}

/// Read-only inputs of the face culling rules.
pub(crate) struct CullEnv<'a> {
    pub reg: &'a BlockRegistry,
    pub grid: &'a ExtendedGrid,
    pub coord: ChunkCoord,
}

impl<'a> CullEnv<'a> {
    #[inline]
    fn layer_id(&self, layer: Layer, i: usize) -> BlockId {
        match layer {
            Layer::Solid => self.grid.solid[i],
            Layer::Fluid => self.grid.fluid[i],
        }
    }

    /// Whether the solid block in cell `n` covers its `side`. Snow overlays
    /// only count where their snow predicate allows snow.
    #[inline]
    fn opaque_toward(&self, n: usize, side: Face) -> bool {
        let nb = self.reg.block(self.grid.solid[n]);
        if !nb.side_opaque(side) {
            return false;
        }
        if nb.draw.is_snow_overlay() {
            let (wx, wy, wz) = self.grid.world_of(self.coord, n);
            return nb.allows_snow(wx, wy, wz);
        }
        true
    }

    #[inline]
    fn default_hidden(&self, me: &BlockType, n: usize, face: Face) -> bool {
        me.draw.covers_side(face) && self.opaque_toward(n, face.opposite())
    }

    fn face_hidden(
        &self,
        me: &BlockType,
        layer: Layer,
        i: usize,
        face: Face,
        warn: &mut WarnOnce,
    ) -> bool {
        let n = self.grid.neighbor(i, face);
        let opp = face.opposite();
        let nb = self.reg.block(self.layer_id(layer, n));
        let same_block = nb.id == me.id;
        let same_material = nb.id != AIR && nb.material == me.material;
        // The single face kept between two collapse blocks faces -Y, +X or +Z.
        let collapse_side = matches!(face, Face::NegY | Face::PosX | Face::PosZ);

        match me.cull {
            CullMode::Default => self.default_hidden(me, n, face),
            CullMode::NeverCull => false,
            CullMode::Merge => same_block || self.default_hidden(me, n, face),
            CullMode::MergeMaterial => same_material || self.default_hidden(me, n, face),
            CullMode::Collapse => {
                same_block
                    || self.default_hidden(me, n, face)
                    || (collapse_side && nb.cull.is_collapse())
            }
            CullMode::CollapseMaterial => {
                same_material
                    || self.default_hidden(me, n, face)
                    || (collapse_side && nb.cull.is_collapse())
            }
            CullMode::Liquid => {
                if face == Face::NegY || same_material || self.opaque_toward(n, opp) {
                    return true;
                }
                face.is_horizontal()
                    && (self.reg.block(self.grid.solid[n]).side_solid(opp)
                        || (layer == Layer::Fluid
                            && self.reg.block(self.grid.solid[i]).side_solid(face)))
            }
            CullMode::Callback => match &me.cull_hook {
                Some(hook) => hook.0.cull(&CullQuery {
                    face,
                    neighbor: nb,
                    flat_index: i,
                }),
                None => {
                    if warn.first(WarnKind::CullPredicate, me.id) {
                        log::warn!(
                            target: "tessel::tess",
                            "block `{}` uses callback culling without a predicate; using default",
                            me.name
                        );
                    }
                    self.default_hidden(me, n, face)
                }
            },
            CullMode::MergeSnowLayer => match face {
                Face::NegY => self.default_hidden(me, n, face),
                Face::PosY => {
                    if self.default_hidden(me, n, face) {
                        return true;
                    }
                    let above = self.reg.block(self.grid.solid[n]);
                    if above.draw.is_snow_overlay() {
                        let (wx, wy, wz) = self.grid.world_of(self.coord, n);
                        return !above.allows_snow(wx, wy, wz);
                    }
                    false
                }
                _ => {
                    self.opaque_toward(n, opp)
                        || (nb.snow_level > 0 && nb.snow_level >= me.snow_level)
                }
            },
            CullMode::FlushExceptTop => {
                face == Face::PosY || same_block || self.opaque_toward(n, opp)
            }
            CullMode::Stairs => {
                if face == Face::PosY {
                    true
                } else if same_block {
                    nb.side_solid(opp)
                } else {
                    self.default_hidden(me, n, face)
                }
            }
        }
    }

    /// Visible-face mask of the `layer` block at padded index `i`.
    pub(crate) fn mask(&self, layer: Layer, i: usize, warn: &mut WarnOnce) -> u8 {
        let me = self.reg.block(self.layer_id(layer, i));
        if me.is_air() {
            return 0;
        }
        let mut mask = 0u8;
        for face in Face::ALL {
            if !self.face_hidden(me, layer, i, face, warn) {
                mask |= face.bit();
            }
        }
        if layer == Layer::Solid && me.draw.is_water_surface_overlay() {
            let up = self.grid.neighbor(i, Face::PosY);
            let above = self.reg.block(self.grid.solid[up]);
            if self.grid.fluid[up] == AIR && !above.draw.is_water_surface_overlay() {
                mask |= WATER_SURFACE;
            }
        }
        mask
    }

    /// Fills `masks` for the cells `walk` visits. Returns whether any
    /// visited cell has a visible face in either layer.
    pub(crate) fn compute(&self, masks: &mut FaceMasks, walk: VoxelWalk, warn: &mut WarnOnce) -> bool {
        let mut any = false;
        walk.for_each(self.grid.size(), |x, y, z| {
            let gi = self.grid.local_index(x, y, z);
            let mi = masks.index(x, y, z);
            let s = self.mask(Layer::Solid, gi, warn);
            let f = self.mask(Layer::Fluid, gi, warn);
            masks.solid[mi] = s;
            masks.fluid[mi] = f;
            any |= (s | f) != 0;
        });
        any
    }
}
