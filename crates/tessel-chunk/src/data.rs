use std::collections::BTreeMap;

use tessel_blocks::{AIR, BlockId};
use tessel_geom::Face;

use crate::coord::ChunkCoord;
use crate::decor::DecorKey;

/// Block light (r, g, b) and sunlight, 4 bits each: `0xSBGR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PackedLight(pub u16);

impl PackedLight {
    pub const DARK: PackedLight = PackedLight(0);
    pub const FULL_SUN: PackedLight = PackedLight(0xF000);

    #[inline]
    pub fn new(r: u8, g: u8, b: u8, sun: u8) -> Self {
        PackedLight(
            u16::from(r.min(15))
                | u16::from(g.min(15)) << 4
                | u16::from(b.min(15)) << 8
                | u16::from(sun.min(15)) << 12,
        )
    }

    #[inline]
    pub fn r(self) -> u8 {
        (self.0 & 0xF) as u8
    }
    #[inline]
    pub fn g(self) -> u8 {
        (self.0 >> 4 & 0xF) as u8
    }
    #[inline]
    pub fn b(self) -> u8 {
        (self.0 >> 8 & 0xF) as u8
    }
    #[inline]
    pub fn sun(self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// Expands to vertex RGBA: block light in RGB, sunlight in A.
    #[inline]
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r() * 17, self.g() * 17, self.b() * 17, self.sun() * 17]
    }
}

/// One cubic chunk: a solid layer, an independent fluid layer, packed light,
/// and decor overlays keyed by attachment.
#[derive(Clone, Debug)]
pub struct ChunkData {
    pub coord: ChunkCoord,
    pub size: usize,
    pub solid: Vec<BlockId>,
    pub fluid: Vec<BlockId>,
    pub light: Vec<PackedLight>,
    pub decors: BTreeMap<DecorKey, BlockId>,
}

impl ChunkData {
    /// All air, full sunlight.
    pub fn empty(coord: ChunkCoord, size: usize) -> Self {
        let n = size * size * size;
        ChunkData {
            coord,
            size,
            solid: vec![AIR; n],
            fluid: vec![AIR; n],
            light: vec![PackedLight::FULL_SUN; n],
            decors: BTreeMap::new(),
        }
    }

    pub fn filled(coord: ChunkCoord, size: usize, solid: BlockId) -> Self {
        let mut c = Self::empty(coord, size);
        c.solid.fill(solid);
        if solid != AIR {
            c.light.fill(PackedLight::DARK);
        }
        c
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.size + z) * self.size + x
    }

    #[inline]
    pub fn solid(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.solid[self.idx(x, y, z)]
    }

    #[inline]
    pub fn fluid(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.fluid[self.idx(x, y, z)]
    }

    #[inline]
    pub fn light(&self, x: usize, y: usize, z: usize) -> PackedLight {
        self.light[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set_solid(&mut self, x: usize, y: usize, z: usize, id: BlockId) {
        let i = self.idx(x, y, z);
        self.solid[i] = id;
    }

    #[inline]
    pub fn set_fluid(&mut self, x: usize, y: usize, z: usize, id: BlockId) {
        let i = self.idx(x, y, z);
        self.fluid[i] = id;
    }

    #[inline]
    pub fn set_light(&mut self, x: usize, y: usize, z: usize, light: PackedLight) {
        let i = self.idx(x, y, z);
        self.light[i] = light;
    }

    /// Attaches a decor to `face` of the cell at (x, y, z). `u`/`v` are the
    /// in-plane sub-position in sixteenths, `rotation` the quarter-turn step.
    /// Returns the previous decor at the same key.
    pub fn add_decor(
        &mut self,
        (x, y, z): (usize, usize, usize),
        face: Face,
        (u, v): (u8, u8),
        rotation: u8,
        block: BlockId,
    ) -> Option<BlockId> {
        let key = DecorKey::new(self.idx(x, y, z), face, u, v, rotation);
        self.decors.insert(key, block)
    }

    #[inline]
    pub fn has_non_air(&self) -> bool {
        self.solid.iter().chain(self.fluid.iter()).any(|&b| b != AIR)
    }

    /// Local coordinates of a flat index.
    #[inline]
    pub fn local_of(&self, i: usize) -> (usize, usize, usize) {
        let x = i % self.size;
        let z = (i / self.size) % self.size;
        let y = i / (self.size * self.size);
        (x, y, z)
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        let (bx, by, bz) = self.coord.world_origin(self.size);
        let s = self.size as i32;
        (bx..bx + s).contains(&wx) && (by..by + s).contains(&wy) && (bz..bz + s).contains(&wz)
    }

    pub fn solid_world(&self, wx: i32, wy: i32, wz: i32) -> Option<BlockId> {
        if !self.contains_world(wx, wy, wz) {
            return None;
        }
        let (bx, by, bz) = self.coord.world_origin(self.size);
        Some(self.solid(
            (wx - bx) as usize,
            (wy - by) as usize,
            (wz - bz) as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_packing() {
        let l = PackedLight::new(3, 7, 15, 9);
        assert_eq!((l.r(), l.g(), l.b(), l.sun()), (3, 7, 15, 9));
        assert_eq!(PackedLight::new(20, 0, 0, 0).r(), 15);
        assert_eq!(PackedLight::FULL_SUN.to_rgba(), [0, 0, 0, 255]);
    }

    #[test]
    fn empty_and_filled() {
        let c = ChunkData::empty(ChunkCoord::new(0, 0, 0), 4);
        assert!(!c.has_non_air());
        assert_eq!(c.light(1, 2, 3), PackedLight::FULL_SUN);
        let f = ChunkData::filled(ChunkCoord::new(1, 0, 0), 4, 5);
        assert!(f.has_non_air());
        assert_eq!(f.solid_world(4, 0, 0), Some(5));
        assert_eq!(f.solid_world(3, 0, 0), None);
    }

    #[test]
    fn decor_replaces_same_key() {
        let mut c = ChunkData::empty(ChunkCoord::default(), 8);
        assert_eq!(c.add_decor((1, 2, 3), Face::PosY, (4, 4), 0, 7), None);
        assert_eq!(c.add_decor((1, 2, 3), Face::PosY, (4, 4), 0, 8), Some(7));
        assert_eq!(c.add_decor((1, 2, 3), Face::PosY, (5, 4), 0, 8), None);
        assert_eq!(c.decors.len(), 2);
    }
}
