use tessel_geom::Face;

const INDEX_BITS: u32 = 15;
const FACE_SHIFT: u32 = INDEX_BITS;
const U_SHIFT: u32 = FACE_SHIFT + 3;
const V_SHIFT: u32 = U_SHIFT + 4;
const ROT_SHIFT: u32 = V_SHIFT + 4;

/// Packed decor attachment: chunk-local flat index (15 bits), host face
/// (3 bits), sub-position u and v in sixteenths (4 bits each) and a
/// quarter-turn rotation step (2 bits).
///
/// Ordering follows the packed value, so the local index dominates and a
/// `BTreeMap<DecorKey, _>` iterates decors in cell order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorKey(pub u32);

impl DecorKey {
    #[inline]
    pub fn new(index: usize, face: Face, u: u8, v: u8, rotation: u8) -> Self {
        debug_assert!(index < 1 << INDEX_BITS, "decor index {index} out of range");
        DecorKey(
            (index as u32 & ((1 << INDEX_BITS) - 1))
                | (face.index() as u32) << FACE_SHIFT
                | u32::from(u & 0xF) << U_SHIFT
                | u32::from(v & 0xF) << V_SHIFT
                | u32::from(rotation & 0x3) << ROT_SHIFT,
        )
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0 & ((1 << INDEX_BITS) - 1)) as usize
    }

    #[inline]
    pub fn face(self) -> Face {
        Face::from_index(((self.0 >> FACE_SHIFT) & 0x7) as usize).unwrap_or(Face::PosY)
    }

    #[inline]
    pub fn u(self) -> u8 {
        ((self.0 >> U_SHIFT) & 0xF) as u8
    }

    #[inline]
    pub fn v(self) -> u8 {
        ((self.0 >> V_SHIFT) & 0xF) as u8
    }

    #[inline]
    pub fn rotation(self) -> u8 {
        ((self.0 >> ROT_SHIFT) & 0x3) as u8
    }
}
