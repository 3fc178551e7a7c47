use tessel_blocks::{AIR, BlockId};
use tessel_chunk::{ChunkCoord, Neighborhood, PackedLight};
use tessel_geom::Face;

/// Halo-padded snapshot of a chunk and the facing layer of its 26 neighbors.
///
/// Padded coordinates run `0..stride` with `stride = size + 2`; chunk-local
/// `(x, y, z)` sits at padded `(x + 1, y + 1, z + 1)`.
#[derive(Clone, Debug)]
pub struct ExtendedGrid {
    size: usize,
    stride: usize,
    pub solid: Vec<BlockId>,
    pub fluid: Vec<BlockId>,
    pub light: Vec<PackedLight>,
}

impl ExtendedGrid {
    pub fn new(size: usize) -> Self {
        let stride = size + 2;
        let n = stride * stride * stride;
        Self {
            size,
            stride,
            solid: vec![AIR; n],
            fluid: vec![AIR; n],
            light: vec![PackedLight::FULL_SUN; n],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Flat index of a padded coordinate.
    #[inline]
    pub fn index(&self, px: usize, py: usize, pz: usize) -> usize {
        (px * self.stride + py) * self.stride + pz
    }

    /// Flat index of a chunk-local coordinate.
    #[inline]
    pub fn local_index(&self, x: usize, y: usize, z: usize) -> usize {
        self.index(x + 1, y + 1, z + 1)
    }

    /// Index of the cell adjacent to `i` across `face`. `i` must be interior.
    #[inline]
    pub fn neighbor(&self, i: usize, face: Face) -> usize {
        let s = self.stride;
        match face {
            Face::PosX => i + s * s,
            Face::NegX => i - s * s,
            Face::PosY => i + s,
            Face::NegY => i - s,
            Face::PosZ => i + 1,
            Face::NegZ => i - 1,
        }
    }

    /// Index offset by `(dx, dy, dz)`, each in `-1..=1`. `i` must be interior.
    #[inline]
    pub fn offset(&self, i: usize, dx: i32, dy: i32, dz: i32) -> usize {
        let s = self.stride as isize;
        let d = (dx as isize * s + dy as isize) * s + dz as isize;
        (i as isize + d) as usize
    }

    /// Whether a padded coordinate lies in the band refreshed by edge-only builds.
    #[inline]
    fn in_band(&self, p: usize) -> bool {
        p <= 1 || p + 2 >= self.stride
    }

    /// Fills the grid from `neighbors`. Unloaded chunks read as air with
    /// full sunlight. With `edge_only`, only cells in the border band (the
    /// halo plus the chunk's outer ring) are refreshed.
    pub fn build(&mut self, neighbors: &Neighborhood, edge_only: bool) {
        let size = self.size as isize;
        for px in 0..self.stride {
            let bx = self.in_band(px);
            let (dx, lx) = split(px as isize - 1, size);
            for py in 0..self.stride {
                let bxy = bx || self.in_band(py);
                let (dy, ly) = split(py as isize - 1, size);
                for pz in 0..self.stride {
                    if edge_only && !bxy && !self.in_band(pz) {
                        continue;
                    }
                    let (dz, lz) = split(pz as isize - 1, size);
                    let i = self.index(px, py, pz);
                    match neighbors.get(dx, dy, dz) {
                        Some(c) => {
                            let ci = c.idx(lx, ly, lz);
                            self.solid[i] = c.solid[ci];
                            self.fluid[i] = c.fluid[ci];
                            self.light[i] = c.light[ci];
                        }
                        None => {
                            self.solid[i] = AIR;
                            self.fluid[i] = AIR;
                            self.light[i] = PackedLight::FULL_SUN;
                        }
                    }
                }
            }
        }
    }

    /// World coordinate of padded cell `i` for a chunk at `coord`.
    pub fn world_of(&self, coord: ChunkCoord, i: usize) -> (i32, i32, i32) {
        let s = self.stride;
        let pz = i % s;
        let py = (i / s) % s;
        let px = i / (s * s);
        let (bx, by, bz) = coord.world_origin(self.size);
        (bx + px as i32 - 1, by + py as i32 - 1, bz + pz as i32 - 1)
    }
}

/// Splits a chunk-relative coordinate into (neighbor offset, local coordinate).
#[inline]
fn split(l: isize, size: isize) -> (i32, usize) {
    if l < 0 {
        (-1, (l + size) as usize)
    } else if l >= size {
        (1, (l - size) as usize)
    } else {
        (0, l as usize)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tessel_chunk::ChunkData;

    use super::*;

    #[test]
    fn index_layout_and_neighbors() {
        let g = ExtendedGrid::new(4);
        assert_eq!(g.stride(), 6);
        let i = g.local_index(1, 2, 3);
        assert_eq!(i, (2 * 6 + 3) * 6 + 4);
        assert_eq!(g.neighbor(i, Face::PosX), g.local_index(2, 2, 3));
        assert_eq!(g.neighbor(i, Face::NegY), g.local_index(1, 1, 3));
        assert_eq!(g.neighbor(i, Face::NegZ), g.local_index(1, 2, 2));
        assert_eq!(g.offset(i, 1, 0, -1), g.local_index(2, 2, 2));
        assert_eq!(g.world_of(ChunkCoord::new(1, 0, -1), g.index(0, 1, 5)), (3, 0, 0));
    }

    #[test]
    fn halo_reads_neighbors_and_missing_is_air() {
        let coord = ChunkCoord::new(0, 0, 0);
        let mut n = Neighborhood::new(Some(Arc::new(ChunkData::filled(coord, 4, 1))));
        let mut east = ChunkData::empty(coord.offset(1, 0, 0), 4);
        east.set_solid(0, 2, 2, 9);
        n.set(1, 0, 0, Some(Arc::new(east)));

        let mut g = ExtendedGrid::new(4);
        g.build(&n, false);
        assert_eq!(g.solid[g.local_index(3, 2, 2)], 1);
        assert_eq!(g.solid[g.index(5, 3, 3)], 9);
        assert_eq!(g.solid[g.index(0, 3, 3)], AIR);
        assert_eq!(g.light[g.index(0, 3, 3)], PackedLight::FULL_SUN);
    }

    #[test]
    fn edge_only_keeps_interior() {
        let coord = ChunkCoord::new(0, 0, 0);
        let mut g = ExtendedGrid::new(6);
        g.build(&Neighborhood::new(Some(Arc::new(ChunkData::filled(coord, 6, 1)))), false);
        g.build(&Neighborhood::new(Some(Arc::new(ChunkData::filled(coord, 6, 2)))), true);
        assert_eq!(g.solid[g.local_index(0, 3, 3)], 2);
        assert_eq!(g.solid[g.local_index(5, 5, 5)], 2);
        assert_eq!(g.solid[g.local_index(2, 3, 3)], 1);
    }
}
