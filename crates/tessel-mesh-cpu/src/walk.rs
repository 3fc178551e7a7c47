/// Mesh buffer partition a voxel's geometry is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Partition {
    Center = 0,
    Edge = 1,
}

impl Partition {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn of(x: usize, y: usize, z: usize, size: usize) -> Partition {
        if is_ring(x, y, z, size) {
            Partition::Edge
        } else {
            Partition::Center
        }
    }
}

/// Whether a local coordinate lies in the chunk's outermost ring.
#[inline]
pub fn is_ring(x: usize, y: usize, z: usize, size: usize) -> bool {
    let max = size - 1;
    x == 0 || x == max || y == 0 || y == max || z == 0 || z == max
}

/// Which cells of a chunk a pass visits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelWalk {
    /// Every cell.
    Full,
    /// Only the outermost ring.
    Ring,
}

impl VoxelWalk {
    /// Visits cells in x, y, z order (z fastest).
    pub fn for_each(self, size: usize, mut f: impl FnMut(usize, usize, usize)) {
        if size == 0 {
            return;
        }
        let max = size - 1;
        for x in 0..size {
            for y in 0..size {
                let full_row = self == VoxelWalk::Full || x == 0 || x == max || y == 0 || y == max;
                if full_row {
                    for z in 0..size {
                        f(x, y, z);
                    }
                } else {
                    f(x, y, 0);
                    if max != 0 {
                        f(x, y, max);
                    }
                }
            }
        }
    }

    pub fn rebuilds(self, partition: Partition) -> bool {
        match self {
            VoxelWalk::Full => true,
            VoxelWalk::Ring => partition == Partition::Edge,
        }
    }
}
