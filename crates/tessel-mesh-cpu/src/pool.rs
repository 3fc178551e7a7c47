use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use tessel_blocks::RenderPass;
use tessel_chunk::ChunkCoord;
use tessel_geom::Vec3;

use crate::constants::{INITIAL_QUAD_CAP, LOD_COUNT, PARTITION_COUNT};
use crate::services::AtlasId;
use crate::walk::Partition;

/// Growable vertex streams for one (partition, LOD, pass, atlas) bucket.
/// Every per-vertex channel always holds the same number of vertices.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct MeshBuffer {
    pub pos: Vec<f32>,
    pub uv: Vec<f32>,
    /// Block light in RGB, sunlight in A.
    pub rgba: Vec<u8>,
    pub flags: Vec<u32>,
    /// Oceanity weight.
    pub custom: Vec<f32>,
    /// Packed `ColorMapData`.
    pub color_map: Vec<u32>,
    pub idx: Vec<u32>,
}

/// Per-vertex attributes shared by the four corners of a quad.
#[derive(Clone, Copy, Debug)]
pub struct QuadAttrs {
    pub rgba: [u8; 4],
    pub flags: u32,
    pub color_map: u32,
}

impl MeshBuffer {
    /// Clears all arrays but retains capacity for reuse.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.pos.clear();
        self.uv.clear();
        self.rgba.clear();
        self.flags.clear();
        self.custom.clear();
        self.color_map.clear();
        self.idx.clear();
    }

    #[inline]
    pub fn reserve_quads(&mut self, n_quads: usize) {
        let v = n_quads * 4;
        self.pos.reserve(v * 3);
        self.uv.reserve(v * 2);
        self.rgba.reserve(v * 4);
        self.flags.reserve(v);
        self.custom.reserve(v);
        self.color_map.reserve(v);
        self.idx.reserve(n_quads * 6);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.flags.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.idx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    /// Appends a quad as two triangles `(0,1,2)` and `(0,2,3)`; corners are
    /// expected counter-clockwise as seen from the front.
    pub fn push_quad(
        &mut self,
        corners: [Vec3; 4],
        uvs: [(f32, f32); 4],
        custom: [f32; 4],
        attrs: QuadAttrs,
    ) {
        if self.pos.capacity() == 0 {
            self.reserve_quads(INITIAL_QUAD_CAP);
        }
        let base = self.vertex_count() as u32;
        for i in 0..4 {
            let p = corners[i];
            self.pos.extend_from_slice(&[p.x, p.y, p.z]);
            self.uv.extend_from_slice(&[uvs[i].0, uvs[i].1]);
            self.rgba.extend_from_slice(&attrs.rgba);
            self.flags.push(attrs.flags);
            self.custom.push(custom[i]);
            self.color_map.push(attrs.color_map);
        }
        self.idx
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Replaces this buffer's contents with `other`'s, keeping capacity.
    pub fn copy_from(&mut self, other: &MeshBuffer) {
        self.clear_keep_capacity();
        self.pos.extend_from_slice(&other.pos);
        self.uv.extend_from_slice(&other.uv);
        self.rgba.extend_from_slice(&other.rgba);
        self.flags.extend_from_slice(&other.flags);
        self.custom.extend_from_slice(&other.custom);
        self.color_map.extend_from_slice(&other.color_map);
        self.idx.extend_from_slice(&other.idx);
    }

    /// Positions as `Vec3`s.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.pos.chunks_exact(3).map(|p| Vec3::new(p[0], p[1], p[2]))
    }
}

/// Bounded store of spare buffers for output snapshots.
pub struct MeshRecycler {
    spare_tx: Sender<MeshBuffer>,
    spare_rx: Receiver<MeshBuffer>,
    created: AtomicUsize,
    reused: AtomicUsize,
}

impl MeshRecycler {
    pub fn new(max_spare: usize) -> Arc<Self> {
        let (tx, rx) = bounded(max_spare.max(1));
        Arc::new(Self {
            spare_tx: tx,
            spare_rx: rx,
            created: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
        })
    }

    /// Takes a spare buffer (or a fresh one) filled with a copy of `src`.
    pub fn checkout(self: &Arc<Self>, src: &MeshBuffer) -> RecycledMesh {
        let mut mesh = match self.spare_rx.try_recv() {
            Ok(m) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                m
            }
            Err(_) => {
                self.created.fetch_add(1, Ordering::Relaxed);
                MeshBuffer::default()
            }
        };
        mesh.copy_from(src);
        RecycledMesh {
            mesh,
            home: Arc::clone(self),
        }
    }

    fn release(&self, mut mesh: MeshBuffer) {
        mesh.clear_keep_capacity();
        // Full: let the buffer drop.
        let _ = self.spare_tx.try_send(mesh);
    }

    pub fn spare(&self) -> usize {
        self.spare_rx.len()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn reused(&self) -> usize {
        self.reused.load(Ordering::Relaxed)
    }
}

/// Immutable snapshot that returns its storage to the recycler on drop.
pub struct RecycledMesh {
    mesh: MeshBuffer,
    home: Arc<MeshRecycler>,
}

impl Deref for RecycledMesh {
    type Target = MeshBuffer;

    fn deref(&self) -> &MeshBuffer {
        &self.mesh
    }
}

impl Drop for RecycledMesh {
    fn drop(&mut self) {
        self.home.release(std::mem::take(&mut self.mesh));
    }
}

impl std::fmt::Debug for RecycledMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecycledMesh")
            .field("vertices", &self.mesh.vertex_count())
            .finish()
    }
}

/// Output for one (render pass, atlas) pair: up to one snapshot per LOD.
#[derive(Debug)]
pub struct ChunkMeshPart {
    pub pass: RenderPass,
    pub atlas: AtlasId,
    pub lods: [Option<RecycledMesh>; LOD_COUNT],
}

impl ChunkMeshPart {
    pub fn vertex_count(&self) -> usize {
        self.lods.iter().flatten().map(|m| m.vertex_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lods.iter().all(Option::is_none)
    }
}

/// A chunk's current mesh output, split by partition.
#[derive(Debug, Default)]
pub struct ChunkMeshState {
    pub coord: Option<ChunkCoord>,
    pub center: Vec<ChunkMeshPart>,
    pub edge: Vec<ChunkMeshPart>,
    pub vertex_count: usize,
}

impl ChunkMeshState {
    pub fn parts(&self) -> impl Iterator<Item = &ChunkMeshPart> {
        self.center.iter().chain(self.edge.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_empty() && self.edge.is_empty()
    }

    pub fn clear(&mut self) {
        self.center.clear();
        self.edge.clear();
        self.vertex_count = 0;
    }

    pub(crate) fn recount(&mut self) {
        self.vertex_count = self.parts().map(ChunkMeshPart::vertex_count).sum();
    }
}

/// Working buffers of one tesselator: `PARTITION_COUNT` partitions of
/// `LOD_COUNT * RenderPass::COUNT * atlas_count` buffers each.
#[derive(Debug, Default)]
pub struct MeshPool {
    atlas_count: usize,
    partitions: [Vec<MeshBuffer>; PARTITION_COUNT],
}

impl MeshPool {
    pub fn new(atlas_count: usize) -> Self {
        let mut pool = MeshPool::default();
        pool.reset(atlas_count);
        pool
    }

    /// Resizes for a new atlas count. Existing contents are discarded.
    pub fn reset(&mut self, atlas_count: usize) {
        self.atlas_count = atlas_count;
        let n = LOD_COUNT * RenderPass::COUNT * atlas_count;
        for part in self.partitions.iter_mut() {
            part.iter_mut().for_each(MeshBuffer::clear_keep_capacity);
            part.resize_with(n, MeshBuffer::default);
        }
    }

    #[inline]
    pub fn atlas_count(&self) -> usize {
        self.atlas_count
    }

    #[inline]
    fn slot(&self, lod: usize, pass: RenderPass, atlas: usize) -> usize {
        (lod * RenderPass::COUNT + pass.index()) * self.atlas_count + atlas
    }

    pub fn clear(&mut self, partition: Partition) {
        self.partitions[partition.index()]
            .iter_mut()
            .for_each(MeshBuffer::clear_keep_capacity);
    }

    #[inline]
    pub fn buffer(&self, partition: Partition, lod: usize, pass: RenderPass, atlas: usize) -> &MeshBuffer {
        &self.partitions[partition.index()][self.slot(lod, pass, atlas)]
    }

    #[inline]
    pub fn buffer_mut(
        &mut self,
        partition: Partition,
        lod: usize,
        pass: RenderPass,
        atlas: usize,
    ) -> &mut MeshBuffer {
        let slot = self.slot(lod, pass, atlas);
        &mut self.partitions[partition.index()][slot]
    }

    pub fn vertex_count(&self, partition: Partition) -> usize {
        self.partitions[partition.index()]
            .iter()
            .map(MeshBuffer::vertex_count)
            .sum()
    }

    /// Snapshots every non-empty buffer of `partition`, one part per
    /// (pass, atlas) pair with any geometry, in pass then atlas order.
    pub fn assemble(
        &self,
        partition: Partition,
        atlas_ids: &[AtlasId],
        recycler: &Arc<MeshRecycler>,
    ) -> Vec<ChunkMeshPart> {
        let mut out = Vec::new();
        for pass in RenderPass::ALL {
            for (atlas, &atlas_id) in atlas_ids.iter().enumerate().take(self.atlas_count) {
                let lods: [Option<RecycledMesh>; LOD_COUNT] = std::array::from_fn(|lod| {
                    let buf = self.buffer(partition, lod, pass, atlas);
                    (!buf.is_empty()).then(|| recycler.checkout(buf))
                });
                if lods.iter().any(Option::is_some) {
                    out.push(ChunkMeshPart {
                        pass,
                        atlas: atlas_id,
                        lods,
                    });
                }
            }
        }
        out
    }
}
