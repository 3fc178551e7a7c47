use hashbrown::HashMap;
use tessel_chunk::ChunkCoord;
use tessel_mesh_cpu::{ChunkMeshState, MeshUploader};

use crate::JobOut;

struct StoredChunk<H> {
    rev: u64,
    state: ChunkMeshState,
    center: Vec<H>,
    edge: Vec<H>,
}

impl<H> Default for StoredChunk<H> {
    fn default() -> Self {
        Self {
            rev: 0,
            state: ChunkMeshState::default(),
            center: Vec::new(),
            edge: Vec::new(),
        }
    }
}

/// Applies worker output to an uploader, keeping each chunk's latest mesh
/// state and the handles of its uploaded parts.
pub struct MeshStore<U: MeshUploader> {
    uploader: U,
    chunks: HashMap<ChunkCoord, StoredChunk<U::Handle>>,
}

impl<U: MeshUploader> MeshStore<U> {
    pub fn new(uploader: U) -> Self {
        Self {
            uploader,
            chunks: HashMap::new(),
        }
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn vertex_count(&self, coord: ChunkCoord) -> usize {
        self.chunks.get(&coord).map_or(0, |c| c.state.vertex_count)
    }

    pub fn handle_count(&self) -> usize {
        self.chunks.values().map(|c| c.center.len() + c.edge.len()).sum()
    }

    /// Moves the stored state out, e.g. to send with an edge-only job. The
    /// uploaded handles stay until the job's output is applied.
    pub fn take_state(&mut self, coord: ChunkCoord) -> ChunkMeshState {
        self.chunks
            .get_mut(&coord)
            .map(|c| std::mem::take(&mut c.state))
            .unwrap_or_default()
    }

    /// Uploads a job's output. A failed job leaves its chunk empty;
    /// out-of-date results are dropped. Returns whether `out` was applied.
    pub fn apply(&mut self, out: JobOut) -> bool {
        let entry = self.chunks.entry(out.coord).or_default();
        if out.rev < entry.rev {
            log::debug!(
                target: "tessel::runtime",
                "stale result for chunk {} rev={} < {}",
                out.coord,
                out.rev,
                entry.rev
            );
            return false;
        }
        if out.failed {
            log::warn!(
                target: "tessel::runtime",
                "chunk {} failed (job {}); releasing its mesh",
                out.coord,
                out.job_id
            );
            for h in entry.center.drain(..).chain(entry.edge.drain(..)) {
                self.uploader.release(h);
            }
            entry.rev = out.rev;
            entry.state = ChunkMeshState::default();
            return true;
        }
        if out.center_rebuilt {
            for h in entry.center.drain(..) {
                self.uploader.release(h);
            }
            for part in &out.state.center {
                entry.center.push(self.uploader.upload(part));
            }
        }
        for h in entry.edge.drain(..) {
            self.uploader.release(h);
        }
        for part in &out.state.edge {
            entry.edge.push(self.uploader.upload(part));
        }
        entry.rev = out.rev;
        entry.state = out.state;
        true
    }

    /// Releases everything uploaded for `coord`.
    pub fn remove(&mut self, coord: ChunkCoord) -> bool {
        let Some(chunk) = self.chunks.remove(&coord) else {
            return false;
        };
        for h in chunk.center.into_iter().chain(chunk.edge) {
            self.uploader.release(h);
        }
        true
    }
}
