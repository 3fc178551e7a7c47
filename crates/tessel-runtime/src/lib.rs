//! Worker pool running chunk tesselators, plus the store that uploads their output.
#![forbid(unsafe_code)]

mod store;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tessel_blocks::BlockRegistry;
use tessel_chunk::{ChunkCoord, Neighborhood};
use tessel_mesh_cpu::{
    AtlasId, AtlasRegistry, ChunkMeshState, ChunkTesselator, DecorRotations, TesselateError,
    TesselatorConfig, TesselatorServices,
};
use thiserror::Error;

pub use store::MeshStore;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
    #[error(transparent)]
    Tesselator(#[from] TesselateError),
}

pub struct TesselateJob {
    pub coord: ChunkCoord,
    pub neighbors: Neighborhood,
    pub edge_only: bool,
    pub job_id: u64,
    pub rev: u64,
    /// Previous output for `coord`; an edge-only job keeps its center.
    pub state: ChunkMeshState,
}

impl TesselateJob {
    pub fn full(coord: ChunkCoord, neighbors: Neighborhood, job_id: u64, rev: u64) -> Self {
        Self {
            coord,
            neighbors,
            edge_only: false,
            job_id,
            rev,
            state: ChunkMeshState::default(),
        }
    }
}

#[derive(Debug)]
pub struct JobOut {
    pub coord: ChunkCoord,
    pub job_id: u64,
    pub rev: u64,
    pub state: ChunkMeshState,
    pub vertices: usize,
    pub center_rebuilt: bool,
    /// The tesselator errored or panicked; `state` is empty.
    pub failed: bool,
    pub worker: usize,
    pub t_mesh_us: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    /// Worker count; 0 picks the available parallelism.
    pub workers: usize,
    pub tesselator: TesselatorConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            tesselator: TesselatorConfig::default(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn process_job(
    tess: &mut ChunkTesselator,
    job: TesselateJob,
    worker: usize,
    shutdown: &AtomicBool,
) -> JobOut {
    let TesselateJob {
        coord,
        neighbors,
        edge_only,
        job_id,
        rev,
        mut state,
    } = job;
    let t0 = Instant::now();
    let edge_runs = tess.stats().edge_only;
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        tess.process_chunk(coord, &neighbors, edge_only, &mut state)
    }));
    let failed = match result {
        Ok(Ok(_)) => false,
        Ok(Err(e)) => {
            log::error!(target: "tessel::runtime", "worker {worker}: chunk {coord} failed: {e}");
            true
        }
        Err(payload) => {
            if !shutdown.load(Ordering::Relaxed) {
                log::error!(
                    target: "tessel::runtime",
                    "worker {worker}: chunk {coord} panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
            true
        }
    };
    if failed {
        tess.invalidate();
        state.clear();
    }
    JobOut {
        coord,
        job_id,
        rev,
        vertices: state.vertex_count,
        center_rebuilt: !failed && tess.stats().edge_only == edge_runs,
        state,
        failed,
        worker,
        t_mesh_us: t0.elapsed().as_micros().min(u128::from(u32::MAX)) as u32,
    }
}

/// Tesselation workers on a rayon pool. Each worker owns one
/// `ChunkTesselator` and pulls jobs from a shared queue.
pub struct Runtime {
    job_tx: Option<Sender<TesselateJob>>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    atlases: Arc<AtlasRegistry>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    workers: usize,
}

impl Runtime {
    pub fn new(
        cfg: RuntimeConfig,
        reg: Arc<BlockRegistry>,
        atlases: Arc<AtlasRegistry>,
        rotations: Arc<DecorRotations>,
        services: TesselatorServices,
    ) -> Result<Self, RuntimeError> {
        let workers = if cfg.workers == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            cfg.workers
        };
        let tesselators = (0..workers)
            .map(|_| {
                ChunkTesselator::new(
                    cfg.tesselator,
                    reg.clone(),
                    atlases.clone(),
                    rotations.clone(),
                    services.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (job_tx, job_rx) = unbounded::<TesselateJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("tessel-mesh-{i}"))
                .build()?,
        );
        for (worker, mut tess) in tesselators.into_iter().enumerate() {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let queued = queued.clone();
            let inflight = inflight.clone();
            let shutdown = shutdown.clone();
            pool.spawn(move || {
                log::debug!(target: "tessel::runtime", "worker {worker} started");
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    let out = process_job(&mut tess, job, worker, &shutdown);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                    if tx.send(out).is_err() {
                        break;
                    }
                }
                let stats = tess.stats();
                log::debug!(
                    target: "tessel::runtime",
                    "worker {worker} stopped chunks={} edge_only={} upgraded={} verts={}",
                    stats.chunks,
                    stats.edge_only,
                    stats.upgraded,
                    stats.total_vertices
                );
            });
        }
        log::info!(target: "tessel::runtime", "started {workers} tesselation workers");

        Ok(Self {
            job_tx: Some(job_tx),
            res_rx,
            _pool: pool,
            atlases,
            queued,
            inflight,
            shutdown,
            workers,
        })
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn submit(&self, job: TesselateJob) {
        let Some(tx) = &self.job_tx else {
            return;
        };
        self.queued.fetch_add(1, Ordering::Relaxed);
        if tx.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn drain_results(&self) -> Vec<JobOut> {
        self.res_rx.try_iter().collect()
    }

    /// Waits up to `timeout` for the next result.
    pub fn recv_result(&self, timeout: Duration) -> Option<JobOut> {
        self.res_rx.recv_timeout(timeout).ok()
    }

    /// (queued, in flight) job counts.
    pub fn queue_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }

    /// Replaces the atlas set shared by every worker.
    pub fn notify_atlases_changed(&self, ids: &[AtlasId]) -> Result<(), RuntimeError> {
        self.atlases.set_atlases(ids)?;
        Ok(())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Closing the queue lets workers finish what they hold and exit.
        self.job_tx.take();
    }
}
