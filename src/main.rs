mod assets;
mod climate;
mod config;
mod shapes;
mod worldgen;

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser};
use hashbrown::HashMap;
use simplelog::{ColorChoice, CombinedLogger, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use tessel_blocks::BlockRegistry;
use tessel_chunk::{ChunkCoord, ChunkProvider, MapChunkProvider};
use tessel_mesh_cpu::{
    AtlasId, AtlasRegistry, CountingUploader, DecorRotations, GridTextureResolver,
    TesselatorConfig, TesselatorServices,
};
use tessel_runtime::{MeshStore, Runtime, RuntimeConfig, TesselateJob};

use crate::climate::LerpClimate;
use crate::config::TesselConfig;
use crate::worldgen::{Terrain, WorldGen};

/// Generates a region of demo terrain, tesselates it on the worker pool and
/// reports what the uploader received.
#[derive(Parser, Debug)]
#[command(name = "tessel", version, about = "Chunk mesh tesselation driver")]
struct Args {
    /// Config file; defaults to tessel.toml in the assets root when present
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory containing assets/blocks.toml
    #[arg(long)]
    assets: Option<PathBuf>,
    #[arg(long)]
    radius: Option<i32>,
    #[arg(long)]
    layers: Option<i32>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    seed: Option<i32>,
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Resubmit every chunk edge-only after the first pass
    #[arg(long)]
    edge_pass: bool,
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    let level = level(args.verbose);
    match &args.log_file {
        Some(path) => {
            let config = simplelog::Config::default();
            CombinedLogger::init(vec![
                TermLogger::new(level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
                WriteLogger::new(level, config, File::create(path)?),
            ])?;
        }
        None => {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_env("RUST_LOG")
                .init();
        }
    }
    Ok(())
}

fn load_config(args: &Args, root: &std::path::Path) -> Result<TesselConfig, Box<dyn Error>> {
    let path = args.config.clone().or_else(|| {
        let p = assets::config_path(root);
        p.exists().then_some(p)
    });
    let mut cfg = match path {
        Some(p) => {
            log::info!("config: {}", p.display());
            TesselConfig::load_from_path(&p)?
        }
        None => TesselConfig::default(),
    };
    if let Some(v) = args.radius {
        cfg.radius = v;
    }
    if let Some(v) = args.layers {
        cfg.layers = v;
    }
    if let Some(v) = args.workers {
        cfg.workers = v;
    }
    if let Some(v) = args.seed {
        cfg.seed = v;
    }
    if let Some(v) = args.chunk_size {
        cfg.chunk_size = v;
    }
    cfg.edge_pass |= args.edge_pass;
    Ok(cfg)
}

#[derive(Default)]
struct WorkerTally {
    jobs: usize,
    failed: usize,
    us: u64,
}

#[derive(Default)]
struct PassReport {
    applied: usize,
    failed: usize,
    vertices: usize,
    workers: HashMap<usize, WorkerTally>,
}

/// Waits for `n` results and applies them to the store.
fn collect(rt: &Runtime, store: &mut MeshStore<CountingUploader>, n: usize) -> PassReport {
    let mut report = PassReport::default();
    let mut received = 0;
    while received < n {
        let Some(out) = rt.recv_result(Duration::from_secs(30)) else {
            let (queued, inflight) = rt.queue_counts();
            log::error!("timed out waiting for results: {received}/{n} queued={queued} inflight={inflight}");
            break;
        };
        received += 1;
        let tally = report.workers.entry(out.worker).or_default();
        tally.jobs += 1;
        tally.us += u64::from(out.t_mesh_us);
        if out.failed {
            tally.failed += 1;
            report.failed += 1;
        }
        report.vertices += out.vertices;
        if store.apply(out) {
            report.applied += 1;
        }
    }
    report
}

fn log_pass(name: &str, ms: u128, report: &PassReport) {
    log::info!(
        target: "perf",
        "ms={} pass={} applied={} failed={} verts={}",
        ms,
        name,
        report.applied,
        report.failed,
        report.vertices
    );
    let mut workers: Vec<_> = report.workers.iter().collect();
    workers.sort_by_key(|(w, _)| **w);
    for (w, t) in workers {
        log::debug!(
            target: "perf",
            "worker={} jobs={} failed={} mesh_ms={:.2}",
            w,
            t.jobs,
            t.failed,
            t.us as f64 / 1000.0
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let root = assets::resolve_assets_root(args.assets.clone());
    let cfg = load_config(&args, &root)?;
    let world_height = cfg.world_height();

    let blocks = assets::blocks_path(&root);
    log::info!("blocks: {}", blocks.display());
    let mut reg = BlockRegistry::load_from_path(&blocks)?;
    worldgen::install_predicates(&mut reg, &cfg.world, world_height)?;
    let reg = Arc::new(reg);
    log::info!(
        "registry: {} blocks, {} textures, {} materials",
        reg.blocks.len(),
        reg.textures.len(),
        reg.materials.len()
    );

    let atlas_ids: Vec<AtlasId> = (0..cfg.atlas_count.max(1)).collect();
    let services = TesselatorServices {
        textures: Arc::new(GridTextureResolver::new(atlas_ids.clone(), cfg.atlas_columns)),
        climate: Arc::new(LerpClimate::new(
            cfg.seed,
            cfg.sea_level,
            Terrain::new(cfg.seed, &cfg.world, world_height),
        )),
        shapes: Arc::new(shapes::demo_shapes()),
    };
    let rt = Runtime::new(
        RuntimeConfig {
            workers: cfg.workers,
            tesselator: TesselatorConfig {
                chunk_size: cfg.chunk_size,
                sea_level: cfg.sea_level,
                max_spare_meshes: cfg.max_spare_meshes,
            },
        },
        reg.clone(),
        Arc::new(AtlasRegistry::new(&atlas_ids)),
        Arc::new(DecorRotations::new()),
        services,
    )?;

    let t0 = Instant::now();
    let world = WorldGen::new(&reg, cfg.seed, cfg.sea_level, world_height, &cfg.world);
    let provider = MapChunkProvider::new();
    for cy in 0..cfg.layers {
        for cz in -cfg.radius..=cfg.radius {
            for cx in -cfg.radius..=cfg.radius {
                let coord = ChunkCoord::new(cx, cy, cz);
                provider.insert(world.generate(coord, cfg.chunk_size));
            }
        }
    }
    let coords = provider.coords();
    log::info!(
        target: "perf",
        "ms={} worldgen chunks={}",
        t0.elapsed().as_millis(),
        coords.len()
    );

    let mut store = MeshStore::new(CountingUploader::default());
    let t1 = Instant::now();
    for (job_id, &coord) in coords.iter().enumerate() {
        rt.submit(TesselateJob::full(coord, provider.neighborhood(coord), job_id as u64, 1));
    }
    let full = collect(&rt, &mut store, coords.len());
    log_pass("full", t1.elapsed().as_millis(), &full);

    if cfg.edge_pass {
        let t2 = Instant::now();
        let base = coords.len() as u64;
        for (i, &coord) in coords.iter().enumerate() {
            rt.submit(TesselateJob {
                coord,
                neighbors: provider.neighborhood(coord),
                edge_only: true,
                job_id: base + i as u64,
                rev: 2,
                state: store.take_state(coord),
            });
        }
        let edge = collect(&rt, &mut store, coords.len());
        log_pass("edge_only", t2.elapsed().as_millis(), &edge);
    }

    let up = store.uploader();
    println!(
        "chunks={} meshed={} handles={} uploads={} released={} uploaded_vertices={}",
        coords.len(),
        store.len(),
        store.handle_count(),
        up.uploads,
        up.released,
        up.vertices
    );
    Ok(())
}
