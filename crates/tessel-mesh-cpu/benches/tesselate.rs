use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use tessel_blocks::BlockRegistry;
use tessel_chunk::{ChunkCoord, ChunkData, Neighborhood};
use tessel_geom::Face;
use tessel_mesh_cpu::{
    AtlasRegistry, ChunkMeshState, ChunkTesselator, DecorRotations, FlatClimate,
    GridTextureResolver, ShapeLibrary, TesselatorConfig, TesselatorServices,
};

const SIZE: usize = 32;

fn load_registry() -> BlockRegistry {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    BlockRegistry::load_from_path(root.join("../../assets/blocks.toml")).unwrap()
}

fn tesselator(reg: Arc<BlockRegistry>) -> ChunkTesselator {
    let services = TesselatorServices {
        textures: Arc::new(GridTextureResolver::new(vec![0, 1], 16)),
        climate: Arc::new(FlatClimate::default()),
        shapes: Arc::new(ShapeLibrary::new()),
    };
    ChunkTesselator::new(
        TesselatorConfig {
            chunk_size: SIZE,
            sea_level: 8,
            ..TesselatorConfig::default()
        },
        reg,
        Arc::new(AtlasRegistry::new(&[0, 1])),
        Arc::new(DecorRotations::new()),
        services,
    )
    .unwrap()
}

// Rolling terrain: stone below a wavy surface, grass on top, water up to y=8.
fn terrain(reg: &BlockRegistry, coord: ChunkCoord) -> ChunkData {
    let id = |n: &str| reg.id_by_name(n).unwrap_or(0);
    let (stone, grass, water, moss) = (id("stone"), id("grass"), id("water"), id("moss"));
    let mut c = ChunkData::empty(coord, SIZE);
    for x in 0..SIZE {
        for z in 0..SIZE {
            let h = 6 + ((x * 7 + z * 3) % 11);
            for y in 0..h {
                c.set_solid(x, y, z, if y + 1 == h { grass } else { stone });
            }
            for y in h..9 {
                c.set_fluid(x, y, z, water);
            }
            if (x + z) % 5 == 0 && h > 9 && moss != 0 {
                c.add_decor((x, h - 1, z), Face::PosY, ((x % 16) as u8, (z % 16) as u8), 0, moss);
            }
        }
    }
    c
}

fn bench_full_chunk(c: &mut Criterion) {
    let reg = Arc::new(load_registry());
    let coord = ChunkCoord::new(0, 0, 0);
    let n = Neighborhood::new(Some(Arc::new(terrain(&reg, coord))));
    let mut tess = tesselator(reg);
    let mut state = ChunkMeshState::default();
    let mut group = c.benchmark_group("tesselate");
    group.bench_function("terrain_32_full", |b| {
        b.iter(|| {
            let verts = tess.process_chunk(coord, &n, false, &mut state).unwrap();
            black_box(verts);
        })
    });
    group.bench_function("terrain_32_edge_only", |b| {
        b.iter(|| {
            let verts = tess.process_chunk(coord, &n, true, &mut state).unwrap();
            black_box(verts);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_full_chunk);
criterion_main!(benches);
