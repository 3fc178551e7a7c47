use std::sync::Arc;

use proptest::prelude::*;
use tessel_blocks::{BlockRegistry, CullMode};
use tessel_chunk::{ChunkCoord, ChunkData, Neighborhood};
use tessel_geom::Face;
use tessel_mesh_cpu::visibility::Layer;
use tessel_mesh_cpu::{
    AtlasRegistry, ChunkTesselator, DecorRotations, FlatClimate, GridTextureResolver,
    ShapeLibrary, TesselatorConfig, TesselatorServices,
};

const BLOCKS: &str = r#"
[[blocks]]
name = "stone"

[[blocks]]
name = "glass"
draw = "transparent"

[[blocks]]
name = "leaves"
cull = "collapse"
side_opaque = false

[[blocks]]
name = "birch_leaves"
cull = "collapse"
side_opaque = false
"#;

const SIZE: usize = 4;

fn tesselator(reg: Arc<BlockRegistry>) -> ChunkTesselator {
    let services = TesselatorServices {
        textures: Arc::new(GridTextureResolver::new(vec![1], 8)),
        climate: Arc::new(FlatClimate::default()),
        shapes: Arc::new(ShapeLibrary::new()),
    };
    let cfg = TesselatorConfig {
        chunk_size: SIZE,
        ..TesselatorConfig::default()
    };
    ChunkTesselator::new(
        cfg,
        reg,
        Arc::new(AtlasRegistry::new(&[1])),
        Arc::new(DecorRotations::new()),
        services,
    )
    .unwrap()
}

fn cells() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(0u16..=4, SIZE * SIZE * SIZE)
}

proptest! {
    // A face shared by two merging blocks is either hidden on both sides
    // (same block) or kept exactly once (two different collapse blocks).
    #[test]
    fn shared_faces_are_symmetric(ids in cells()) {
        let reg = Arc::new(BlockRegistry::from_toml_str(BLOCKS).unwrap());
        let coord = ChunkCoord::new(0, 0, 0);
        let mut chunk = ChunkData::empty(coord, SIZE);
        chunk.solid.copy_from_slice(&ids);
        let chunk = Arc::new(chunk);
        let mut tess = tesselator(reg.clone());
        tess.begin_process_chunk(coord, &Neighborhood::new(Some(chunk.clone())), false).unwrap();
        let masks = tess.face_masks();

        for x in 0..SIZE { for y in 0..SIZE { for z in 0..SIZE {
            let a = reg.block(chunk.solid(x, y, z));
            for face in [Face::PosX, Face::PosY, Face::PosZ] {
                let (dx, dy, dz) = face.delta();
                let (nx, ny, nz) = (x + dx as usize, y + dy as usize, z + dz as usize);
                if nx >= SIZE || ny >= SIZE || nz >= SIZE {
                    continue;
                }
                let b = reg.block(chunk.solid(nx, ny, nz));
                let a_shows = masks.get(Layer::Solid, x, y, z) & face.bit() != 0;
                let b_shows = masks.get(Layer::Solid, nx, ny, nz) & face.opposite().bit() != 0;
                if a.is_air() || b.is_air() {
                    continue;
                }
                let merging = matches!(a.cull, CullMode::Merge | CullMode::Collapse);
                if merging && a.id == b.id {
                    prop_assert!(!a_shows && !b_shows);
                } else if a.cull == CullMode::Collapse && b.cull == CullMode::Collapse {
                    prop_assert!(a_shows ^ b_shows);
                }
            }
        }}}
    }
}
