use std::sync::Arc;

use tessel_blocks::{BlockId, BlockRegistry, BlockType, RenderPass, TextureRole};
use tessel_chunk::{ChunkCoord, ChunkData, Neighborhood};
use tessel_geom::Face;
use tessel_mesh_cpu::constants::{FLAG_NUDGE_MASK, FLAG_NUDGE_SHIFT};
use tessel_mesh_cpu::visibility::Layer;
use tessel_mesh_cpu::{
    AtlasRegistry, ChunkMeshState, ChunkTesselator, DecorRotations, FlatClimate,
    GridTextureResolver, MeshBuffer, ShapeLibrary, TesselateError, TesselatorConfig,
    TesselatorServices, TextureLocation, TextureResolver,
};

const BLOCKS: &str = r#"
water_block = "water"
snow_block = "snow"

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
name = "water"
draw = "liquid"

[[blocks]]
name = "snow"
draw = "cube_height"
height = 1

[[blocks]]
name = "moss"
draw = "surface_layer"
decor_nudge = true

[[blocks]]
name = "lantern"
draw = "shape"

[[blocks]]
name = "vine"
draw = "surface_layer"
decor_always_visible = true

[[blocks]]
name = "pad"
draw = "surface_layer"
pass = "transparent"
decor_height_adjustable = true
"#;

const ATLAS: u32 = 7;

fn services(textures: Arc<dyn TextureResolver>) -> TesselatorServices {
    TesselatorServices {
        textures,
        climate: Arc::new(FlatClimate::default()),
        shapes: Arc::new(ShapeLibrary::new()),
    }
}

fn tesselator_with(
    size: usize,
    textures: Arc<dyn TextureResolver>,
) -> (ChunkTesselator, Arc<BlockRegistry>, Arc<AtlasRegistry>) {
    let reg = Arc::new(BlockRegistry::from_toml_str(BLOCKS).unwrap());
    let atlases = Arc::new(AtlasRegistry::new(&[ATLAS]));
    let cfg = TesselatorConfig {
        chunk_size: size,
        sea_level: 0,
        max_spare_meshes: 64,
    };
    let tess = ChunkTesselator::new(
        cfg,
        reg.clone(),
        atlases.clone(),
        Arc::new(DecorRotations::new()),
        services(textures),
    )
    .unwrap();
    (tess, reg, atlases)
}

fn tesselator(size: usize) -> (ChunkTesselator, Arc<BlockRegistry>) {
    let (tess, reg, _) = tesselator_with(size, Arc::new(GridTextureResolver::new(vec![ATLAS], 16)));
    (tess, reg)
}

fn id(reg: &BlockRegistry, name: &str) -> BlockId {
    reg.id_by_name(name).unwrap()
}

fn meshes(parts: &[tessel_mesh_cpu::ChunkMeshPart]) -> Vec<(RenderPass, u32, usize, MeshBuffer)> {
    let mut out = Vec::new();
    for p in parts {
        for (lod, m) in p.lods.iter().enumerate() {
            if let Some(m) = m {
                out.push((p.pass, p.atlas, lod, (**m).clone()));
            }
        }
    }
    out
}

fn quad_count(parts: &[tessel_mesh_cpu::ChunkMeshPart]) -> usize {
    meshes(parts).iter().map(|(.., m)| m.index_count() / 6).sum()
}

#[test]
fn single_cube_emits_six_edge_faces() {
    let (mut tess, reg) = tesselator(8);
    let coord = ChunkCoord::new(0, 0, 0);
    let mut chunk = ChunkData::empty(coord, 8);
    chunk.set_solid(0, 0, 0, id(&reg, "stone"));
    let n = Neighborhood::new(Some(Arc::new(chunk)));

    let mut state = ChunkMeshState::default();
    let verts = tess.process_chunk(coord, &n, false, &mut state).unwrap();
    assert_eq!(verts, 24);
    assert!(state.center.is_empty());
    assert_eq!(quad_count(&state.edge), 6);
    // geometry stays chunk-local
    for (.., m) in meshes(&state.edge) {
        assert!(m.pos.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}

#[test]
fn buried_chunk_is_empty() {
    let (mut tess, reg) = tesselator(32);
    let stone = id(&reg, "stone");
    let coord = ChunkCoord::new(0, 0, 0);
    let mut n = Neighborhood::new(None);
    for dx in -1..=1 {
        for dy in -1..=1 {
            for dz in -1..=1 {
                let c = ChunkData::filled(coord.offset(dx, dy, dz), 32, stone);
                n.set(dx, dy, dz, Some(Arc::new(c)));
            }
        }
    }
    assert!(!tess.begin_process_chunk(coord, &n, false).unwrap());
    let mut state = ChunkMeshState::default();
    assert_eq!(tess.process_chunk(coord, &n, false, &mut state).unwrap(), 0);
    assert!(state.is_empty());
    assert_eq!(tess.stats().empty, 1);
}

#[test]
fn world_edge_chunk_shows_outward_faces() {
    let (mut tess, reg) = tesselator(4);
    let coord = ChunkCoord::new(-3, 0, 5);
    let n = Neighborhood::new(Some(Arc::new(ChunkData::filled(coord, 4, id(&reg, "stone")))));
    let mut state = ChunkMeshState::default();
    tess.process_chunk(coord, &n, false, &mut state).unwrap();
    assert_eq!(quad_count(&state.edge), 6 * 4 * 4);
    assert!(state.center.is_empty());
}

#[test]
fn submerged_liquid_has_no_faces() {
    let (mut tess, reg) = tesselator(4);
    let water = id(&reg, "water");
    let coord = ChunkCoord::new(0, 0, 0);
    let flooded = |c: ChunkCoord| {
        let mut d = ChunkData::empty(c, 4);
        d.fluid.fill(water);
        Arc::new(d)
    };
    let mut n = Neighborhood::new(Some(flooded(coord)));
    for (dx, dy, dz) in [(1, 0, 0), (-1, 0, 0), (0, 0, 1), (0, 0, -1), (0, 1, 0)] {
        n.set(dx, dy, dz, Some(flooded(coord.offset(dx, dy, dz))));
    }
    tess.begin_process_chunk(coord, &n, false).unwrap();
    let masks = tess.face_masks();
    for x in 0..4 {
        for y in 0..4 {
            for z in 0..4 {
                let m = masks.get(Layer::Fluid, x, y, z);
                for face in Face::HORIZONTAL {
                    assert_eq!(m & face.bit(), 0, "({x},{y},{z}) {face:?}");
                }
                assert_eq!(m & Face::PosY.bit(), 0);
            }
        }
    }
}

#[test]
fn merge_and_collapse_hide_shared_faces() {
    let (mut tess, reg) = tesselator(4);
    let coord = ChunkCoord::new(0, 0, 0);
    let mut chunk = ChunkData::empty(coord, 4);
    chunk.set_solid(1, 1, 1, id(&reg, "glass"));
    chunk.set_solid(2, 1, 1, id(&reg, "glass"));
    chunk.set_solid(1, 2, 2, id(&reg, "leaves"));
    chunk.set_solid(1, 2, 3, id(&reg, "leaves"));
    tess.begin_process_chunk(coord, &Neighborhood::new(Some(Arc::new(chunk))), false)
        .unwrap();
    let m = tess.face_masks();
    assert_eq!(m.get(Layer::Solid, 1, 1, 1) & Face::PosX.bit(), 0);
    assert_eq!(m.get(Layer::Solid, 2, 1, 1) & Face::NegX.bit(), 0);
    assert_eq!(m.get(Layer::Solid, 1, 2, 2) & Face::PosZ.bit(), 0);
    assert_eq!(m.get(Layer::Solid, 1, 2, 3) & Face::NegZ.bit(), 0);
}

#[test]
fn edge_only_leaves_center_untouched() {
    let (mut tess, reg) = tesselator(8);
    let stone = id(&reg, "stone");
    let coord = ChunkCoord::new(0, 0, 0);
    let mut chunk = ChunkData::empty(coord, 8);
    chunk.set_solid(3, 3, 3, stone);
    chunk.set_solid(7, 4, 4, stone);
    let chunk = Arc::new(chunk);
    let mut state = ChunkMeshState::default();
    let before = tess
        .process_chunk(coord, &Neighborhood::new(Some(chunk.clone())), false, &mut state)
        .unwrap();
    let center = meshes(&state.center);
    assert_eq!(quad_count(&state.center), 6);

    let mut n = Neighborhood::new(Some(chunk));
    n.set(1, 0, 0, Some(Arc::new(ChunkData::filled(coord.offset(1, 0, 0), 8, stone))));
    let after = tess.process_chunk(coord, &n, true, &mut state).unwrap();
    assert_eq!(meshes(&state.center), center);
    assert_eq!(after, before - 4);
    assert_eq!(tess.stats().edge_only, 1);
    assert_eq!(tess.stats().upgraded, 0);
}

#[test]
fn edge_only_after_another_workers_build_rebuilds_in_full() {
    let (mut a, reg) = tesselator(8);
    let (mut b, _) = tesselator(8);
    let stone = id(&reg, "stone");
    let coord = ChunkCoord::new(0, 0, 0);
    let mut v1 = ChunkData::empty(coord, 8);
    v1.set_solid(0, 3, 3, stone);
    v1.set_solid(1, 3, 3, stone);
    let mut v2 = ChunkData::empty(coord, 8);
    v2.set_solid(0, 3, 3, stone);
    let v2 = Neighborhood::new(Some(Arc::new(v2)));

    // `a` last saw v1 of the chunk, `b` built the current v2
    a.process_chunk(coord, &Neighborhood::new(Some(Arc::new(v1))), false, &mut ChunkMeshState::default())
        .unwrap();
    let mut state = ChunkMeshState::default();
    let full = b.process_chunk(coord, &v2, false, &mut state).unwrap();
    assert_eq!(full, 24);

    assert_eq!(a.process_chunk(coord, &v2, true, &mut state).unwrap(), full);
    assert_eq!(a.stats().upgraded, 1);
    assert_eq!(a.stats().edge_only, 0);
    // now `a` holds v2 and may stay edge-only
    assert_eq!(a.process_chunk(coord, &v2, true, &mut state).unwrap(), full);
    assert_eq!(a.stats().edge_only, 1);
}

#[test]
fn edge_only_upgrades_without_a_prior_build() {
    let (mut tess, reg) = tesselator(4);
    let coord = ChunkCoord::new(2, 0, 0);
    let n = Neighborhood::new(Some(Arc::new(ChunkData::filled(coord, 4, id(&reg, "stone")))));
    assert!(tess.begin_process_chunk(coord, &n, true).unwrap());
    assert_eq!(tess.stats().upgraded, 1);
    // the grid is now complete for `coord`, so a second request stays edge-only
    tess.begin_process_chunk(coord, &n, true).unwrap();
    assert_eq!(tess.stats().upgraded, 1);
}

#[test]
fn atlas_change_forces_full_rebuild() {
    let (mut tess, reg, atlases) =
        tesselator_with(4, Arc::new(GridTextureResolver::new(vec![ATLAS, 9], 4)));
    let coord = ChunkCoord::new(0, 0, 0);
    let n = Neighborhood::new(Some(Arc::new(ChunkData::filled(coord, 4, id(&reg, "stone")))));
    let mut state = ChunkMeshState::default();
    let verts = tess.process_chunk(coord, &n, false, &mut state).unwrap();

    tess.notify_atlases_changed(&[9, ATLAS]).unwrap();
    assert_eq!(atlases.generation().unwrap(), 2);
    assert_eq!(tess.process_chunk(coord, &n, true, &mut state).unwrap(), verts);
    assert_eq!(tess.stats().upgraded, 1);
    assert!(state.parts().all(|p| p.atlas == ATLAS));
}

#[test]
fn tesselation_is_deterministic() {
    let build = || {
        let (mut tess, reg) = tesselator(8);
        let coord = ChunkCoord::new(1, -1, 0);
        let mut chunk = ChunkData::empty(coord, 8);
        for (i, name) in ["stone", "glass", "leaves", "snow", "lantern"].iter().enumerate() {
            chunk.set_solid(i + 1, 2, 3, id(&reg, name));
        }
        chunk.set_fluid(6, 6, 6, id(&reg, "water"));
        chunk.add_decor((1, 2, 3), Face::PosY, (3, 9), 1, id(&reg, "moss"));
        let mut state = ChunkMeshState::default();
        tess.process_chunk(coord, &Neighborhood::new(Some(Arc::new(chunk))), false, &mut state)
            .unwrap();
        (meshes(&state.center), meshes(&state.edge))
    };
    assert_eq!(build(), build());
}

#[test]
fn adjacent_nudged_decors_get_distinct_depths() {
    let (mut tess, reg) = tesselator(8);
    let coord = ChunkCoord::new(0, 0, 0);
    let moss = id(&reg, "moss");
    let mut chunk = ChunkData::empty(coord, 8);
    chunk.set_solid(2, 2, 2, id(&reg, "stone"));
    chunk.add_decor((2, 2, 2), Face::PosY, (7, 8), 0, moss);
    chunk.add_decor((2, 2, 2), Face::PosY, (8, 8), 0, moss);
    let mut state = ChunkMeshState::default();
    tess.process_chunk(coord, &Neighborhood::new(Some(Arc::new(chunk))), false, &mut state)
        .unwrap();

    let mut depths = Vec::new();
    let mut nudges = Vec::new();
    for (.., m) in meshes(&state.center) {
        for (v, &flags) in m.flags.iter().enumerate() {
            let nudge = (flags & FLAG_NUDGE_MASK) >> FLAG_NUDGE_SHIFT;
            if nudge != 0 {
                nudges.push(nudge);
                depths.push(m.pos[v * 3 + 1]);
            }
        }
    }
    assert_eq!(depths.len(), 8);
    nudges.sort_unstable();
    nudges.dedup();
    assert_eq!(nudges, vec![1, 2]);
    depths.sort_by(f32::total_cmp);
    depths.dedup();
    assert_eq!(depths.len(), 2);
}

#[test]
fn decors_on_hidden_faces_are_skipped() {
    let (mut tess, reg) = tesselator(8);
    let coord = ChunkCoord::new(0, 0, 0);
    let stone = id(&reg, "stone");
    let mut chunk = ChunkData::empty(coord, 8);
    chunk.set_solid(2, 2, 2, stone);
    chunk.set_solid(2, 3, 2, stone);
    chunk.add_decor((2, 2, 2), Face::PosY, (8, 8), 0, id(&reg, "moss"));
    let mut state = ChunkMeshState::default();
    tess.process_chunk(coord, &Neighborhood::new(Some(Arc::new(chunk))), false, &mut state)
        .unwrap();
    assert_eq!(quad_count(&state.center), 10);
}

#[test]
fn decors_on_outward_faces_of_border_blocks() {
    let (mut tess, reg) = tesselator(8);
    let coord = ChunkCoord::new(0, 0, 0);
    let stone = id(&reg, "stone");
    let moss = id(&reg, "moss");
    let mut chunk = ChunkData::empty(coord, 8);
    for (host, face) in [
        ((0, 3, 3), Face::NegX),
        ((7, 3, 3), Face::PosX),
        ((3, 7, 3), Face::PosY),
        ((3, 0, 3), Face::NegY),
        ((3, 3, 0), Face::NegZ),
        ((3, 3, 7), Face::PosZ),
    ] {
        chunk.set_solid(host.0, host.1, host.2, stone);
        chunk.add_decor(host, face, (8, 8), 0, moss);
    }
    let n = Neighborhood::new(Some(Arc::new(chunk)));
    let mut state = ChunkMeshState::default();
    tess.process_chunk(coord, &n, false, &mut state).unwrap();
    assert!(state.center.is_empty());
    assert_eq!(quad_count(&state.edge), 6 * 6 + 6);

    tess.process_chunk(coord, &n, true, &mut state).unwrap();
    assert_eq!(tess.stats().edge_only, 1);
    assert_eq!(quad_count(&state.edge), 6 * 6 + 6);
}

#[test]
fn always_visible_decor_survives_a_hidden_host_face() {
    let (mut tess, reg) = tesselator(8);
    let coord = ChunkCoord::new(0, 0, 0);
    let stone = id(&reg, "stone");
    let mut chunk = ChunkData::empty(coord, 8);
    chunk.set_solid(2, 2, 2, stone);
    chunk.set_solid(2, 3, 2, stone);
    chunk.add_decor((2, 2, 2), Face::PosY, (8, 8), 0, id(&reg, "vine"));
    let mut state = ChunkMeshState::default();
    tess.process_chunk(coord, &Neighborhood::new(Some(Arc::new(chunk))), false, &mut state)
        .unwrap();
    assert_eq!(quad_count(&state.center), 11);
}

#[test]
fn height_adjustable_decor_rests_on_the_host_top() {
    let lowest = |host: &str| {
        let (mut tess, reg) = tesselator(8);
        let coord = ChunkCoord::new(0, 0, 0);
        let mut chunk = ChunkData::empty(coord, 8);
        chunk.set_solid(2, 2, 2, id(&reg, host));
        chunk.add_decor((2, 2, 2), Face::PosY, (8, 8), 0, id(&reg, "pad"));
        let mut state = ChunkMeshState::default();
        tess.process_chunk(coord, &Neighborhood::new(Some(Arc::new(chunk))), false, &mut state)
            .unwrap();
        meshes(&state.center)
            .iter()
            .filter(|(pass, ..)| *pass == RenderPass::Transparent)
            .flat_map(|(.., m)| m.positions().map(|p| p.y).collect::<Vec<_>>())
            .fold(f32::INFINITY, f32::min)
    };
    let on_stone = lowest("stone");
    let on_snow = lowest("snow");
    assert!(on_stone > 3.0 && on_stone < 3.1, "{on_stone}");
    // a one-eighth snow block drops the decor by seven eighths
    assert!((on_stone - on_snow - 0.875).abs() < 1e-5, "{on_stone} {on_snow}");
}

struct NoTextures;

impl TextureResolver for NoTextures {
    fn resolve(&self, _block: &BlockType, _role: TextureRole) -> Option<TextureLocation> {
        None
    }

    fn unknown(&self) -> TextureLocation {
        TextureLocation {
            atlas: ATLAS,
            rect: tessel_mesh_cpu::TexRect::FULL,
        }
    }
}

#[test]
fn unresolved_textures_and_shapes_fall_back() {
    let (mut tess, reg, _) = tesselator_with(4, Arc::new(NoTextures));
    let coord = ChunkCoord::new(0, 0, 0);
    let mut chunk = ChunkData::empty(coord, 4);
    chunk.set_solid(0, 0, 0, id(&reg, "stone"));
    chunk.set_solid(3, 3, 3, id(&reg, "lantern"));
    let mut state = ChunkMeshState::default();
    tess.process_chunk(coord, &Neighborhood::new(Some(Arc::new(chunk))), false, &mut state)
        .unwrap();
    assert_eq!(quad_count(&state.edge), 12);
}

#[test]
fn mismatched_neighbor_size_is_an_error() {
    let (mut tess, _) = tesselator(8);
    let coord = ChunkCoord::new(0, 0, 0);
    let mut n = Neighborhood::new(Some(Arc::new(ChunkData::empty(coord, 8))));
    n.set(0, 1, 0, Some(Arc::new(ChunkData::empty(coord.offset(0, 1, 0), 4))));
    let err = tess.begin_process_chunk(coord, &n, false).unwrap_err();
    assert!(matches!(
        err,
        TesselateError::ChunkSizeMismatch {
            expected: 8,
            found: 4,
            ..
        }
    ));
}

#[test]
fn dropped_output_returns_to_recycler() {
    let (mut tess, reg) = tesselator(4);
    let coord = ChunkCoord::new(0, 0, 0);
    let n = Neighborhood::new(Some(Arc::new(ChunkData::filled(coord, 4, id(&reg, "stone")))));
    let mut state = ChunkMeshState::default();
    tess.process_chunk(coord, &n, false, &mut state).unwrap();
    assert_eq!(tess.recycler().spare(), 0);
    state.clear();
    assert!(tess.recycler().spare() > 0);
    let created = tess.recycler().created();
    tess.process_chunk(coord, &n, false, &mut state).unwrap();
    assert_eq!(tess.recycler().created(), created);
    assert!(tess.recycler().reused() > 0);
}
