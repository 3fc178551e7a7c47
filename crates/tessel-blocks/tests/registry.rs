use std::sync::Arc;

use tessel_blocks::config::{BlockDef, BlocksConfig, SidesDef};
use tessel_blocks::{
    AIR, BlockRegistry, CullMode, CullQuery, DrawType, RegistryError, RenderPass, TextureRole,
};
use tessel_geom::Face;

const SAMPLE: &str = r#"
unknown_block = "unknown"
water_block = "water"

[[blocks]]
name = "stone"

[[blocks]]
name = "water"
draw = "liquid"

[[blocks]]
name = "grass"
draw = "top_soil"
textures = { top = "grass_top", bottom = "dirt", side = "grass_side" }
climate_map = "grass"

[[blocks]]
name = "snow_layer"
draw = "cube_height"
cull = "merge_snow_layer"
height = 2

[[blocks]]
name = "fern"
draw = "cross"

[[blocks]]
name = "slab"
draw = "cube"
side_opaque = ["bottom", "east"]

[[blocks]]
name = "unknown"
id = 40
"#;

#[test]
fn air_is_always_id_zero() {
    let reg = BlockRegistry::from_toml_str(SAMPLE).expect("registry");
    let air = reg.get(AIR).expect("air");
    assert_eq!(air.name, "air");
    assert_eq!(air.draw, DrawType::Empty);
    assert_eq!(reg.id_by_name("air"), Some(AIR));
    assert_eq!(reg.id_by_name("stone"), Some(1));
}

#[test]
fn draw_type_defaults() {
    let reg = BlockRegistry::from_toml_str(SAMPLE).unwrap();
    let stone = reg.block(reg.id_by_name("stone").unwrap());
    assert_eq!(stone.draw, DrawType::Cube);
    assert!(Face::ALL.iter().all(|&f| stone.side_opaque(f) && stone.side_solid(f)));

    let water = reg.block(reg.id_by_name("water").unwrap());
    assert_eq!(water.cull, CullMode::Liquid);
    assert_eq!(water.pass, RenderPass::Liquid);
    assert_eq!(water.side_opaque, 0);

    let snow = reg.block(reg.id_by_name("snow_layer").unwrap());
    assert_eq!(snow.height, 2);
    assert_eq!(snow.snow_level, 2);
    assert!(snow.side_opaque(Face::NegY));
    assert!(!snow.side_opaque(Face::PosX));

    let fern = reg.block(reg.id_by_name("fern").unwrap());
    assert_eq!(fern.lod, 0);
    assert_eq!(fern.pass, RenderPass::OpaqueNoCull);
    assert_eq!(stone.lod, 1);
}

#[test]
fn explicit_side_lists_and_textures() {
    let reg = BlockRegistry::from_toml_str(SAMPLE).unwrap();
    let slab = reg.block(reg.id_by_name("slab").unwrap());
    assert!(slab.side_opaque(Face::NegY));
    assert!(slab.side_opaque(Face::PosX));
    assert!(!slab.side_opaque(Face::PosY));

    let grass = reg.block(reg.id_by_name("grass").unwrap());
    let top = grass.texture(TextureRole::Top);
    let side = grass.texture(TextureRole::Side);
    assert_ne!(top, side);
    assert_eq!(reg.textures.name(top.0), Some("grass_top"));
    assert_eq!(grass.texture(TextureRole::Overlay), top);
    assert!(grass.has_color_map());
}

#[test]
fn gaps_fall_back_to_unknown_block() {
    let reg = BlockRegistry::from_toml_str(SAMPLE).unwrap();
    assert_eq!(reg.unknown_block_id, Some(40));
    assert!(reg.get(30).is_none());
    assert_eq!(reg.block(30).name, "unknown");
    assert_eq!(reg.block(999).name, "unknown");
    assert_eq!(reg.water_block_id, reg.id_by_name("water"));
}

#[test]
fn undefined_ids_are_air_without_unknown_block() {
    let reg = BlockRegistry::from_toml_str("[[blocks]]\nname = \"stone\"\n").unwrap();
    assert_eq!(reg.block(17).id, AIR);
}

#[test]
fn rejects_duplicates_and_bad_values() {
    let dup = BlocksConfig {
        blocks: vec![
            BlockDef { name: "a".into(), ..Default::default() },
            BlockDef { name: "a".into(), ..Default::default() },
        ],
        ..Default::default()
    };
    assert!(matches!(BlockRegistry::from_config(dup), Err(RegistryError::DuplicateName(_))));

    let dup_id = BlocksConfig {
        blocks: vec![
            BlockDef { name: "a".into(), id: Some(3), ..Default::default() },
            BlockDef { name: "b".into(), id: Some(3), ..Default::default() },
        ],
        ..Default::default()
    };
    assert!(matches!(BlockRegistry::from_config(dup_id), Err(RegistryError::DuplicateId(3))));

    let bad_side = BlocksConfig {
        blocks: vec![BlockDef {
            name: "a".into(),
            side_opaque: Some(SidesDef::List(vec!["up".into()])),
            ..Default::default()
        }],
        ..Default::default()
    };
    assert!(matches!(BlockRegistry::from_config(bad_side), Err(RegistryError::Invalid { .. })));

    let err = BlockRegistry::from_toml_str("unknown_block = \"nope\"\nblocks = []\n").unwrap_err();
    assert!(matches!(err, RegistryError::UnknownBlock(ref n) if n == "nope"));

    assert!(matches!(
        BlockRegistry::from_toml_str("blocks = [ { name = \"x\", lod = 9 } ]"),
        Err(RegistryError::Invalid { .. })
    ));
    assert!(matches!(BlockRegistry::from_toml_str("blocks = 3"), Err(RegistryError::Toml(_))));
}

#[test]
fn installs_predicates() {
    let mut reg = BlockRegistry::from_toml_str(
        "[[blocks]]\nname = \"vine\"\ndraw = \"cross\"\ncull = \"callback\"\nsnow_cover = \"callback\"\n",
    )
    .unwrap();
    reg.set_cull_predicate("vine", Arc::new(|q: &CullQuery<'_>| q.face == Face::PosY))
        .unwrap();
    reg.set_snow_predicate("vine", Arc::new(|_x: i32, y: i32, _z: i32| y > 10))
        .unwrap();
    let vine = reg.block(reg.id_by_name("vine").unwrap());
    let air = reg.block(AIR);
    let hook = vine.cull_hook.as_ref().expect("hook");
    assert!(hook.0.cull(&CullQuery { face: Face::PosY, neighbor: air, flat_index: 0 }));
    assert!(!hook.0.cull(&CullQuery { face: Face::NegY, neighbor: air, flat_index: 0 }));
    assert!(vine.allows_snow(0, 11, 0));
    assert!(!vine.allows_snow(0, 3, 0));

    assert!(matches!(
        reg.set_snow_predicate("ghost", Arc::new(|_: i32, _: i32, _: i32| true)),
        Err(RegistryError::UnknownBlock(_))
    ));
}

#[test]
fn loads_bundled_assets() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/blocks.toml");
    let reg = BlockRegistry::load_from_path(&path).expect("assets/blocks.toml");
    assert!(reg.id_by_name("stone").is_some());
    assert!(reg.unknown_block_id.is_some());
}
