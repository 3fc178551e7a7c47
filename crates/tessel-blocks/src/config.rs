use serde::Deserialize;

use crate::types::{CullMode, DrawType, RenderPass};

// Top-level blocks config file
#[derive(Deserialize, Debug, Default)]
pub struct BlocksConfig {
    pub blocks: Vec<BlockDef>,
    // Block used when an id has no definition. Falls back to `air` if absent.
    #[serde(default)]
    pub unknown_block: Option<String>,
    // Block whose textures render snow layers on snow-overlay draw types.
    #[serde(default)]
    pub snow_block: Option<String>,
    // Block whose textures render water surfaces inside shape-and-liquid blocks.
    #[serde(default)]
    pub water_block: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub draw: Option<DrawType>,
    #[serde(default)]
    pub cull: Option<CullMode>,
    #[serde(default)]
    pub pass: Option<RenderPass>,
    // Substance material; defaults to the block name.
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub textures: Option<TexturesDef>,
    // Height in eighths for cube_height blocks.
    #[serde(default)]
    pub height: Option<u8>,
    #[serde(default)]
    pub side_opaque: Option<SidesDef>,
    #[serde(default)]
    pub side_solid: Option<SidesDef>,
    #[serde(default)]
    pub lod: Option<u8>,
    #[serde(default)]
    pub climate_map: Option<String>,
    #[serde(default)]
    pub season_map: Option<String>,
    #[serde(default)]
    pub random_offset: Option<bool>,
    #[serde(default)]
    pub wind_wave: Option<bool>,
    #[serde(default)]
    pub decor_always_visible: Option<bool>,
    #[serde(default)]
    pub decor_height_adjustable: Option<bool>,
    #[serde(default)]
    pub decor_nudge: Option<bool>,
    #[serde(default)]
    pub snow_level: Option<u8>,
    #[serde(default)]
    pub snow_cover: Option<SnowCoverCfg>,
    // Shape key handed to the shape voxelizer; defaults to the block name.
    #[serde(default)]
    pub shape: Option<String>,
}

// Texture mapping: all/top/bottom/side plus an optional blend overlay
#[derive(Deserialize, Debug, Clone, Default)]
pub struct TexturesDef {
    #[serde(default)]
    pub all: Option<String>,
    #[serde(default)]
    pub top: Option<String>,
    #[serde(default)]
    pub bottom: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub overlay: Option<String>,
}

// Sides config supports `true`/`false` or a list of side names
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum SidesDef {
    All(bool),
    List(Vec<String>),
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnowCoverCfg {
    Always,
    Never,
    Callback,
}
