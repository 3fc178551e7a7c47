use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tessel_geom::Face;
use thiserror::Error;

use crate::catalog::NameCatalog;
use crate::config::{BlockDef, BlocksConfig, SidesDef, SnowCoverCfg, TexturesDef};
use crate::predicates::{CullHook, CullPredicate, SnowCover, SnowCoverPredicate};
use crate::types::{
    AIR, BlockId, BlockTextures, ColorMapId, CullMode, DrawType, MaterialId, RenderPass,
    TextureId, TextureRole,
};

pub const ALL_SIDES: u8 = 0b11_1111;
pub const FULL_HEIGHT: u8 = 8;
pub const MAX_LOD: u8 = 3;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid blocks config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("duplicate block name `{0}`")]
    DuplicateName(String),
    #[error("duplicate block id {0}")]
    DuplicateId(BlockId),
    #[error("unknown block `{0}`")]
    UnknownBlock(String),
    #[error("block `{block}`: {reason}")]
    Invalid { block: String, reason: String },
}

/// Compiled, render-facing description of one block id.
#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub draw: DrawType,
    pub cull: CullMode,
    pub pass: RenderPass,
    pub material: MaterialId,
    pub textures: BlockTextures,
    /// Height in eighths of a cell; 8 for full blocks.
    pub height: u8,
    /// Bit per `Face`: this side hides an adjacent neighbor's face.
    pub side_opaque: u8,
    /// Bit per `Face`: this side is physically closed (liquids stop here).
    pub side_solid: u8,
    pub lod: u8,
    pub climate_map: ColorMapId,
    pub season_map: ColorMapId,
    pub random_offset: bool,
    pub wind_wave: bool,
    pub decor_always_visible: bool,
    pub decor_height_adjustable: bool,
    pub decor_nudge: bool,
    pub snow_level: u8,
    pub snow_cover: SnowCover,
    pub shape_key: String,
    pub cull_hook: Option<CullHook>,
}

impl BlockType {
    pub fn air() -> Self {
        Self::placeholder(AIR, "air")
    }

    fn placeholder(id: BlockId, name: &str) -> Self {
        BlockType {
            id,
            name: name.to_string(),
            draw: DrawType::Empty,
            cull: CullMode::Default,
            pass: RenderPass::Opaque,
            material: MaterialId(0),
            textures: BlockTextures::default(),
            height: FULL_HEIGHT,
            side_opaque: 0,
            side_solid: 0,
            lod: 1,
            climate_map: ColorMapId(0),
            season_map: ColorMapId(0),
            random_offset: false,
            wind_wave: false,
            decor_always_visible: false,
            decor_height_adjustable: false,
            decor_nudge: false,
            snow_level: 0,
            snow_cover: SnowCover::Always,
            shape_key: String::new(),
            cull_hook: None,
        }
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.id == AIR || self.draw == DrawType::Empty
    }

    #[inline]
    pub fn side_opaque(&self, face: Face) -> bool {
        self.side_opaque & face.bit() != 0
    }

    #[inline]
    pub fn side_solid(&self, face: Face) -> bool {
        self.side_solid & face.bit() != 0
    }

    #[inline]
    pub fn texture(&self, role: TextureRole) -> TextureId {
        self.textures.get(role)
    }

    #[inline]
    pub fn allows_snow(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self.snow_cover.allows(wx, wy, wz)
    }

    #[inline]
    pub fn has_color_map(&self) -> bool {
        self.climate_map.0 != 0 || self.season_map.0 != 0
    }
}

#[derive(Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockType>,
    pub by_name: HashMap<String, BlockId>,
    pub materials: NameCatalog,
    pub textures: NameCatalog,
    pub color_maps: NameCatalog,
    pub unknown_block_id: Option<BlockId>,
    pub snow_block_id: Option<BlockId>,
    pub water_block_id: Option<BlockId>,
    fallback: usize,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// A registry that only knows air.
    pub fn new() -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("air".to_string(), AIR);
        Self {
            blocks: vec![BlockType::air()],
            by_name,
            materials: NameCatalog::new(),
            textures: NameCatalog::new(),
            color_maps: NameCatalog::new(),
            unknown_block_id: None,
            snow_block_id: None,
            water_block_id: None,
            fallback: 0,
        }
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize).filter(|t| !t.name.is_empty())
    }

    /// Like `get`, but undefined ids resolve to the unknown block (or air).
    #[inline]
    pub fn block(&self, id: BlockId) -> &BlockType {
        match self.blocks.get(id as usize) {
            Some(t) if !t.name.is_empty() => t,
            _ => &self.blocks[self.fallback],
        }
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, RegistryError> {
        let cfg: BlocksConfig = toml::from_str(toml_str)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, RegistryError> {
        let mut reg = BlockRegistry::new();
        for def in cfg.blocks.into_iter() {
            if def.name == "air" {
                if def.id.is_some_and(|id| id != AIR) {
                    return Err(RegistryError::Invalid {
                        block: def.name,
                        reason: "air is always id 0".into(),
                    });
                }
                continue;
            }
            if reg.by_name.contains_key(&def.name) {
                return Err(RegistryError::DuplicateName(def.name));
            }
            let id = match def.id {
                Some(AIR) => {
                    return Err(RegistryError::Invalid {
                        block: def.name,
                        reason: "id 0 is reserved for air".into(),
                    });
                }
                Some(id) => id,
                None => reg.blocks.len() as BlockId,
            };
            let ty = reg.compile_block(id, def)?;
            let slot = id as usize;
            if slot >= reg.blocks.len() {
                let start = reg.blocks.len();
                for fill in start..=slot {
                    reg.blocks.push(BlockType::placeholder(fill as BlockId, ""));
                }
            } else if !reg.blocks[slot].name.is_empty() {
                return Err(RegistryError::DuplicateId(id));
            }
            reg.by_name.insert(ty.name.clone(), id);
            reg.blocks[slot] = ty;
        }
        reg.unknown_block_id = reg.lookup_optional(cfg.unknown_block.as_deref())?;
        reg.snow_block_id = reg.lookup_optional(cfg.snow_block.as_deref())?;
        reg.water_block_id = reg.lookup_optional(cfg.water_block.as_deref())?;
        reg.fallback = reg.unknown_block_id.map(|id| id as usize).unwrap_or(0);
        Ok(reg)
    }

    fn lookup_optional(&self, name: Option<&str>) -> Result<Option<BlockId>, RegistryError> {
        match name {
            None => Ok(None),
            Some(n) => self
                .id_by_name(n)
                .map(Some)
                .ok_or_else(|| RegistryError::UnknownBlock(n.to_string())),
        }
    }

    fn compile_block(&mut self, id: BlockId, def: BlockDef) -> Result<BlockType, RegistryError> {
        let draw = def.draw.unwrap_or(DrawType::Cube);
        let invalid = |reason: String| RegistryError::Invalid {
            block: def.name.clone(),
            reason,
        };

        let height = match draw {
            DrawType::CubeHeight => def.height.unwrap_or(1),
            _ => def.height.unwrap_or(FULL_HEIGHT),
        };
        if height == 0 || height > FULL_HEIGHT {
            return Err(invalid(format!("height {height} outside 1..=8")));
        }
        let lod = def.lod.unwrap_or(match draw {
            DrawType::Cross | DrawType::CrossAndSnow => 0,
            _ => 1,
        });
        if lod > MAX_LOD {
            return Err(invalid(format!("lod {lod} outside 0..=3")));
        }

        let side_opaque = match &def.side_opaque {
            Some(s) => parse_sides(s).map_err(invalid)?,
            None => default_side_opaque(draw, height),
        };
        let side_solid = match &def.side_solid {
            Some(s) => parse_sides(s).map_err(invalid)?,
            None => default_side_solid(draw, height),
        };
        let cull = def.cull.unwrap_or(match draw {
            DrawType::Liquid => CullMode::Liquid,
            DrawType::Transparent => CullMode::Merge,
            DrawType::Shape | DrawType::ShapeAndLiquid | DrawType::ShapeAndSnow => {
                CullMode::NeverCull
            }
            _ => CullMode::Default,
        });
        let pass = def.pass.unwrap_or(match draw {
            DrawType::Liquid => RenderPass::Liquid,
            DrawType::Transparent => RenderPass::Transparent,
            DrawType::Cross | DrawType::CrossAndSnow => RenderPass::OpaqueNoCull,
            _ => RenderPass::Opaque,
        });
        let snow_level = def.snow_level.unwrap_or(match cull {
            CullMode::MergeSnowLayer => height,
            _ => 0,
        });
        let snow_cover = match def.snow_cover {
            None | Some(SnowCoverCfg::Always) => SnowCover::Always,
            Some(SnowCoverCfg::Never) => SnowCover::Never,
            Some(SnowCoverCfg::Callback) => SnowCover::Pending,
        };

        let material = MaterialId(
            self.materials
                .intern(def.material.as_deref().unwrap_or(def.name.as_str())),
        );
        let textures = self.compile_textures(&def.name, def.textures.as_ref());
        let climate_map = ColorMapId(self.intern_color_map(def.climate_map.as_deref()).map_err(invalid)?);
        let season_map = ColorMapId(self.intern_color_map(def.season_map.as_deref()).map_err(invalid)?);

        Ok(BlockType {
            id,
            shape_key: def.shape.clone().unwrap_or_else(|| def.name.clone()),
            name: def.name,
            draw,
            cull,
            pass,
            material,
            textures,
            height,
            side_opaque,
            side_solid,
            lod,
            climate_map,
            season_map,
            random_offset: def.random_offset.unwrap_or(false),
            wind_wave: def.wind_wave.unwrap_or(false),
            decor_always_visible: def.decor_always_visible.unwrap_or(false),
            decor_height_adjustable: def.decor_height_adjustable.unwrap_or(false),
            decor_nudge: def.decor_nudge.unwrap_or(false),
            snow_level,
            snow_cover,
            cull_hook: None,
        })
    }

    fn compile_textures(&mut self, name: &str, def: Option<&TexturesDef>) -> BlockTextures {
        let empty = TexturesDef::default();
        let def = def.unwrap_or(&empty);
        let all = def.all.as_deref().unwrap_or(name);
        let mut pick =
            |k: Option<&String>| TextureId(self.textures.intern(k.map_or(all, String::as_str)));
        BlockTextures {
            top: pick(def.top.as_ref()),
            bottom: pick(def.bottom.as_ref()),
            side: pick(def.side.as_ref()),
            overlay: def
                .overlay
                .as_deref()
                .map(|k| TextureId(self.textures.intern(k))),
        }
    }

    fn intern_color_map(&mut self, name: Option<&str>) -> Result<u8, String> {
        let Some(name) = name else { return Ok(0) };
        let id = self.color_maps.intern(name);
        u8::try_from(id).map_err(|_| format!("too many color maps ({id})"))
    }

    /// Installs the predicate consulted by a `CullMode::Callback` block.
    pub fn set_cull_predicate(
        &mut self,
        block: &str,
        predicate: Arc<dyn CullPredicate>,
    ) -> Result<(), RegistryError> {
        let id = self
            .id_by_name(block)
            .ok_or_else(|| RegistryError::UnknownBlock(block.to_string()))?;
        let ty = &mut self.blocks[id as usize];
        if ty.cull != CullMode::Callback {
            log::warn!(
                "cull predicate installed on `{}` whose cull mode is {:?}; it will be ignored",
                block,
                ty.cull
            );
        }
        ty.cull_hook = Some(CullHook(predicate));
        Ok(())
    }

    /// Installs the snow-coverage predicate for a block.
    pub fn set_snow_predicate(
        &mut self,
        block: &str,
        predicate: Arc<dyn SnowCoverPredicate>,
    ) -> Result<(), RegistryError> {
        let id = self
            .id_by_name(block)
            .ok_or_else(|| RegistryError::UnknownBlock(block.to_string()))?;
        self.blocks[id as usize].snow_cover = SnowCover::Predicate(predicate);
        Ok(())
    }
}

fn default_side_opaque(draw: DrawType, height: u8) -> u8 {
    match draw {
        DrawType::Cube | DrawType::TopSoil => ALL_SIDES,
        DrawType::CubeHeight if height == FULL_HEIGHT => ALL_SIDES,
        DrawType::CubeHeight | DrawType::CrossAndSnow | DrawType::ShapeAndSnow => {
            Face::NegY.bit()
        }
        _ => 0,
    }
}

fn default_side_solid(draw: DrawType, height: u8) -> u8 {
    match draw {
        DrawType::Cube | DrawType::TopSoil | DrawType::Transparent => ALL_SIDES,
        DrawType::CubeHeight if height == FULL_HEIGHT => ALL_SIDES,
        DrawType::CubeHeight => Face::NegY.bit(),
        _ => 0,
    }
}

fn parse_sides(def: &SidesDef) -> Result<u8, String> {
    match def {
        SidesDef::All(true) => Ok(ALL_SIDES),
        SidesDef::All(false) => Ok(0),
        SidesDef::List(names) => names.iter().try_fold(0u8, |mask, n| {
            let face = match n.as_str() {
                "top" => Face::PosY,
                "bottom" => Face::NegY,
                "east" => Face::PosX,
                "west" => Face::NegX,
                "south" => Face::PosZ,
                "north" => Face::NegZ,
                other => return Err(format!("unknown side `{other}`")),
            };
            Ok(mask | face.bit())
        }),
    }
}
