use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, Deserialize)]
pub struct TesselConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_sea_level")]
    pub sea_level: i32,
    /// 0 uses every available core.
    #[serde(default)]
    pub workers: usize,
    /// Chunks generated on each side of the origin along X and Z.
    #[serde(default = "default_radius")]
    pub radius: i32,
    /// Vertical chunk layers, starting at y = 0.
    #[serde(default = "default_layers")]
    pub layers: i32,
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_atlas_count")]
    pub atlas_count: u32,
    #[serde(default = "default_atlas_columns")]
    pub atlas_columns: u32,
    #[serde(default = "default_max_spare")]
    pub max_spare_meshes: usize,
    /// Resubmit every chunk edge-only after the first pass.
    #[serde(default)]
    pub edge_pass: bool,
    #[serde(default)]
    pub world: WorldConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_height_freq")]
    pub frequency: f32,
    #[serde(default = "default_min_y_ratio")]
    pub min_y_ratio: f32,
    #[serde(default = "default_max_y_ratio")]
    pub max_y_ratio: f32,
    /// Surface height ratio above which tops get snow.
    #[serde(default = "default_snow_thr")]
    pub snow_threshold: f32,
    #[serde(default = "default_topsoil")]
    pub topsoil_thickness: i32,
    /// Fraction of grass tops that carry a plant.
    #[serde(default = "default_plant_density")]
    pub plant_density: f32,
    /// Fraction of exposed stone sides that carry moss.
    #[serde(default = "default_moss_density")]
    pub moss_density: f32,
}

fn default_chunk_size() -> usize {
    32
}
fn default_sea_level() -> i32 {
    20
}
fn default_radius() -> i32 {
    2
}
fn default_layers() -> i32 {
    2
}
fn default_seed() -> i32 {
    1337
}
fn default_atlas_count() -> u32 {
    2
}
fn default_atlas_columns() -> u32 {
    16
}
fn default_max_spare() -> usize {
    256
}
fn default_height_freq() -> f32 {
    0.02
}
fn default_min_y_ratio() -> f32 {
    0.15
}
fn default_max_y_ratio() -> f32 {
    0.70
}
fn default_snow_thr() -> f32 {
    0.62
}
fn default_topsoil() -> i32 {
    3
}
fn default_plant_density() -> f32 {
    0.12
}
fn default_moss_density() -> f32 {
    0.08
}

impl Default for TesselConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            sea_level: default_sea_level(),
            workers: 0,
            radius: default_radius(),
            layers: default_layers(),
            seed: default_seed(),
            atlas_count: default_atlas_count(),
            atlas_columns: default_atlas_columns(),
            max_spare_meshes: default_max_spare(),
            edge_pass: false,
            world: WorldConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            frequency: default_height_freq(),
            min_y_ratio: default_min_y_ratio(),
            max_y_ratio: default_max_y_ratio(),
            snow_threshold: default_snow_thr(),
            topsoil_thickness: default_topsoil(),
            plant_density: default_plant_density(),
            moss_density: default_moss_density(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read error {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl TesselConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// World height covered by the generated layers.
    pub fn world_height(&self) -> i32 {
        self.layers * self.chunk_size as i32
    }
}
