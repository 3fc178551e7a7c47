use fastnoise_lite::{FastNoiseLite, NoiseType};
use tessel_mesh_cpu::{Climate, ClimateSampler};

use crate::worldgen::Terrain;

/// Lattice spacing, in blocks, of the climate samples.
const CELL: f32 = 16.0;

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn channel(seed: i32, frequency: f32) -> FastNoiseLite {
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_frequency(Some(frequency));
    noise
}

/// Temperature and rainfall sampled on a coarse lattice and bilinearly
/// interpolated between lattice points. Oceanity follows the terrain height
/// around the sea level.
pub struct LerpClimate {
    temperature: FastNoiseLite,
    rainfall: FastNoiseLite,
    terrain: Terrain,
    sea_level: f32,
}

impl LerpClimate {
    pub fn new(seed: i32, sea_level: i32, terrain: Terrain) -> Self {
        Self {
            temperature: channel(seed.wrapping_add(101), 0.05),
            rainfall: channel(seed.wrapping_add(202), 0.05),
            terrain,
            sea_level: sea_level as f32,
        }
    }

    fn lattice(&self, gx: f32, gz: f32) -> Climate {
        // [-1,1] -> [0,1]
        let unit = |n: f32| ((n + 1.0) * 0.5).clamp(0.0, 1.0);
        Climate {
            temperature: unit(self.temperature.get_noise_2d(gx, gz)),
            rainfall: unit(self.rainfall.get_noise_2d(gx, gz)),
        }
    }
}

impl ClimateSampler for LerpClimate {
    fn climate_at(&self, wx: f32, wz: f32) -> Climate {
        let (gx, gz) = (wx / CELL, wz / CELL);
        let (x0, z0) = (gx.floor(), gz.floor());
        let (tx, tz) = (gx - x0, gz - z0);
        let c00 = self.lattice(x0, z0);
        let c10 = self.lattice(x0 + 1.0, z0);
        let c01 = self.lattice(x0, z0 + 1.0);
        let c11 = self.lattice(x0 + 1.0, z0 + 1.0);
        let mix = |f: fn(&Climate) -> f32| {
            lerp(lerp(f(&c00), f(&c10), tx), lerp(f(&c01), f(&c11), tx), tz)
        };
        Climate {
            temperature: mix(|c| c.temperature),
            rainfall: mix(|c| c.rainfall),
        }
    }

    fn oceanity_at(&self, wx: f32, wz: f32) -> f32 {
        // 1 well below the sea level, 0 a few blocks above it
        let h = self.terrain.height_f(wx, wz);
        ((self.sea_level + 2.0 - h) / 4.0).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    fn climate() -> LerpClimate {
        LerpClimate::new(9, 20, Terrain::new(9, &WorldConfig::default(), 64))
    }

    #[test]
    fn channels_stay_in_unit_range() {
        let c = climate();
        for i in -20..20 {
            let s = c.climate_at(i as f32 * 7.3, i as f32 * -3.1);
            assert!((0.0..=1.0).contains(&s.temperature));
            assert!((0.0..=1.0).contains(&s.rainfall));
            assert!((0.0..=1.0).contains(&c.oceanity_at(i as f32 * 5.0, 0.0)));
        }
    }

    #[test]
    fn lattice_points_are_exact() {
        let c = climate();
        let at = c.climate_at(32.0, -48.0);
        let raw = c.lattice(2.0, -3.0);
        assert!((at.temperature - raw.temperature).abs() < 1e-5);
        assert!((at.rainfall - raw.rainfall).abs() < 1e-5);
    }
}
