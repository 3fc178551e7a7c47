//! Shared constants for tessel-mesh-cpu.

/// Detail levels a block can be bucketed into.
pub const LOD_COUNT: usize = 4;
pub const PARTITION_COUNT: usize = 2;

/// Low six mask bits: one per `Face`.
pub const FACE_BITS: u8 = 0x3F;
/// Solid-layer mask flag: draw a water surface in this cell.
pub const WATER_SURFACE: u8 = 1 << 6;

// Per-vertex flag layout
pub const FLAG_FACE_MASK: u32 = 0x7;
/// Face field value for quads that do not face an axis (crosses, shape fragments).
pub const FLAG_FACE_NONE: u32 = 0x7;
pub const FLAG_WIND: u32 = 1 << 3;
pub const FLAG_LIQUID: u32 = 1 << 4;
pub const FLAG_NUDGE_SHIFT: u32 = 8;
pub const FLAG_NUDGE_MASK: u32 = 0x3 << FLAG_NUDGE_SHIFT;

// Geometry, in cell units
pub(crate) const LIQUID_TOP: f32 = 7.0 / 8.0;
pub(crate) const SNOW_LAYER_TOP: f32 = 1.0 / 8.0;
pub(crate) const SURFACE_LAYER_TOP: f32 = 1.0 / 16.0;
pub(crate) const HEIGHT_STEPS: f32 = 8.0;
pub(crate) const SUB_POSITION_STEPS: f32 = 16.0;
pub(crate) const DECOR_LIFT: f32 = 1.0 / 128.0;
pub(crate) const DECOR_NUDGE_STEP: f32 = 1.0 / 512.0;

// Sampling
pub(crate) const RANDOM_OFFSET_MAX: f32 = 0.2;
pub(crate) const CLIMATE_JITTER: f32 = 2.0;
/// Temperature lost per block above sea level (0..1 scale).
pub(crate) const TEMPERATURE_LAPSE: f32 = 1.0 / 256.0;
pub(crate) const RAINFALL_LAPSE: f32 = 1.0 / 512.0;

/// Lazy first reserve for a buffer touched for the first time.
pub(crate) const INITIAL_QUAD_CAP: usize = 64;
