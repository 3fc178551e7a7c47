use serde::{Deserialize, Serialize};
use tessel_geom::Face;

pub type BlockId = u16;

/// Block id 0 is always air in every registry.
pub const AIR: BlockId = 0;

/// Substance identity ("water", "stone"), compared by the *Material cull modes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct MaterialId(pub u16);

/// Texture key resolved to an atlas location by the mesher's texture resolver.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct TextureId(pub u16);

/// Climate or season color map; 0 means "no map".
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct ColorMapId(pub u8);

// Visual category of a block; selects the emission strategy in the mesher.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawType {
    #[default]
    Empty,
    Cube,
    CubeHeight,
    Cross,
    CrossAndSnow,
    Liquid,
    TopSoil,
    Shape,
    ShapeAndLiquid,
    ShapeAndSnow,
    SurfaceLayer,
    Transparent,
}

impl DrawType {
    pub const COUNT: usize = 12;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether this draw type's geometry reaches the cell boundary on `face`.
    /// Height-limited blocks and surface decals leave their top face inside the
    /// cell, so an opaque block above must not hide it.
    #[inline]
    pub fn covers_side(self, face: Face) -> bool {
        match self {
            DrawType::CubeHeight | DrawType::SurfaceLayer => face != Face::PosY,
            _ => true,
        }
    }

    /// Draw types that carry a snow layer whose presence depends on position.
    #[inline]
    pub fn is_snow_overlay(self) -> bool {
        matches!(self, DrawType::CrossAndSnow | DrawType::ShapeAndSnow)
    }

    /// Solid-layer draw types that also render a water surface in their cell.
    #[inline]
    pub fn is_water_surface_overlay(self) -> bool {
        matches!(self, DrawType::ShapeAndLiquid)
    }

    #[inline]
    pub fn is_liquid(self) -> bool {
        matches!(self, DrawType::Liquid)
    }

    /// Full-cell cubes whose six sides default to opaque.
    #[inline]
    pub fn is_full_cube(self) -> bool {
        matches!(self, DrawType::Cube | DrawType::TopSoil)
    }
}

// Per-block face culling policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullMode {
    #[default]
    Default,
    NeverCull,
    Merge,
    Collapse,
    MergeMaterial,
    CollapseMaterial,
    Liquid,
    Callback,
    MergeSnowLayer,
    FlushExceptTop,
    Stairs,
}

impl CullMode {
    #[inline]
    pub fn is_collapse(self) -> bool {
        matches!(self, CullMode::Collapse | CullMode::CollapseMaterial)
    }
}

// GPU pipeline bucket geometry is sorted into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPass {
    #[default]
    Opaque,
    OpaqueNoCull,
    BlendNoCull,
    Transparent,
    Liquid,
    TopSoil,
}

impl RenderPass {
    pub const COUNT: usize = 6;
    pub const ALL: [RenderPass; RenderPass::COUNT] = [
        RenderPass::Opaque,
        RenderPass::OpaqueNoCull,
        RenderPass::BlendNoCull,
        RenderPass::Transparent,
        RenderPass::Liquid,
        RenderPass::TopSoil,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

// Used by cube-like draw types to resolve which texture to apply
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Top,
    Bottom,
    Side,
    Overlay,
}

impl TextureRole {
    #[inline]
    pub fn for_face(face: Face) -> TextureRole {
        match face {
            Face::PosY => TextureRole::Top,
            Face::NegY => TextureRole::Bottom,
            _ => TextureRole::Side,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockTextures {
    pub top: TextureId,
    pub bottom: TextureId,
    pub side: TextureId,
    pub overlay: Option<TextureId>,
}

impl BlockTextures {
    #[inline]
    pub fn get(&self, role: TextureRole) -> TextureId {
        match role {
            TextureRole::Top => self.top,
            TextureRole::Bottom => self.bottom,
            TextureRole::Side => self.side,
            TextureRole::Overlay => self.overlay.unwrap_or(self.top),
        }
    }
}
