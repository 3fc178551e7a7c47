//! Emission strategies, one per draw type.

use tessel_blocks::{BlockType, DrawType, RenderPass, TextureRole};
use tessel_geom::{Face, Vec3};

use crate::constants::{
    FACE_BITS, HEIGHT_STEPS, LIQUID_TOP, SNOW_LAYER_TOP, SURFACE_LAYER_TOP, WATER_SURFACE,
};
use crate::context::{EmitContext, EmitSink, Quad};

pub trait DrawStrategy: Sync {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>);
}

/// Strategy for a draw type; `Empty` has none.
#[inline]
pub fn strategy_for(draw: DrawType) -> Option<&'static dyn DrawStrategy> {
    STRATEGIES[draw.index()]
}

static STRATEGIES: [Option<&'static dyn DrawStrategy>; DrawType::COUNT] = [
    None,                    // Empty
    Some(&CubeDraw),         // Cube
    Some(&CubeDraw),         // CubeHeight
    Some(&CrossDraw),        // Cross
    Some(&CrossSnowDraw),    // CrossAndSnow
    Some(&LiquidDraw),       // Liquid
    Some(&TopSoilDraw),      // TopSoil
    Some(&ShapeDraw),        // Shape
    Some(&ShapeLiquidDraw),  // ShapeAndLiquid
    Some(&ShapeSnowDraw),    // ShapeAndSnow
    Some(&SurfaceLayerDraw), // SurfaceLayer
    Some(&CubeDraw),         // Transparent
];

/// Corners of one face of the box `[min, max]`, counter-clockwise seen
/// from outside.
pub(crate) fn box_face(face: Face, min: Vec3, max: Vec3) -> [Vec3; 4] {
    let v = Vec3::new;
    match face {
        Face::PosY => [
            v(min.x, max.y, min.z),
            v(min.x, max.y, max.z),
            v(max.x, max.y, max.z),
            v(max.x, max.y, min.z),
        ],
        Face::NegY => [
            v(min.x, min.y, min.z),
            v(max.x, min.y, min.z),
            v(max.x, min.y, max.z),
            v(min.x, min.y, max.z),
        ],
        Face::PosX => [
            v(max.x, min.y, min.z),
            v(max.x, max.y, min.z),
            v(max.x, max.y, max.z),
            v(max.x, min.y, max.z),
        ],
        Face::NegX => [
            v(min.x, min.y, min.z),
            v(min.x, min.y, max.z),
            v(min.x, max.y, max.z),
            v(min.x, max.y, min.z),
        ],
        Face::PosZ => [
            v(min.x, min.y, max.z),
            v(max.x, min.y, max.z),
            v(max.x, max.y, max.z),
            v(min.x, max.y, max.z),
        ],
        Face::NegZ => [
            v(min.x, min.y, min.z),
            v(min.x, max.y, min.z),
            v(max.x, max.y, min.z),
            v(max.x, min.y, min.z),
        ],
    }
}

/// Tile-local UV of a cell-space point on `face`; V grows downward.
#[inline]
pub(crate) fn face_uv(face: Face, p: Vec3) -> (f32, f32) {
    match face {
        Face::PosY | Face::NegY => (p.x, p.z),
        Face::PosX => (1.0 - p.z, 1.0 - p.y),
        Face::NegX => (p.z, 1.0 - p.y),
        Face::PosZ => (p.x, 1.0 - p.y),
        Face::NegZ => (1.0 - p.x, 1.0 - p.y),
    }
}

struct BoxStyle {
    pass: RenderPass,
    liquid: bool,
    top_custom: [f32; 4],
}

impl BoxStyle {
    fn solid(pass: RenderPass) -> Self {
        BoxStyle {
            pass,
            liquid: false,
            top_custom: [0.0; 4],
        }
    }
}

/// Emits the faces of `[min, max]` selected by `mask`, textured from `tex_block`.
fn emit_box(
    ctx: &EmitContext<'_>,
    sink: &mut EmitSink<'_>,
    tex_block: &BlockType,
    (min, max): (Vec3, Vec3),
    mask: u8,
    style: &BoxStyle,
) {
    for face in Face::ALL {
        if mask & face.bit() == 0 {
            continue;
        }
        let corners = box_face(face, min, max);
        let texture = sink.texture(tex_block, TextureRole::for_face(face));
        sink.quad(
            ctx,
            &Quad {
                corners,
                uvs: corners.map(|p| face_uv(face, p)),
                face: Some(face),
                pass: style.pass,
                texture,
                liquid: style.liquid,
                custom: if face == Face::PosY {
                    style.top_custom
                } else {
                    [0.0; 4]
                },
            },
        );
    }
}

#[inline]
fn block_top(block: &BlockType) -> f32 {
    match block.draw {
        DrawType::CubeHeight => f32::from(block.height) / HEIGHT_STEPS,
        _ => 1.0,
    }
}

fn emit_snow_layer(ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
    let snow_id = sink.registry().snow_block_id;
    let Some(snow) = sink.overlay_block(snow_id, ctx.block) else {
        return;
    };
    emit_box(
        ctx,
        sink,
        snow,
        (Vec3::ZERO, Vec3::new(1.0, SNOW_LAYER_TOP, 1.0)),
        ctx.mask & FACE_BITS,
        &BoxStyle::solid(snow.pass),
    );
}

/// Full and partial-height cubes.
pub struct CubeDraw;

impl DrawStrategy for CubeDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        let b = ctx.block;
        emit_box(
            ctx,
            sink,
            b,
            (Vec3::ZERO, Vec3::new(1.0, block_top(b), 1.0)),
            ctx.mask,
            &BoxStyle::solid(b.pass),
        );
    }
}

/// Cube plus blended overlay quads in the TopSoil pass.
pub struct TopSoilDraw;

impl DrawStrategy for TopSoilDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        CubeDraw.emit(ctx, sink);
        let b = ctx.block;
        if b.textures.overlay.is_none() {
            return;
        }
        let texture = sink.texture(b, TextureRole::Overlay);
        for face in Face::ALL {
            if face == Face::NegY || ctx.mask & face.bit() == 0 {
                continue;
            }
            let corners = box_face(face, Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
            sink.quad(
                ctx,
                &Quad {
                    corners,
                    uvs: corners.map(|p| face_uv(face, p)),
                    face: Some(face),
                    pass: RenderPass::TopSoil,
                    texture,
                    liquid: false,
                    custom: [0.0; 4],
                },
            );
        }
    }
}

/// Two crossed diagonal quads.
pub struct CrossDraw;

impl DrawStrategy for CrossDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        if ctx.mask & FACE_BITS == 0 {
            return;
        }
        let b = ctx.block;
        let h = f32::from(b.height) / HEIGHT_STEPS;
        let texture = sink.texture(b, TextureRole::Side);
        let uvs = [(0.0, 1.0), (1.0, 1.0), (1.0, 1.0 - h), (0.0, 1.0 - h)];
        let v = Vec3::new;
        for corners in [
            [v(0.0, 0.0, 0.0), v(1.0, 0.0, 1.0), v(1.0, h, 1.0), v(0.0, h, 0.0)],
            [v(1.0, 0.0, 0.0), v(0.0, 0.0, 1.0), v(0.0, h, 1.0), v(1.0, h, 0.0)],
        ] {
            sink.quad(
                ctx,
                &Quad {
                    corners,
                    uvs,
                    face: None,
                    pass: b.pass,
                    texture,
                    liquid: false,
                    custom: [0.0; 4],
                },
            );
        }
    }
}

/// Cross plus a snow layer where snow is allowed.
pub struct CrossSnowDraw;

impl DrawStrategy for CrossSnowDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        CrossDraw.emit(ctx, sink);
        if ctx.snow {
            emit_snow_layer(ctx, sink);
        }
    }
}

/// Liquid volume; the surface sits below the cell top unless liquid continues above.
pub struct LiquidDraw;

impl DrawStrategy for LiquidDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        let b = ctx.block;
        let top = if ctx.liquid_above { 1.0 } else { LIQUID_TOP };
        emit_box(
            ctx,
            sink,
            b,
            (Vec3::ZERO, Vec3::new(1.0, top, 1.0)),
            ctx.mask,
            &BoxStyle {
                pass: b.pass,
                liquid: true,
                top_custom: ctx.oceanity,
            },
        );
    }
}

fn emit_shape(ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
    let b = ctx.block;
    let Some(shape) = sink.shape(b) else {
        let texture = sink.unknown_texture();
        for face in Face::ALL {
            if ctx.mask & face.bit() == 0 {
                continue;
            }
            let corners = box_face(face, Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
            sink.quad(
                ctx,
                &Quad {
                    corners,
                    uvs: corners.map(|p| face_uv(face, p)),
                    face: Some(face),
                    pass: b.pass,
                    texture,
                    liquid: false,
                    custom: [0.0; 4],
                },
            );
        }
        return;
    };
    for q in &shape.quads {
        if q.cull_face.is_some_and(|f| ctx.mask & f.bit() == 0) {
            continue;
        }
        let texture = sink.texture(b, q.role);
        sink.quad(
            ctx,
            &Quad {
                corners: q.corners,
                uvs: q.uvs,
                face: q.face,
                pass: b.pass,
                texture,
                liquid: false,
                custom: [0.0; 4],
            },
        );
    }
}

/// Pre-baked shape fragments from the shape voxelizer.
pub struct ShapeDraw;

impl DrawStrategy for ShapeDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        emit_shape(ctx, sink);
    }
}

/// Shape plus a water surface when the cell is flagged `WATER_SURFACE`.
pub struct ShapeLiquidDraw;

impl DrawStrategy for ShapeLiquidDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        emit_shape(ctx, sink);
        if ctx.mask & WATER_SURFACE == 0 {
            return;
        }
        let water_id = sink.registry().water_block_id;
        let Some(water) = sink.overlay_block(water_id, ctx.block) else {
            return;
        };
        let corners = box_face(Face::PosY, Vec3::ZERO, Vec3::new(1.0, LIQUID_TOP, 1.0));
        let texture = sink.texture(water, TextureRole::Top);
        sink.quad(
            ctx,
            &Quad {
                corners,
                uvs: corners.map(|p| face_uv(Face::PosY, p)),
                face: Some(Face::PosY),
                pass: water.pass,
                texture,
                liquid: true,
                custom: ctx.oceanity,
            },
        );
    }
}

/// Shape plus a snow layer where snow is allowed.
pub struct ShapeSnowDraw;

impl DrawStrategy for ShapeSnowDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        emit_shape(ctx, sink);
        if ctx.snow {
            emit_snow_layer(ctx, sink);
        }
    }
}

/// Thin decal lying on the cell floor.
pub struct SurfaceLayerDraw;

impl DrawStrategy for SurfaceLayerDraw {
    fn emit(&self, ctx: &EmitContext<'_>, sink: &mut EmitSink<'_>) {
        let b = ctx.block;
        emit_box(
            ctx,
            sink,
            b,
            (Vec3::ZERO, Vec3::new(1.0, SURFACE_LAYER_TOP, 1.0)),
            ctx.mask,
            &BoxStyle::solid(b.pass),
        );
    }
}
