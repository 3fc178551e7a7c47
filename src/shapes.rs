use tessel_geom::Vec3;
use tessel_mesh_cpu::{ShapeLibrary, ShapeMesh};

fn px(v: f32) -> f32 {
    v / 16.0
}

fn cuboid(min: (f32, f32, f32), max: (f32, f32, f32)) -> ShapeMesh {
    ShapeMesh::cuboid(
        Vec3::new(px(min.0), px(min.1), px(min.2)),
        Vec3::new(px(max.0), px(max.1), px(max.2)),
    )
}

/// Box-built models for the bundled shape blocks, keyed by shape name.
pub fn demo_shapes() -> ShapeLibrary {
    let mut lib = ShapeLibrary::new();
    lib.insert(
        "lantern",
        ShapeMesh::merged([
            cuboid((5.0, 0.0, 5.0), (11.0, 7.0, 11.0)),
            cuboid((6.0, 7.0, 6.0), (10.0, 9.0, 10.0)),
        ]),
    );
    lib.insert(
        "reeds",
        ShapeMesh::merged([
            cuboid((3.0, 0.0, 3.0), (4.0, 14.0, 4.0)),
            cuboid((9.0, 0.0, 6.0), (10.0, 16.0, 7.0)),
            cuboid((6.0, 0.0, 11.0), (7.0, 12.0, 12.0)),
        ]),
    );
    lib.insert(
        "stairs",
        ShapeMesh::merged([
            cuboid((0.0, 0.0, 0.0), (16.0, 8.0, 16.0)),
            cuboid((0.0, 8.0, 8.0), (16.0, 16.0, 16.0)),
        ]),
    );
    lib.insert("snowy_rock", cuboid((2.0, 0.0, 3.0), (13.0, 6.0, 12.0)));
    lib
}
