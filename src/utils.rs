use image::RgbaImage;
use nalgebra::{Point3, Vector3};

use crate::render_system::{vec_math::Vec4, vertex::Vertex3D};

// two triangles covering the face a-b-c-d, listed counterclockwise
fn face(a: [f32; 3], b: [f32; 3], c: [f32; 3], d: [f32; 3], normal: [f32; 3]) -> [Vertex3D; 6] {
    [
        Vertex3D::new(a, normal, [0.0, 0.0]),
        Vertex3D::new(b, normal, [1.0, 0.0]),
        Vertex3D::new(c, normal, [1.0, 1.0]),
        Vertex3D::new(a, normal, [0.0, 0.0]),
        Vertex3D::new(c, normal, [1.0, 1.0]),
        Vertex3D::new(d, normal, [0.0, 1.0]),
    ]
}

/// Flat rectangle in the xz plane facing +y, centered on `loc`.
pub fn quad(loc: Point3<f32>, width: f32, depth: f32) -> Vec<Vertex3D> {
    let hx = 0.5 * width;
    let hz = 0.5 * depth;
    let y = loc[1];
    face(
        [loc[0] - hx, y, loc[2] + hz],
        [loc[0] + hx, y, loc[2] + hz],
        [loc[0] + hx, y, loc[2] - hz],
        [loc[0] - hx, y, loc[2] - hz],
        [0.0, 1.0, 0.0],
    )
    .to_vec()
}

pub fn cuboid(loc: Point3<f32>, dims: Vector3<f32>) -> Vec<Vertex3D> {
    let fx = loc[0] - 0.5 * dims[0];
    let fy = loc[1] - 0.5 * dims[1];
    let fz = loc[2] - 0.5 * dims[2];

    let v000 = [fx, fy, fz];
    let v100 = [fx + dims[0], fy, fz];
    let v001 = [fx, fy, fz + dims[2]];
    let v101 = [fx + dims[0], fy, fz + dims[2]];
    let v010 = [fx, fy + dims[1], fz];
    let v110 = [fx + dims[0], fy + dims[1], fz];
    let v011 = [fx, fy + dims[1], fz + dims[2]];
    let v111 = [fx + dims[0], fy + dims[1], fz + dims[2]];

    let mut vertexes = vec![];
    // left face
    vertexes.extend(face(v000, v001, v011, v010, [-1.0, 0.0, 0.0]));
    // right face
    vertexes.extend(face(v101, v100, v110, v111, [1.0, 0.0, 0.0]));
    // lower face
    vertexes.extend(face(v000, v100, v101, v001, [0.0, -1.0, 0.0]));
    // upper face
    vertexes.extend(face(v011, v111, v110, v010, [0.0, 1.0, 0.0]));
    // back face
    vertexes.extend(face(v100, v000, v010, v110, [0.0, 0.0, -1.0]));
    // front face
    vertexes.extend(face(v001, v101, v111, v011, [0.0, 0.0, 1.0]));
    vertexes
}

pub fn unitcube() -> Vec<Vertex3D> {
    cuboid(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0))
}

/// Converts resolved `[0, 1]` colors into an 8 bit image, row 0 on top.
pub fn framebuffer_to_image(framebuffer: &[Vec4], width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let rgba = framebuffer
            .get((y * width + x) as usize)
            .copied()
            .unwrap_or_else(Vec4::zeros);
        image::Rgba(rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8).into())
    })
}
