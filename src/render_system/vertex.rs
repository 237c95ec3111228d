#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3D {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Vertex3D {
        Vertex3D {
            position,
            normal,
            uv,
        }
    }
}
