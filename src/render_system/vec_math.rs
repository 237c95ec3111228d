use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

pub type Vec2 = Vector2<f32>;
pub type Vec3 = Vector3<f32>;
pub type Vec4 = Vector4<f32>;
// indexed as m[(row, col)], points are column vectors on the right
pub type Mat4 = Matrix4<f32>;

// threshold below which a direction is treated as the zero vector
const NEAR_ZERO_EPSILON: f32 = 1e-8;

#[inline]
pub fn reflect(v: &Vec3, n: &Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

// uv must be a unit vector and n the unit normal facing against it
#[inline]
pub fn refract(uv: &Vec3, n: &Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.norm_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

#[inline]
pub fn near_zero(v: &Vec3) -> bool {
    v.x.abs() < NEAR_ZERO_EPSILON && v.y.abs() < NEAR_ZERO_EPSILON && v.z.abs() < NEAR_ZERO_EPSILON
}

#[inline]
pub fn clamp4(v: &Vec4, min: f32, max: f32) -> Vec4 {
    v.map(|c| c.clamp(min, max))
}

#[inline]
pub fn lerp(a: &Vec3, b: &Vec3, t: f32) -> Vec3 {
    (1.0 - t) * a + t * b
}

/// Multiplies `m` with the homogeneous point `(p, 1)` and drops w.
#[inline]
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
    (m * p.push(1.0)).xyz()
}

/// Multiplies `m` with the homogeneous direction `(d, 0)` and drops w.
#[inline]
pub fn transform_vector(m: &Mat4, d: &Vec3) -> Vec3 {
    (m * d.push(0.0)).xyz()
}
