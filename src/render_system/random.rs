use std::f32::consts::PI;

use super::vec_math::Vec3;

// largest f32 strictly below 1.0
const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

/// Per-pixel pseudo random stream.
///
/// The whole generator is a single `u32`, so a pixel's stream can be parked in
/// the seed buffer at the end of a frame and picked up again on the next one.
/// Two generators built from the same seed produce the same sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RndGen {
    pub state: u32,
}

impl RndGen {
    pub fn new(seed: u32) -> RndGen {
        RndGen { state: seed }
    }

    // pcg hash step, see "Hash Functions for GPU Rendering" (Jarzynski, Olano)
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let state = self.state.wrapping_mul(747796405).wrapping_add(2891336453);
        let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
        self.state = (word >> 22) ^ word;
        self.state
    }

    /// Uniform in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // u32::MAX rounds up to 2^32 in f32, so clamp back below one
        (self.next_u32() as f32 * (1.0 / 4294967296.0)).min(ONE_MINUS_EPSILON)
    }

    #[inline]
    pub fn next_f32_between(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    pub fn in_unit_sphere(&mut self) -> Vec3 {
        let r = self.next_f32().powf(1.0 / 3.0);
        let theta = PI * self.next_f32();
        let phi = 2.0 * PI * self.next_f32();

        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();

        Vec3::new(
            r * sin_theta * cos_phi,
            r * sin_theta * sin_phi,
            r * cos_theta,
        )
    }

    pub fn unit_vector(&mut self) -> Vec3 {
        self.in_unit_sphere().normalize()
    }

    pub fn on_hemisphere(&mut self, normal: &Vec3) -> Vec3 {
        let on_unit_sphere = self.unit_vector();
        if on_unit_sphere.dot(normal) > 0.0 {
            on_unit_sphere
        } else {
            -on_unit_sphere
        }
    }

    // r^2 is uniform so the points are uniform over the disk area
    pub fn in_unit_disk(&mut self) -> Vec3 {
        let r = self.next_f32().sqrt();
        let alpha = 2.0 * PI * self.next_f32();
        let (sin_alpha, cos_alpha) = alpha.sin_cos();
        Vec3::new(r * cos_alpha, r * sin_alpha, 0.0)
    }
}
