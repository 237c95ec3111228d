use super::{
    kernel::{ConstantParams, FramebufferWrite},
    vec_math::{clamp4, Vec4},
};

/// Resolves an accumulated pixel into its displayable color and the
/// framebuffer slot it belongs in. Only reads its inputs, so running it again
/// on the same accumulation gives the same write.
pub fn post_process(
    params: &ConstantParams,
    xy: (u32, u32),
    accumulated: &Vec4,
) -> FramebufferWrite {
    let (x, y) = xy;
    let iterations = params.current_iteration.max(1.0);

    let mut rgba = clamp4(&(*accumulated / iterations), 0.0, 1.0);
    for c in rgba.iter_mut().take(3) {
        *c = c.powf(params.inverted_gamma);
    }

    let index = if params.flip_y {
        params.width * (params.height - 1 - y) + x
    } else {
        params.width * y + x
    };

    FramebufferWrite { index, rgba }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::render_system::vec_math::Vec3;

    fn params(flip_y: bool, gamma: f32, current_iteration: f32) -> ConstantParams {
        ConstantParams {
            depth: 4,
            width: 4,
            height: 3,
            flip_y,
            inverted_gamma: 1.0 / gamma,
            ray_cast_epsilon: 0.001,
            current_iteration,
            camera: Camera::look_at(
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::zeros(),
                Vec3::new(0.0, 1.0, 0.0),
                90.0,
                1.0,
                0.0,
                1.0,
            ),
        }
    }

    #[test]
    fn averages_and_clamps() {
        let write = post_process(&params(false, 1.0, 4.0), (1, 2), &Vec4::new(2.0, 8.0, -4.0, 4.0));
        assert_eq!(write.index, 9);
        assert_eq!(write.rgba, Vec4::new(0.5, 1.0, 0.0, 1.0));
    }

    #[test]
    fn gamma_applies_to_color_only() {
        let write = post_process(&params(false, 2.0, 1.0), (0, 0), &Vec4::new(0.25, 0.0, 1.0, 1.0));
        assert!((write.rgba.x - 0.5).abs() < 1e-6);
        assert_eq!(write.rgba.w, 1.0);
    }

    #[test]
    fn flip_mirrors_rows() {
        let p = params(true, 1.0, 1.0);
        assert_eq!(post_process(&p, (1, 0), &Vec4::zeros()).index, 9);
        assert_eq!(post_process(&p, (1, 2), &Vec4::zeros()).index, 1);
    }

    #[test]
    fn is_idempotent() {
        let p = params(true, 2.2, 7.0);
        let accumulated = Vec4::new(3.1, 0.4, 6.0, 7.0);
        assert_eq!(post_process(&p, (3, 1), &accumulated), post_process(&p, (3, 1), &accumulated));
    }

    #[test]
    fn zero_iterations_reads_as_one() {
        let write = post_process(&params(false, 1.0, 0.0), (0, 0), &Vec4::new(0.5, 0.5, 0.5, 1.0));
        assert_eq!(write.rgba, Vec4::new(0.5, 0.5, 0.5, 1.0));
    }
}
