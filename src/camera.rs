use serde::Deserialize;

use crate::render_system::{
    random::RndGen,
    ray::Ray,
    vec_math::Vec3,
};

#[inline]
fn deg2rad(deg: f32) -> f32 {
    deg * std::f32::consts::PI / 180.0
}

// vectors giving the current perception of the camera
#[derive(Clone, Debug)]
struct DirVecs {
    // points from the target back towards the eye
    w: Vec3,
    right: Vec3,
    up: Vec3,
}

impl DirVecs {
    fn new(look_from: Vec3, look_at: Vec3, worldup: Vec3) -> DirVecs {
        let w = (look_from - look_at).normalize();
        let right = worldup.cross(&w).normalize();
        let up = w.cross(&right);
        DirVecs { w, right, up }
    }
}

/// Thin lens camera in the form the integrator consumes: an image plane
/// spanned from `lower_left_corner` by `horizontal` and `vertical`, seen from
/// a lens of radius `lens_radius` centered at `origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub origin: Vec3,
    pub lower_left_corner: Vec3,
    pub horizontal: Vec3,
    pub vertical: Vec3,
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
    pub lens_radius: f32,
}

impl Camera {
    pub fn look_at(
        look_from: Vec3,
        look_at: Vec3,
        vup: Vec3,
        vfov_degrees: f32,
        aspect_ratio: f32,
        aperture: f32,
        focus_distance: f32,
    ) -> Camera {
        let h = (deg2rad(vfov_degrees) / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = aspect_ratio * viewport_height;

        let vecs = DirVecs::new(look_from, look_at, vup);

        let horizontal = focus_distance * viewport_width * vecs.right;
        let vertical = focus_distance * viewport_height * vecs.up;
        let lower_left_corner =
            look_from - horizontal / 2.0 - vertical / 2.0 - focus_distance * vecs.w;

        Camera {
            origin: look_from,
            lower_left_corner,
            horizontal,
            vertical,
            u: vecs.right,
            v: vecs.up,
            w: vecs.w,
            lens_radius: aperture / 2.0,
        }
    }

    pub fn from_settings(settings: &CameraSettings, aspect_ratio: f32) -> Camera {
        let focus_distance = settings.focus_distance.unwrap_or_else(|| {
            (Vec3::from(settings.look_from) - Vec3::from(settings.look_at)).norm()
        });
        Camera::look_at(
            settings.look_from.into(),
            settings.look_at.into(),
            settings.vup.into(),
            settings.vfov,
            aspect_ratio,
            settings.aperture,
            focus_distance,
        )
    }

    // s and t are image plane coordinates in [0, 1], t grows upwards
    pub fn get_ray(&self, rnd: &mut RndGen, s: f32, t: f32) -> Ray {
        let rd = self.lens_radius * rnd.in_unit_disk();
        let offset = self.u * rd.x + self.v * rd.y;
        Ray::new(
            self.origin + offset,
            self.lower_left_corner + s * self.horizontal + t * self.vertical
                - self.origin
                - offset,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub look_from: [f32; 3],
    pub look_at: [f32; 3],
    pub vup: [f32; 3],
    // vertical field of view in degrees
    pub vfov: f32,
    pub aperture: f32,
    // defaults to the distance between look_from and look_at
    pub focus_distance: Option<f32>,
}

impl Default for CameraSettings {
    fn default() -> CameraSettings {
        CameraSettings {
            look_from: [13.0, 2.0, 3.0],
            look_at: [0.0, 0.0, 0.0],
            vup: [0.0, 1.0, 0.0],
            vfov: 20.0,
            aperture: 0.1,
            focus_distance: Some(10.0),
        }
    }
}
