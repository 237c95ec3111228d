use super::vec_math::{Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Ray {
        Ray { origin, direction }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

// filled in once per bounce from the closest intersection
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HitRecord {
    pub point: Vec3,
    pub material_index: u32,
    // always faces against the incoming ray
    pub normal: Vec3,
    pub t: f32,
    pub uv: Vec2,
    pub front_face: bool,
}

impl HitRecord {
    /// Stores `outward_normal` flipped against `ray` and records which side
    /// was hit.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        if ray.direction.dot(&outward_normal) > 0.0 {
            self.normal = -outward_normal;
            self.front_face = false;
        } else {
            self.normal = outward_normal;
            self.front_face = true;
        }
    }
}
