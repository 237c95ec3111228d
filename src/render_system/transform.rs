use super::{
    ray::Ray,
    vec_math::{transform_point, transform_vector, Mat4, Vec3},
};

/// Flat table of instance transforms.
///
/// Instance `id` owns two consecutive entries: `2*id` maps world space into
/// object space and `2*id + 1` maps object space back into world space.
#[derive(Clone, Debug, Default)]
pub struct TransformTable {
    matrices: Vec<Mat4>,
}

impl TransformTable {
    pub fn new() -> TransformTable {
        TransformTable { matrices: vec![] }
    }

    #[inline]
    pub fn inverse_index(transform_id: u32) -> u32 {
        transform_id * 2
    }

    #[inline]
    pub fn forward_index(transform_id: u32) -> u32 {
        transform_id * 2 + 1
    }

    /// Appends the pair for `forward` and returns its transform id. Returns
    /// `None` if the matrix cannot be inverted.
    pub fn push(&mut self, forward: Mat4) -> Option<u32> {
        let inverse = forward.try_inverse()?;
        let transform_id = (self.matrices.len() / 2) as u32;
        self.matrices.push(inverse);
        self.matrices.push(forward);
        Some(transform_id)
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    pub fn contains(&self, transform_id: u32) -> bool {
        (Self::forward_index(transform_id) as usize) < self.matrices.len()
    }

    #[inline]
    pub fn get(&self, index: u32) -> &Mat4 {
        &self.matrices[index as usize]
    }

    #[inline]
    pub fn transform_point(&self, index: u32, point: &Vec3) -> Vec3 {
        transform_point(self.get(index), point)
    }

    // the direction is not renormalized, so t values carry over between spaces
    #[inline]
    pub fn transform_ray(&self, index: u32, ray: &Ray) -> Ray {
        let m = self.get(index);
        Ray::new(
            transform_point(m, &ray.origin),
            transform_vector(m, &ray.direction),
        )
    }

    /// Moves an object space normal into world space. `inverse_index` must
    /// point at the world to object matrix; its transpose is the correct
    /// normal matrix under non uniform scale.
    #[inline]
    pub fn transform_normal(&self, inverse_index: u32, normal: &Vec3) -> Vec3 {
        transform_vector(&self.get(inverse_index).transpose(), normal)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};

    use super::*;

    fn skewed_transform() -> Mat4 {
        Mat4::new_translation(&Vec3::new(3.0, -1.0, 2.0))
            * UnitQuaternion::from_euler_angles(0.3, -0.7, 1.1).to_homogeneous()
            * Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 0.5, 3.0))
    }

    #[test]
    fn push_stores_inverse_then_forward() {
        let mut table = TransformTable::new();
        assert_eq!(table.push(Mat4::identity()), Some(0));
        let id = table.push(skewed_transform()).unwrap();
        assert_eq!(id, 1);
        assert_eq!(table.len(), 4);
        let product = table.get(TransformTable::forward_index(id))
            * table.get(TransformTable::inverse_index(id));
        assert!((product - Mat4::identity()).norm() < 1e-5);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let mut table = TransformTable::new();
        assert_eq!(table.push(Mat4::zeros()), None);
        assert!(table.is_empty());
    }

    #[test]
    fn ray_round_trip_reproduces_world_point() {
        let mut table = TransformTable::new();
        let id = table.push(skewed_transform()).unwrap();
        let ray = Ray::new(Vec3::new(0.5, 4.0, -2.0), Vec3::new(0.2, -1.0, 0.3));
        let object_ray = table.transform_ray(TransformTable::inverse_index(id), &ray);
        for t in [0.0, 0.5, 3.0, 10.0] {
            let back = table.transform_point(TransformTable::forward_index(id), &object_ray.at(t));
            assert!((back - ray.at(t)).norm() < 1e-4, "t = {t}");
        }
    }

    #[test]
    fn normals_stay_perpendicular_under_nonuniform_scale() {
        let mut table = TransformTable::new();
        let id = table.push(skewed_transform()).unwrap();
        let forward = TransformTable::forward_index(id);
        // tangent plane of an object space surface with normal +y
        let normal = Vec3::new(0.0, 1.0, 0.0);
        let tangent = Vec3::new(1.0, 0.0, 1.0);
        let world_tangent = transform_vector(table.get(forward), &tangent);
        let world_normal = table.transform_normal(TransformTable::inverse_index(id), &normal);
        assert!(world_normal.dot(&world_tangent).abs() < 1e-4);
    }

    #[test]
    fn rigid_pair_is_consistent() {
        let mut table = TransformTable::new();
        let iso = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );
        let id = table.push(iso.to_homogeneous()).unwrap();
        assert!(table.contains(id));
        assert!(!table.contains(id + 1));
        let p = Vec3::new(-1.0, 0.0, 4.0);
        let there = table.transform_point(TransformTable::forward_index(id), &p);
        let back = table.transform_point(TransformTable::inverse_index(id), &there);
        assert!((back - p).norm() < 1e-5);
    }
}
