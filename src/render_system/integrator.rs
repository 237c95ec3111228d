use std::f32::consts::PI;

use super::{
    bvh::traverse::{Intersection, IntersectionKind},
    random::RndGen,
    ray::{HitRecord, Ray},
    scene::Scene,
    transform::TransformTable,
    vec_math::{lerp, Vec2, Vec3, Vec4},
};
use crate::camera::Camera;

/// Radiance arriving along a ray that left the scene.
pub fn sky_color(ray: &Ray) -> Vec3 {
    let unit_direction = ray.direction.normalize();
    let t = 0.5 * (unit_direction.y + 1.0);
    lerp(&Vec3::new(1.0, 1.0, 1.0), &Vec3::new(0.5, 0.7, 1.0), t)
}

// texture coordinates of a point on the unit sphere with outward normal n
fn sphere_uv(n: &Vec3) -> Vec2 {
    let theta = (-n.y).acos();
    let phi = (-n.z).atan2(n.x) + PI;
    Vec2::new(phi / (2.0 * PI), theta / PI)
}

/// Turns the closest intersection into the shading record the materials read.
pub fn surface_hit(scene: &Scene, ray: &Ray, intersection: &Intersection) -> HitRecord {
    let point = ray.at(intersection.t);
    let (outward_normal, uv) = match intersection.kind {
        IntersectionKind::Sphere => {
            let forward_index =
                TransformTable::forward_index(intersection.inverse_transform_index / 2);
            let center = scene
                .transforms
                .transform_point(forward_index, &Vec3::zeros());
            let outward_normal = (point - center).normalize();
            (outward_normal, sphere_uv(&outward_normal))
        }
        IntersectionKind::Triangle {
            triangle_index,
            barycentric,
        } => {
            let base = triangle_index as usize * 3;
            let weights = [1.0 - barycentric.x - barycentric.y, barycentric.x, barycentric.y];

            let mut normal = Vec3::zeros();
            let mut uv = Vec2::zeros();
            for (k, w) in weights.iter().enumerate() {
                let n = scene.normals[scene.normal_indices[base + k] as usize];
                normal += *w * n.xyz();
                uv += *w * scene.uvs[scene.uv_indices[base + k] as usize];
            }

            let world_normal = scene
                .transforms
                .transform_normal(intersection.inverse_transform_index, &normal)
                .normalize();
            (world_normal, uv)
        }
    };

    let mut hit = HitRecord {
        point,
        material_index: intersection.material_index,
        t: intersection.t,
        uv,
        ..HitRecord::default()
    };
    hit.set_face_normal(ray, outward_normal);
    hit
}

/// Follows one path through the scene for at most `depth` bounces and
/// returns the product of everything it picked up on the way.
pub fn trace_path(
    scene: &Scene,
    rnd: &mut RndGen,
    mut ray: Ray,
    depth: u32,
    ray_cast_epsilon: f32,
) -> Vec3 {
    let bvh = scene.bvh();
    let mut throughput = Vec3::new(1.0, 1.0, 1.0);

    for _ in 0..depth {
        let intersection = match bvh.hit(&ray, ray_cast_epsilon, f32::MAX) {
            Some(intersection) => intersection,
            None => {
                throughput.component_mul_assign(&sky_color(&ray));
                break;
            }
        };

        let hit = surface_hit(scene, &ray, &intersection);
        let material = &scene.materials[hit.material_index as usize];
        match material.scatter(rnd, &ray, &hit) {
            Some(scatter) => {
                throughput.component_mul_assign(&scatter.attenuation);
                ray = scatter.ray;
            }
            None => {
                throughput.component_mul_assign(&material.emit(&hit));
                break;
            }
        }
    }

    throughput
}

/// Generates the jittered camera ray for pixel `(x, y)` and traces it. The
/// result has alpha 1 so that summed samples keep their count in `w`.
pub fn sample_pixel(
    scene: &Scene,
    camera: &Camera,
    rnd: &mut RndGen,
    xy: (u32, u32),
    size: (u32, u32),
    depth: u32,
    ray_cast_epsilon: f32,
) -> Vec4 {
    let (x, y) = xy;
    let (width, height) = size;
    let s = (x as f32 + rnd.next_f32()) / width.saturating_sub(1).max(1) as f32;
    let t = (y as f32 + rnd.next_f32()) / height.saturating_sub(1).max(1) as f32;
    let ray = camera.get_ray(rnd, s, t);
    trace_path(scene, rnd, ray, depth, ray_cast_epsilon).push(1.0)
}
