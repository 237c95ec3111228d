use super::{
    super::{
        ray::Ray,
        transform::TransformTable,
        vec_math::{Vec2, Vec3},
    },
    aabb::safe_inv_dir,
    BvhNode, InternalNode, TriangleNode,
};

/// Number of pending entries the traversal stack can hold.
pub const STACK_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IntersectionKind {
    Sphere,
    Triangle {
        triangle_index: u32,
        // (u, v): the hit point is (1-u-v)*v0 + u*v1 + v*v2
        barycentric: Vec2,
    },
}

/// Closest hit found by [`Bvh::hit`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub t: f32,
    pub material_index: u32,
    // index of the world to object matrix in the transform table
    pub inverse_transform_index: u32,
    pub kind: IntersectionKind,
}

// one unit of pending work
#[derive(Clone, Copy, Debug, PartialEq)]
enum Task {
    Tlas(u32),
    Blas(u32),
    // the instance subtree below this entry is finished, go back to world space
    LeaveInstance,
}

struct TaskStack {
    entries: [Task; STACK_CAPACITY],
    len: usize,
}

impl TaskStack {
    fn new() -> TaskStack {
        TaskStack {
            entries: [Task::LeaveInstance; STACK_CAPACITY],
            len: 0,
        }
    }

    // Scene::validate rejects trees that could need more than STACK_CAPACITY
    // entries, so running past the end here is a broken precondition
    #[inline]
    fn push(&mut self, task: Task) {
        self.entries[self.len] = task;
        self.len += 1;
    }

    #[inline]
    fn pop(&mut self) -> Option<Task> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            Some(self.entries[self.len])
        }
    }
}

// the ray as seen from the current coordinate system, with the terms the slab
// test needs
#[derive(Clone, Copy, Debug)]
struct Frame {
    ray: Ray,
    inv_dir: Vec3,
    origin_times_inv_dir: Vec3,
}

impl Frame {
    fn new(ray: Ray) -> Frame {
        let inv_dir = safe_inv_dir(&ray.direction);
        let origin_times_inv_dir = -ray.origin.component_mul(&inv_dir);
        Frame {
            ray,
            inv_dir,
            origin_times_inv_dir,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct ActiveInstance {
    material_index: u32,
    inverse_transform_index: u32,
}

/// Read only view over the two node arrays and the transforms they use.
#[derive(Clone, Copy)]
pub struct Bvh<'a> {
    pub tlas_nodes: &'a [BvhNode],
    pub blas_nodes: &'a [BvhNode],
    pub transforms: &'a TransformTable,
}

impl<'a> Bvh<'a> {
    /// Finds the closest intersection with `t` in `[t_min, t_max]`.
    ///
    /// Every branch whose box overlaps the shrinking interval is visited, so
    /// the result is the nearest hit in the whole scene rather than the first
    /// one found.
    pub fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<Intersection> {
        let root = match self.tlas_nodes.len() {
            0 => return None,
            n => (n - 1) as u32,
        };

        let world = Frame::new(*ray);
        let mut frame = world;
        let mut instance = ActiveInstance::default();

        let mut closest_t = t_max;
        let mut closest = None;

        let mut stack = TaskStack::new();
        stack.push(Task::Tlas(root));

        while let Some(task) = stack.pop() {
            match task {
                Task::LeaveInstance => frame = world,
                Task::Tlas(idx) => match &self.tlas_nodes[idx as usize] {
                    BvhNode::Internal(node) => {
                        push_children(node, &frame, t_min, closest_t, &mut stack, Task::Tlas)
                    }
                    BvhNode::Sphere(sphere) => {
                        let inverse_transform_index =
                            TransformTable::inverse_index(sphere.transform_id);
                        let object_ray =
                            self.transforms.transform_ray(inverse_transform_index, ray);
                        if let Some(t) = hit_unit_sphere(&object_ray, t_min, closest_t) {
                            if t < closest_t {
                                closest_t = t;
                                closest = Some(Intersection {
                                    t,
                                    material_index: sphere.material_index,
                                    inverse_transform_index,
                                    kind: IntersectionKind::Sphere,
                                });
                            }
                        }
                    }
                    BvhNode::Mesh(mesh) => {
                        stack.push(Task::LeaveInstance);
                        stack.push(Task::Blas(mesh.blas_root));
                        instance = ActiveInstance {
                            material_index: mesh.material_index,
                            inverse_transform_index: TransformTable::inverse_index(
                                mesh.transform_id,
                            ),
                        };
                        frame = Frame::new(
                            self.transforms
                                .transform_ray(instance.inverse_transform_index, ray),
                        );
                    }
                    // triangles only live in the BLAS
                    BvhNode::Triangle(_) => {}
                },
                Task::Blas(idx) => match &self.blas_nodes[idx as usize] {
                    BvhNode::Internal(node) => {
                        push_children(node, &frame, t_min, closest_t, &mut stack, Task::Blas)
                    }
                    BvhNode::Triangle(tri) => {
                        if let Some((t, barycentric)) =
                            hit_triangle(&frame.ray, tri, t_min, closest_t)
                        {
                            if t < closest_t {
                                closest_t = t;
                                closest = Some(Intersection {
                                    t,
                                    material_index: instance.material_index,
                                    inverse_transform_index: instance.inverse_transform_index,
                                    kind: IntersectionKind::Triangle {
                                        triangle_index: tri.triangle_index,
                                        barycentric,
                                    },
                                });
                            }
                        }
                    }
                    // instances only live in the TLAS
                    BvhNode::Sphere(_) | BvhNode::Mesh(_) => {}
                },
            }
        }

        closest
    }
}

#[inline]
fn push_children(
    node: &InternalNode,
    frame: &Frame,
    t_min: f32,
    t_max: f32,
    stack: &mut TaskStack,
    task: fn(u32) -> Task,
) {
    let left = node
        .left_bounds
        .hit(&frame.inv_dir, &frame.origin_times_inv_dir, t_min, t_max);
    let right = node
        .right_bounds
        .hit(&frame.inv_dir, &frame.origin_times_inv_dir, t_min, t_max);

    if left.x <= left.y {
        stack.push(task(node.left));
    }
    if right.x <= right.y {
        stack.push(task(node.right));
    }
}

/// Intersects `ray` with the unit sphere at the origin, preferring the nearer
/// root that lies in `[t_min, t_max]`.
pub fn hit_unit_sphere(ray: &Ray, t_min: f32, t_max: f32) -> Option<f32> {
    let oc = ray.origin;
    let a = ray.direction.norm_squared();
    let half_b = oc.dot(&ray.direction);
    let c = oc.norm_squared() - 1.0;

    let discriminant = half_b * half_b - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();

    let in_range = |t: f32| t >= t_min && t <= t_max;
    let near = (-half_b - sqrtd) / a;
    if in_range(near) {
        return Some(near);
    }
    let far = (-half_b + sqrtd) / a;
    if in_range(far) {
        return Some(far);
    }
    None
}

/// Möller–Trumbore intersection. Returns `t` and the barycentric `(u, v)` of
/// the hit point.
pub fn hit_triangle(ray: &Ray, tri: &TriangleNode, t_min: f32, t_max: f32) -> Option<(f32, Vec2)> {
    let e1 = tri.v1 - tri.v0;
    let e2 = tri.v2 - tri.v0;

    let s1 = ray.direction.cross(&e2);
    let determinant = s1.dot(&e1);
    let inv_det = 1.0 / determinant;
    // the ray runs parallel to the triangle's plane
    if !inv_det.is_finite() {
        return None;
    }

    let d = ray.origin - tri.v0;
    let u = d.dot(&s1) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let s2 = d.cross(&e1);
    let v = ray.direction.dot(&s2) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&s2) * inv_det;
    if t < t_min || t > t_max {
        return None;
    }

    Some((t, Vec2::new(u, v)))
}
