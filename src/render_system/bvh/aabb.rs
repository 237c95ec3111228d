use super::super::vec_math::{transform_point, Mat4, Vec2, Vec3};

// smallest magnitude a ray direction component may have before inversion
const INV_DIR_EPSILON: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Aabb {
    Empty,
    NonEmpty { min: Vec3, max: Vec3 },
}

impl Aabb {
    pub fn from_points(points: &[Vec3]) -> Aabb {
        if points.is_empty() {
            Aabb::Empty
        } else {
            let mut min = points[0];
            let mut max = points[0];
            for point in points {
                min = min.inf(point);
                max = max.sup(point);
            }
            Aabb::NonEmpty { min, max }
        }
    }

    pub fn union(a: &Aabb, b: &Aabb) -> Aabb {
        match (a, b) {
            (Aabb::Empty, _) => *b,
            (_, Aabb::Empty) => *a,
            (
                Aabb::NonEmpty {
                    min: amin,
                    max: amax,
                },
                Aabb::NonEmpty {
                    min: bmin,
                    max: bmax,
                },
            ) => Aabb::NonEmpty {
                min: amin.inf(bmin),
                max: amax.sup(bmax),
            },
        }
    }

    // bounds of the box after an affine transform, taken over all eight corners
    pub fn transform(&self, transform: &Mat4) -> Aabb {
        match self {
            Aabb::Empty => Aabb::Empty,
            Aabb::NonEmpty { min, max } => {
                let corners = [
                    transform_point(transform, min),
                    transform_point(transform, &Vec3::new(min.x, min.y, max.z)),
                    transform_point(transform, &Vec3::new(min.x, max.y, min.z)),
                    transform_point(transform, &Vec3::new(min.x, max.y, max.z)),
                    transform_point(transform, &Vec3::new(max.x, min.y, min.z)),
                    transform_point(transform, &Vec3::new(max.x, min.y, max.z)),
                    transform_point(transform, &Vec3::new(max.x, max.y, min.z)),
                    transform_point(transform, max),
                ];
                Aabb::from_points(&corners)
            }
        }
    }

    /// Slab test. `inv_dir` and `origin_times_inv_dir` come from
    /// [`safe_inv_dir`] and `-origin * inv_dir`. Returns the `(t_enter,
    /// t_exit)` interval clipped to `[t_min, t_max]`; the box is hit when
    /// `t_enter <= t_exit`.
    #[inline]
    pub fn hit(
        &self,
        inv_dir: &Vec3,
        origin_times_inv_dir: &Vec3,
        t_min: f32,
        t_max: f32,
    ) -> Vec2 {
        match self {
            Aabb::Empty => Vec2::new(f32::INFINITY, f32::NEG_INFINITY),
            Aabb::NonEmpty { min, max } => {
                let far = max.component_mul(inv_dir) + origin_times_inv_dir;
                let near = min.component_mul(inv_dir) + origin_times_inv_dir;
                let t_exit = far.sup(&near).min().min(t_max);
                let t_enter = far.inf(&near).max().max(t_min);
                Vec2::new(t_enter, t_exit)
            }
        }
    }
}

/// Inverts a ray direction, first pushing components that are too close to
/// zero out to `±1e-5` with their sign kept.
#[inline]
pub fn safe_inv_dir(d: &Vec3) -> Vec3 {
    d.map(|c| {
        let c = if c.abs() > INV_DIR_EPSILON {
            c
        } else {
            INV_DIR_EPSILON.copysign(c)
        };
        1.0 / c
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::NonEmpty {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    fn interval(aabb: &Aabb, origin: Vec3, dir: Vec3, t_max: f32) -> Vec2 {
        let inv_dir = safe_inv_dir(&dir);
        let oxinv = -origin.component_mul(&inv_dir);
        aabb.hit(&inv_dir, &oxinv, 0.0, t_max)
    }

    #[test]
    fn axis_aligned_ray_hits_box() {
        let down = Vec3::new(0.0, 0.0, -1.0);
        let i = interval(&unit_box(), Vec3::new(0.0, 0.0, 5.0), down, f32::MAX);
        assert!(i.x <= i.y);
        assert!((i.x - 4.0).abs() < 1e-4);
        assert!((i.y - 6.0).abs() < 1e-4);
    }

    #[test]
    fn ray_beside_box_misses() {
        let down = Vec3::new(0.0, 0.0, -1.0);
        let i = interval(&unit_box(), Vec3::new(3.0, 0.0, 5.0), down, f32::MAX);
        assert!(i.x > i.y);
    }

    #[test]
    fn box_beyond_t_max_misses() {
        let i = interval(&unit_box(), Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0), 3.0);
        assert!(i.x > i.y);
    }

    #[test]
    fn empty_box_never_hits() {
        let i = interval(&Aabb::Empty, Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), f32::MAX);
        assert!(i.x > i.y);
    }

    #[test]
    fn safe_inv_dir_keeps_sign() {
        let inv = safe_inv_dir(&Vec3::new(0.0, -0.0, -1e-7));
        assert_eq!(inv.x, 1e5);
        assert_eq!(inv.y, -1e5);
        assert_eq!(inv.z, -1e5);
        assert_eq!(safe_inv_dir(&Vec3::new(2.0, 1.0, 1.0)).x, 0.5);
    }

    #[test]
    fn union_and_transform() {
        let a = Aabb::from_points(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)]);
        let b = Aabb::from_points(&[Vec3::new(-2.0, 0.5, 0.5)]);
        let u = Aabb::union(&a, &b);
        assert_eq!(
            u,
            Aabb::NonEmpty {
                min: Vec3::new(-2.0, 0.0, 0.0),
                max: Vec3::new(1.0, 1.0, 1.0),
            }
        );
        assert_eq!(Aabb::union(&Aabb::Empty, &a), a);

        let moved = a.transform(&Mat4::new_translation(&Vec3::new(0.0, 10.0, 0.0)));
        assert_eq!(
            moved,
            Aabb::NonEmpty {
                min: Vec3::new(0.0, 10.0, 0.0),
                max: Vec3::new(1.0, 11.0, 1.0),
            }
        );
    }
}
