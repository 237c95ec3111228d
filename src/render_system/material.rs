use serde::Deserialize;

use super::{
    random::RndGen,
    ray::{HitRecord, Ray},
    vec_math::{near_zero, reflect, refract, Vec2, Vec3},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Lambertian,
    Metal,
    Dielectric,
    DiffuseLight,
}

/// Scene material. All kinds share one layout; `fuzz` is only read by metals
/// and `ior` only by dielectrics.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Material {
    pub kind: MaterialKind,
    pub albedo: Vec3,
    #[serde(default)]
    pub albedo_texture_index: u32,
    #[serde(default)]
    pub fuzz: f32,
    #[serde(default = "default_ior")]
    pub ior: f32,
}

fn default_ior() -> f32 {
    1.5
}

/// Outcome of a surface interaction that keeps the path alive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scatter {
    pub attenuation: Vec3,
    pub ray: Ray,
}

impl Material {
    fn with_kind(kind: MaterialKind, albedo: [f32; 3]) -> Material {
        Material {
            kind,
            albedo: Vec3::from(albedo),
            albedo_texture_index: 0,
            fuzz: 0.0,
            ior: default_ior(),
        }
    }

    pub fn lambertian(albedo: [f32; 3]) -> Material {
        Material::with_kind(MaterialKind::Lambertian, albedo)
    }

    pub fn metal(albedo: [f32; 3], fuzz: f32) -> Material {
        Material {
            fuzz,
            ..Material::with_kind(MaterialKind::Metal, albedo)
        }
    }

    pub fn dielectric(ior: f32) -> Material {
        Material {
            ior,
            ..Material::with_kind(MaterialKind::Dielectric, [1.0, 1.0, 1.0])
        }
    }

    pub fn diffuse_light(emission: [f32; 3]) -> Material {
        Material::with_kind(MaterialKind::DiffuseLight, emission)
    }

    // textures are not sampled yet, every lookup resolves to the flat color
    #[inline]
    fn color(&self, _uv: &Vec2) -> Vec3 {
        self.albedo
    }

    /// Returns `None` when the path is absorbed at this surface.
    pub fn scatter(&self, rnd: &mut RndGen, ray: &Ray, hit: &HitRecord) -> Option<Scatter> {
        match self.kind {
            MaterialKind::Lambertian => {
                let mut direction = hit.normal + rnd.unit_vector();
                // the sample landed (almost) exactly opposite the normal
                if near_zero(&direction) {
                    direction = hit.normal;
                }
                Some(Scatter {
                    attenuation: self.color(&hit.uv),
                    ray: Ray::new(hit.point, direction),
                })
            }
            MaterialKind::Metal => {
                let direction = reflect(&ray.direction.normalize(), &hit.normal)
                    + self.fuzz * rnd.in_unit_sphere();
                Some(Scatter {
                    attenuation: self.color(&hit.uv),
                    ray: Ray::new(hit.point, direction),
                })
            }
            MaterialKind::Dielectric => {
                let refraction_ratio = if hit.front_face {
                    1.0 / self.ior
                } else {
                    self.ior
                };

                let unit_direction = ray.direction.normalize();
                let cos_theta = (-unit_direction).dot(&hit.normal).min(1.0);
                let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

                let cannot_refract = refraction_ratio * sin_theta > 1.0;
                let direction = if cannot_refract
                    || reflectance(cos_theta, refraction_ratio) > rnd.next_f32()
                {
                    reflect(&unit_direction, &hit.normal)
                } else {
                    refract(&unit_direction, &hit.normal, refraction_ratio)
                };

                Some(Scatter {
                    attenuation: Vec3::new(1.0, 1.0, 1.0),
                    ray: Ray::new(hit.point, direction),
                })
            }
            MaterialKind::DiffuseLight => None,
        }
    }

    pub fn emit(&self, hit: &HitRecord) -> Vec3 {
        match self.kind {
            MaterialKind::DiffuseLight => self.color(&hit.uv),
            _ => Vec3::zeros(),
        }
    }
}

// Schlick's approximation
fn reflectance(cosine: f32, ref_idx: f32) -> f32 {
    let r0 = (1.0 - ref_idx) / (1.0 + ref_idx);
    let r0 = r0 * r0;
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}
