use std::sync::Arc;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use progressive_pathtracer::{
    render_system::{scene::NodeHandle, vec_math::Mat4},
    utils, FrameMode, Material, RenderConfig, Renderer, Result, Scene, SceneBuilder,
};

fn sphere_transform(center: [f32; 3], radius: f32) -> Mat4 {
    Mat4::new_translation(&Vector3::from(center)) * Mat4::new_scaling(radius)
}

fn build_scene(seed: u64) -> Result<Scene> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = SceneBuilder::new();
    let mut instances: Vec<NodeHandle> = vec![];

    // ground
    let ground = builder.add_material(Material::lambertian([0.5, 0.5, 0.5]));
    instances.push(builder.add_sphere(ground, sphere_transform([0.0, -1000.0, 0.0], 1000.0))?);

    // scatter some small spheres around the big ones
    for a in -5..5 {
        for b in -5..5 {
            let center = [
                a as f32 + 0.9 * rng.random::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.random::<f32>(),
            ];
            if (Vector3::from(center) - Vector3::new(4.0, 0.2, 0.0)).norm() < 0.9 {
                continue;
            }
            let choose_mat = rng.random::<f32>();
            let material = if choose_mat < 0.7 {
                Material::lambertian([
                    rng.random::<f32>() * rng.random::<f32>(),
                    rng.random::<f32>() * rng.random::<f32>(),
                    rng.random::<f32>() * rng.random::<f32>(),
                ])
            } else if choose_mat < 0.85 {
                Material::metal(
                    [
                        rng.random_range(0.5..1.0),
                        rng.random_range(0.5..1.0),
                        rng.random_range(0.5..1.0),
                    ],
                    rng.random_range(0.0..0.5),
                )
            } else if choose_mat < 0.95 {
                Material::dielectric(1.5)
            } else {
                Material::diffuse_light([4.0, 4.0, 4.0])
            };
            let material = builder.add_material(material);
            instances.push(builder.add_sphere(material, sphere_transform(center, 0.2))?);
        }
    }

    let glass = builder.add_material(Material::dielectric(1.5));
    instances.push(builder.add_sphere(glass, sphere_transform([0.0, 1.0, 0.0], 1.0))?);

    let matte = builder.add_material(Material::lambertian([0.4, 0.2, 0.1]));
    instances.push(builder.add_sphere(matte, sphere_transform([-4.0, 1.0, 0.0], 1.0))?);

    let mirror = builder.add_material(Material::metal([0.7, 0.6, 0.5], 0.0));
    instances.push(builder.add_sphere(mirror, sphere_transform([4.0, 1.0, 0.0], 1.0))?);

    // mesh instances: a tilted cube and an overhead light panel
    let cube = builder.add_mesh(&utils::unitcube())?;
    let teal = builder.add_material(Material::lambertian([0.1, 0.5, 0.5]));
    let cube_transform = Mat4::new_translation(&Vector3::new(2.0, 0.75, 2.5))
        * UnitQuaternion::from_euler_angles(0.0, 0.6, 0.0).to_homogeneous()
        * Mat4::new_scaling(1.5);
    instances.push(builder.add_mesh_instance(&cube, teal, cube_transform)?);

    let panel = builder.add_mesh(&utils::quad(Point3::origin(), 1.0, 1.0))?;
    let light = builder.add_material(Material::diffuse_light([6.0, 6.0, 6.0]));
    // flipped upside down so it faces the scene
    let panel_transform = Mat4::new_translation(&Vector3::new(0.0, 5.0, 0.0))
        * UnitQuaternion::from_euler_angles(std::f32::consts::PI, 0.0, 0.0).to_homogeneous()
        * Mat4::new_scaling(3.0);
    instances.push(builder.add_mesh_instance(&panel, light, panel_transform)?);

    builder.build(instances)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("loading render config from {}", path);
            RenderConfig::load(path)?
        }
        None => RenderConfig::default(),
    };

    let scene = build_scene(config.seed)?;
    info!(
        tlas_nodes = scene.tlas_nodes.len(),
        blas_nodes = scene.blas_nodes.len(),
        materials = scene.materials.len(),
        "scene built"
    );

    let mut renderer = Renderer::new(Arc::new(scene), config.clone())?;

    let pixels = (config.width * config.height) as u64;
    let mut start_time = std::time::Instant::now();
    let mut frame_count = 0;
    for _ in 0..config.frames {
        // accumulate only, the image is resolved once at the end
        renderer.render_frame(FrameMode::TraceOnly)?;

        // print samples per second
        frame_count += 1;
        let elapsed = start_time.elapsed();
        if elapsed.as_secs() >= 1 {
            info!(
                iteration = renderer.iteration(),
                samples_per_second = (frame_count * pixels) as f64 / elapsed.as_secs_f64(),
                "progress"
            );
            frame_count = 0;
            start_time = std::time::Instant::now();
        }
    }
    renderer.render_frame(FrameMode::PostProcessOnly)?;

    let image =
        utils::framebuffer_to_image(renderer.framebuffer(), renderer.width(), renderer.height());
    image.save(&config.output)?;
    info!(iteration = renderer.iteration(), "wrote {}", config.output);
    Ok(())
}
