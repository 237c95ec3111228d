use std::sync::Arc;

use nalgebra::Vector3;
use progressive_pathtracer::{
    render_system::vec_math::{Mat4, Vec4},
    utils, CameraSettings, FrameMode, Material, RenderConfig, Renderer, Scene, SceneBuilder,
};

fn config(flip_y: bool) -> RenderConfig {
    RenderConfig {
        width: 12,
        height: 8,
        depth: 6,
        flip_y,
        gamma: 1.0,
        threads: 3,
        band_rows: 3,
        seed: 17,
        camera: CameraSettings {
            look_from: [0.0, 0.0, 0.0],
            look_at: [0.0, 0.0, -1.0],
            vup: [0.0, 1.0, 0.0],
            vfov: 60.0,
            aperture: 0.0,
            focus_distance: Some(1.0),
        },
        ..RenderConfig::default()
    }
}

// a sphere behind the camera, so every primary ray misses
fn sky_only_scene() -> Scene {
    let mut builder = SceneBuilder::new();
    let m = builder.add_material(Material::lambertian([1.0, 0.0, 0.0]));
    let sphere = builder
        .add_sphere(m, Mat4::new_translation(&Vector3::new(0.0, 0.0, 50.0)))
        .unwrap();
    builder.build(vec![sphere]).unwrap()
}

// a white diffuse sphere, cube and floor, lit only by the sky
fn white_scene() -> Scene {
    let mut builder = SceneBuilder::new();
    let white = builder.add_material(Material::lambertian([1.0, 1.0, 1.0]));
    let sphere = builder
        .add_sphere(white, Mat4::new_translation(&Vector3::new(0.0, 0.0, -4.0)))
        .unwrap();
    let floor = builder
        .add_sphere(
            white,
            Mat4::new_translation(&Vector3::new(0.0, -101.0, -4.0)) * Mat4::new_scaling(100.0),
        )
        .unwrap();
    let cube = builder.add_mesh(&utils::unitcube()).unwrap();
    let instance = builder
        .add_mesh_instance(&cube, white, Mat4::new_translation(&Vector3::new(1.5, -0.5, -3.0)))
        .unwrap();
    builder.build(vec![sphere, floor, instance]).unwrap()
}

#[test]
fn missed_rays_show_the_sky() {
    let mut renderer = Renderer::new(Arc::new(sky_only_scene()), config(false)).unwrap();
    renderer.render_frame(FrameMode::TraceAndPostProcess).unwrap();

    for rgba in renderer.framebuffer() {
        assert!(rgba.x >= 0.5 - 1e-5 && rgba.x <= 1.0 + 1e-5);
        assert!(rgba.y >= 0.7 - 1e-5 && rgba.y <= 1.0 + 1e-5);
        assert!((rgba.z - 1.0).abs() < 1e-5);
        assert_eq!(rgba.w, 1.0);
    }
    // the image gets bluer towards the top
    let top = renderer.framebuffer()[(7 * 12) as usize];
    let bottom = renderer.framebuffer()[0];
    assert!(top.x < bottom.x);
}

#[test]
fn white_diffuse_scene_never_exceeds_the_sky() {
    let mut renderer = Renderer::new(Arc::new(white_scene()), config(false)).unwrap();
    for _ in 0..4 {
        renderer.render_frame(FrameMode::TraceOnly).unwrap();
    }
    for acc in renderer.accumulation() {
        let mean = *acc / acc.w;
        assert!(mean.x <= 1.0 + 1e-5 && mean.y <= 1.0 + 1e-5 && mean.z <= 1.0 + 1e-5);
        assert!(mean.x >= 0.0 && mean.y >= 0.0 && mean.z >= 0.0);
    }
}

#[test]
fn trace_only_leaves_framebuffer_alone() {
    let mut renderer = Renderer::new(Arc::new(white_scene()), config(false)).unwrap();
    renderer.render_frame(FrameMode::TraceOnly).unwrap();
    assert!(renderer.framebuffer().iter().all(|rgba| *rgba == Vec4::zeros()));
    assert!(renderer.accumulation().iter().all(|acc| acc.w == 1.0));
}

#[test]
fn post_processing_is_idempotent() {
    let mut renderer = Renderer::new(Arc::new(white_scene()), config(true)).unwrap();
    renderer.render_frame(FrameMode::TraceAndPostProcess).unwrap();
    renderer.render_frame(FrameMode::TraceAndPostProcess).unwrap();

    let accumulation = renderer.accumulation().to_vec();
    let seeds = renderer.rng_seeds().to_vec();
    renderer.render_frame(FrameMode::PostProcessOnly).unwrap();
    let first = renderer.framebuffer().to_vec();
    renderer.render_frame(FrameMode::PostProcessOnly).unwrap();

    assert_eq!(first, renderer.framebuffer());
    assert_eq!(accumulation, renderer.accumulation());
    assert_eq!(seeds, renderer.rng_seeds());
}

#[test]
fn flip_mirrors_rows() {
    let scene = Arc::new(white_scene());
    let mut upright = Renderer::new(scene.clone(), config(false)).unwrap();
    let mut flipped = Renderer::new(scene, config(true)).unwrap();
    upright.render_frame(FrameMode::TraceAndPostProcess).unwrap();
    flipped.render_frame(FrameMode::TraceAndPostProcess).unwrap();

    let (width, height) = (12usize, 8usize);
    for y in 0..height {
        for x in 0..width {
            assert_eq!(
                upright.framebuffer()[width * y + x],
                flipped.framebuffer()[width * (height - 1 - y) + x]
            );
        }
    }
}

#[test]
fn same_seed_renders_the_same_image() {
    let scene = Arc::new(white_scene());
    let mut a = Renderer::new(scene.clone(), config(true)).unwrap();
    let mut b = Renderer::new(scene.clone(), config(true)).unwrap();
    for _ in 0..2 {
        a.render_frame(FrameMode::TraceAndPostProcess).unwrap();
        b.render_frame(FrameMode::TraceAndPostProcess).unwrap();
    }
    assert_eq!(a.framebuffer(), b.framebuffer());
    assert_eq!(a.rng_seeds(), b.rng_seeds());

    let mut other = config(true);
    other.seed = 18;
    let mut c = Renderer::new(scene, other).unwrap();
    c.render_frame(FrameMode::TraceAndPostProcess).unwrap();
    assert_ne!(a.rng_seeds(), c.rng_seeds());
}

#[test]
fn saved_image_round_trips_through_png() {
    let mut renderer = Renderer::new(Arc::new(sky_only_scene()), config(true)).unwrap();
    renderer.render_frame(FrameMode::TraceAndPostProcess).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sky.png");
    utils::framebuffer_to_image(renderer.framebuffer(), 12, 8)
        .save(&path)
        .unwrap();

    let loaded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(loaded.dimensions(), (12, 8));
    // blue channel of the sky is saturated everywhere
    assert!(loaded.pixels().all(|p| p.0[2] == 255 && p.0[3] == 255));
}
