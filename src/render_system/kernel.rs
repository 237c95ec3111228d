use super::{
    integrator::sample_pixel,
    postprocess::post_process,
    random::RndGen,
    scene::Scene,
    vec_math::Vec4,
};
use crate::camera::Camera;

/// Read only per frame parameters. One copy is handed to every lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantParams {
    // maximum number of bounces per path
    pub depth: u32,
    pub width: u32,
    pub height: u32,
    pub flip_y: bool,
    pub inverted_gamma: f32,
    pub ray_cast_epsilon: f32,
    // 1 on the first frame after a reset
    pub current_iteration: f32,
    pub camera: Camera,
}

/// What every lane of a dispatch shares.
#[derive(Clone, Copy)]
pub struct KernelGlobals<'a> {
    pub scene: &'a Scene,
    pub params: &'a ConstantParams,
    pub pixel_count: u32,
}

impl<'a> KernelGlobals<'a> {
    pub fn new(scene: &'a Scene, params: &'a ConstantParams) -> KernelGlobals<'a> {
        KernelGlobals {
            scene,
            params,
            pixel_count: params.width * params.height,
        }
    }
}

/// A resolved pixel on its way to the framebuffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramebufferWrite {
    pub index: u32,
    pub rgba: Vec4,
}

/// Which entry point a dispatch runs on every lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameMode {
    TraceAndPostProcess,
    TraceOnly,
    PostProcessOnly,
}

// the per pixel view of a dispatch
struct Lane {
    xy: (u32, u32),
    rnd: RndGen,
}

impl Lane {
    // None for lanes past the end of the image
    fn init(globals: &KernelGlobals, global_id: u32, rng_seed: u32) -> Option<Lane> {
        if global_id >= globals.pixel_count {
            return None;
        }
        let width = globals.params.width;
        Some(Lane {
            xy: (global_id % width, global_id / width),
            rnd: RndGen::new(rng_seed),
        })
    }

    fn trace(&mut self, globals: &KernelGlobals, accumulation: &mut Vec4) {
        let params = globals.params;
        let sample = sample_pixel(
            globals.scene,
            &params.camera,
            &mut self.rnd,
            self.xy,
            (params.width, params.height),
            params.depth,
            params.ray_cast_epsilon,
        );
        if params.current_iteration > 1.0 {
            *accumulation += sample;
        } else {
            *accumulation = sample;
        }
    }

    fn save_rng_seed(&self, rng_seed: &mut u32) {
        *rng_seed = self.rnd.state;
    }
}

/// Traces one sample, adds it to the pixel's accumulation and resolves the
/// result for display.
pub fn path_tracing_and_post_processing(
    globals: &KernelGlobals,
    global_id: u32,
    accumulation: &mut Vec4,
    rng_seed: &mut u32,
) -> Option<FramebufferWrite> {
    let mut lane = Lane::init(globals, global_id, *rng_seed)?;
    lane.trace(globals, accumulation);
    let write = post_process(globals.params, lane.xy, accumulation);
    lane.save_rng_seed(rng_seed);
    Some(write)
}

/// Traces one sample into the accumulation without touching the framebuffer.
pub fn path_tracing(
    globals: &KernelGlobals,
    global_id: u32,
    accumulation: &mut Vec4,
    rng_seed: &mut u32,
) {
    if let Some(mut lane) = Lane::init(globals, global_id, *rng_seed) {
        lane.trace(globals, accumulation);
        lane.save_rng_seed(rng_seed);
    }
}

/// Resolves the current accumulation for display. Draws no random numbers,
/// so the seed is written back unchanged.
pub fn post_processing(
    globals: &KernelGlobals,
    global_id: u32,
    accumulation: &Vec4,
    rng_seed: &mut u32,
) -> Option<FramebufferWrite> {
    let lane = Lane::init(globals, global_id, *rng_seed)?;
    let write = post_process(globals.params, lane.xy, accumulation);
    lane.save_rng_seed(rng_seed);
    Some(write)
}

/// Runs `mode`'s entry point for one lane.
pub fn run_lane(
    mode: FrameMode,
    globals: &KernelGlobals,
    global_id: u32,
    accumulation: &mut Vec4,
    rng_seed: &mut u32,
) -> Option<FramebufferWrite> {
    match mode {
        FrameMode::TraceAndPostProcess => {
            path_tracing_and_post_processing(globals, global_id, accumulation, rng_seed)
        }
        FrameMode::TraceOnly => {
            path_tracing(globals, global_id, accumulation, rng_seed);
            None
        }
        FrameMode::PostProcessOnly => post_processing(globals, global_id, accumulation, rng_seed),
    }
}
