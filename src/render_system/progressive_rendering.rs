use std::sync::{mpsc, Arc};

use rand::{rngs::StdRng, Rng, SeedableRng};
use threadpool::ThreadPool;
use tracing::{debug, info, warn};

use super::{
    kernel::{run_lane, FrameMode, FramebufferWrite, KernelGlobals},
    scene::Scene,
    vec_math::Vec4,
};
use crate::{
    camera::Camera,
    config::RenderConfig,
    error::{RenderError, Result},
};

// a finished band, handed back from a worker job
struct BandResult {
    band: usize,
    accumulation: Vec<Vec4>,
    rng_seeds: Vec<u32>,
    writes: Vec<FramebufferWrite>,
}

/// Owns the per pixel buffers and dispatches frames over a worker pool.
///
/// Each frame splits the image into bands of rows. A band's cells are copied
/// into its job, so lanes only ever see their own accumulation and seed, and
/// the results are committed once every band has reported back. If any job
/// goes missing the frame is dropped and the buffers keep their old contents.
pub struct Renderer {
    threadpool: ThreadPool,
    scene: Arc<Scene>,
    config: RenderConfig,
    camera: Camera,

    accumulation: Vec<Vec4>,
    rng_seeds: Vec<u32>,
    framebuffer: Vec<Vec4>,
    // samples per pixel currently in the accumulation buffer
    iteration: u32,
}

impl Renderer {
    pub fn new(scene: Arc<Scene>, config: RenderConfig) -> Result<Renderer> {
        config.validate()?;
        scene.validate()?;

        let pixel_count = (config.width * config.height) as usize;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let rng_seeds = (0..pixel_count).map(|_| rng.random::<u32>()).collect();

        let threadpool = match config.threads {
            0 => ThreadPool::default(),
            n => ThreadPool::new(n),
        };
        info!(
            width = config.width,
            height = config.height,
            threads = threadpool.max_count(),
            "renderer ready"
        );

        Ok(Renderer {
            threadpool,
            scene,
            camera: config.camera(),
            config,
            accumulation: vec![Vec4::zeros(); pixel_count],
            rng_seeds,
            framebuffer: vec![Vec4::zeros(); pixel_count],
            iteration: 0,
        })
    }

    /// Replaces the seed buffer, e.g. to resume a stream saved from an
    /// earlier run.
    pub fn set_rng_seeds(&mut self, rng_seeds: Vec<u32>) -> Result<()> {
        if rng_seeds.len() != self.rng_seeds.len() {
            return Err(RenderError::BufferSizeMismatch {
                buffer: "rng seed",
                expected: self.rng_seeds.len(),
                actual: rng_seeds.len(),
            });
        }
        self.rng_seeds = rng_seeds;
        Ok(())
    }

    /// The next traced frame replaces the accumulation instead of adding to it.
    pub fn reset_accumulation(&mut self) {
        debug!(discarded = self.iteration, "accumulation reset");
        self.iteration = 0;
    }

    /// Runs one dispatch over every pixel. Tracing modes add one sample per
    /// pixel; post-process only resolves what has been accumulated so far.
    pub fn render_frame(&mut self, mode: FrameMode) -> Result<()> {
        let iteration = match mode {
            FrameMode::PostProcessOnly => self.iteration,
            FrameMode::TraceAndPostProcess | FrameMode::TraceOnly => self.iteration + 1,
        };
        let _span = tracing::info_span!("render_frame", ?mode, iteration).entered();

        let params = self.config.constant_params(self.camera, iteration);
        // a band never spans more than the whole image
        let band_rows = self.config.band_rows.min(self.config.height) as usize;
        let band_len = band_rows * self.config.width as usize;
        let band_count = self.accumulation.len().div_ceil(band_len);

        let (result_sender, result_receiver) = mpsc::channel();
        for (band, (accumulation, rng_seeds)) in self
            .accumulation
            .chunks(band_len)
            .zip(self.rng_seeds.chunks(band_len))
            .enumerate()
        {
            let mut accumulation = accumulation.to_vec();
            let mut rng_seeds = rng_seeds.to_vec();
            let scene = self.scene.clone();
            let result_sender = result_sender.clone();
            let first_id = (band * band_len) as u32;

            self.threadpool.execute(move || {
                let globals = KernelGlobals::new(&scene, &params);
                let writes = accumulation
                    .iter_mut()
                    .zip(rng_seeds.iter_mut())
                    .enumerate()
                    .filter_map(|(i, (acc, seed))| {
                        run_lane(mode, &globals, first_id + i as u32, acc, seed)
                    })
                    .collect();
                // the receiver is held until every sender is gone, so this cannot fail
                let _ = result_sender.send(BandResult {
                    band,
                    accumulation,
                    rng_seeds,
                    writes,
                });
            });
        }
        // once every job is done (or dead) the receiver sees a closed channel
        drop(result_sender);

        let mut results: Vec<Option<BandResult>> = (0..band_count).map(|_| None).collect();
        for result in result_receiver.iter() {
            let band = result.band;
            results[band] = Some(result);
        }
        if let Some(band) = results.iter().position(Option::is_none) {
            warn!(band, panics = self.threadpool.panic_count(), "worker lost, frame discarded");
            return Err(RenderError::WorkerLost { band });
        }

        for result in results.into_iter().flatten() {
            let start = result.band * band_len;
            let end = start + result.accumulation.len();
            self.accumulation[start..end].copy_from_slice(&result.accumulation);
            self.rng_seeds[start..end].copy_from_slice(&result.rng_seeds);
            for write in result.writes {
                self.framebuffer[write.index as usize] = write.rgba;
            }
        }
        self.iteration = iteration;
        debug!(bands = band_count, "frame committed");
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn framebuffer(&self) -> &[Vec4] {
        &self.framebuffer
    }

    pub fn accumulation(&self) -> &[Vec4] {
        &self.accumulation
    }

    pub fn rng_seeds(&self) -> &[u32] {
        &self.rng_seeds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_system::{material::Material, scene::SceneBuilder, vec_math::Mat4};

    fn renderer(band_rows: u32) -> Renderer {
        let mut builder = SceneBuilder::new();
        let m = builder.add_material(Material::lambertian([0.5, 0.5, 0.5]));
        let sphere = builder.add_sphere(m, Mat4::identity()).unwrap();
        let scene = builder.build(vec![sphere]).unwrap();
        let config = RenderConfig {
            width: 7,
            height: 5,
            depth: 4,
            threads: 2,
            band_rows,
            ..RenderConfig::default()
        };
        Renderer::new(Arc::new(scene), config).unwrap()
    }

    #[test]
    fn iteration_counts_traced_frames_only() {
        let mut renderer = renderer(2);
        renderer.render_frame(FrameMode::TraceAndPostProcess).unwrap();
        renderer.render_frame(FrameMode::TraceOnly).unwrap();
        assert_eq!(renderer.iteration(), 2);
        renderer.render_frame(FrameMode::PostProcessOnly).unwrap();
        assert_eq!(renderer.iteration(), 2);
        assert!(renderer.accumulation().iter().all(|acc| acc.w == 2.0));

        renderer.reset_accumulation();
        assert_eq!(renderer.iteration(), 0);
        renderer.render_frame(FrameMode::TraceOnly).unwrap();
        assert!(renderer.accumulation().iter().all(|acc| acc.w == 1.0));
    }

    #[test]
    fn band_size_does_not_change_the_image() {
        let mut one_band = renderer(5);
        let mut many_bands = renderer(1);
        for _ in 0..3 {
            one_band.render_frame(FrameMode::TraceAndPostProcess).unwrap();
            many_bands.render_frame(FrameMode::TraceAndPostProcess).unwrap();
        }
        assert_eq!(one_band.accumulation(), many_bands.accumulation());
        assert_eq!(one_band.framebuffer(), many_bands.framebuffer());
        assert_eq!(one_band.rng_seeds(), many_bands.rng_seeds());
    }

    #[test]
    fn oversized_bands_cover_the_whole_image() {
        // rows times width would overflow a u32 if the bands were not clamped
        let mut oversized = renderer(u32::MAX / 4);
        let mut one_band = renderer(5);
        oversized.render_frame(FrameMode::TraceAndPostProcess).unwrap();
        one_band.render_frame(FrameMode::TraceAndPostProcess).unwrap();
        assert_eq!(oversized.accumulation(), one_band.accumulation());
        assert_eq!(oversized.framebuffer(), one_band.framebuffer());
    }

    #[test]
    fn seed_buffer_size_is_checked() {
        let mut renderer = renderer(1);
        assert!(matches!(
            renderer.set_rng_seeds(vec![1, 2, 3]),
            Err(RenderError::BufferSizeMismatch { expected: 35, actual: 3, .. })
        ));
        renderer.set_rng_seeds(vec![9; 35]).unwrap();
        assert!(renderer.rng_seeds().iter().all(|&s| s == 9));
    }

    #[test]
    fn invalid_scene_is_rejected_up_front() {
        let result = Renderer::new(Arc::new(Scene::default()), RenderConfig::default());
        assert!(matches!(result, Err(RenderError::EmptyTlas)));
    }
}
