pub mod bvh;
pub mod integrator;
pub mod kernel;
pub mod material;
pub mod postprocess;
pub mod progressive_rendering;
pub mod random;
pub mod ray;
pub mod scene;
pub mod transform;
pub mod vec_math;
pub mod vertex;
