use thiserror::Error;

/// Errors raised by the host side of the renderer: configuration, scene
/// validation, frame dispatch and image output.
///
/// The tracing core itself never fails; everything here is checked before a
/// frame is dispatched or after it has completed.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid render config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid render config: {0}")]
    InvalidConfig(String),

    /// The top level tree has no nodes, so there is no root to start from.
    #[error("scene has an empty top level bvh")]
    EmptyTlas,

    #[error("{level} node {node} references node {target} (count: {count})")]
    NodeOutOfRange {
        level: &'static str,
        node: usize,
        target: u32,
        count: usize,
    },

    /// A mesh node inside a BLAS, or a triangle node inside the TLAS.
    #[error("{level} node {node} is a {kind} node, which cannot appear at this level")]
    MisplacedNode {
        level: &'static str,
        node: usize,
        kind: &'static str,
    },

    #[error(
        "transform {transform_id} needs entries {} and {} (count: {count})",
        .transform_id * 2,
        .transform_id * 2 + 1
    )]
    TransformOutOfRange { transform_id: u32, count: usize },

    #[error("instance transform is not invertible")]
    SingularTransform,

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("material {index} out of range (count: {count})")]
    MaterialOutOfRange { index: u32, count: usize },

    #[error("triangle {triangle} reads {array} entry {index} (count: {count})")]
    AttributeOutOfRange {
        array: &'static str,
        triangle: u32,
        index: u32,
        count: usize,
    },

    #[error("bvh needs {required} traversal stack entries but only {capacity} are available")]
    BvhTooDeep { required: usize, capacity: usize },

    #[error("{buffer} buffer has {actual} entries, expected {expected}")]
    BufferSizeMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A worker job died before reporting its band; the frame was discarded.
    #[error("render worker exited before finishing band {band}")]
    WorkerLost { band: usize },
}

pub type Result<T> = std::result::Result<T, RenderError>;
