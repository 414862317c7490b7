use thiserror::Error;

pub type ChunkGenResult<T> = Result<T, ChunkGenError>;

/// Errors arising from input validation and I/O.
///
/// Violated generation invariants are bugs, not inputs, and panic instead.
#[derive(Debug, Error)]
pub enum ChunkGenError {
    #[error("heightfield size {0} per axis is not a power of two plus one")]
    InvalidHeightfieldSize(u32),

    #[error("tree depth {tree_depth} does not fit a heightfield of {size_log2} size levels")]
    InvalidTreeDepth { tree_depth: u32, size_log2: u32 },

    #[error("heightfield images must be 16 bit grayscale")]
    InvalidImageFormat,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
