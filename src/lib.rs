//! Offline chunked-LOD terrain mesh preprocessing.
//!
//! Turns a square heightfield into a quadtree of precomputed chunk meshes in
//! the style of Thatcher Ulrich's chunked LOD scheme. An error-driven pass
//! over the binary triangle tree assigns every sample the coarsest level it
//! must appear at, the levels are propagated into global consistency, and
//! each chunk is then meshed with crack-covering skirts, per-vertex morph
//! deltas towards the next coarser mesh, and collision acceleration data on
//! the leaves. Everything is serialized into a single file: a fixed header,
//! a table of contents indexed by quadtree rank, and the mesh blocks.
//!
//! The pipeline is deterministic: the same input and configuration produce
//! a byte-identical file.

pub mod activation;
pub mod collision;
pub mod error;
pub mod generator;
pub mod heightfield;
pub mod mesher;
pub mod quadtree;
pub mod stats;

pub use activation::ActivationField;
pub use collision::CollisionBinner;
pub use error::{ChunkGenError, ChunkGenResult};
pub use generator::{ChunkFileGenerator, GenerateConfig};
pub use heightfield::Heightfield;
pub use mesher::ChunkMesher;
pub use stats::GenStats;
