//! Square heightfield storage with quadtree-addressable sample positions.

use crate::{
    error::{ChunkGenError, ChunkGenResult},
    quadtree,
};
use byteorder::{LittleEndian, ReadBytesExt};
use glam::IVec2;
use ndarray::Array2;
use std::{fs, io::Read, path::Path};

/// A square grid of `(2^size_log2)+1` signed height samples per axis.
///
/// The extra sample per axis guarantees that every quadtree subdivision of the
/// grid lands on an existing sample, which the binary-triangle-tree meshing
/// relies on throughout. Heights are stored in discrete units; multiply by
/// `vertical_scale` to get world units.
pub struct Heightfield {
    samples: Array2<i16>,
    size_log2: u32,
    sample_spacing: f32,
    vertical_scale: f32,
}

impl Heightfield {
    pub fn new(size_log2: u32, sample_spacing: f32, vertical_scale: f32) -> Self {
        let real_size = (1 << size_log2) + 1;

        Self {
            samples: Array2::zeros((real_size, real_size)),
            size_log2,
            sample_spacing,
            vertical_scale,
        }
    }

    pub fn from_fn(
        size_log2: u32,
        sample_spacing: f32,
        vertical_scale: f32,
        mut sample: impl FnMut(IVec2) -> i16,
    ) -> Self {
        let mut heightfield = Self::new(size_log2, sample_spacing, vertical_scale);

        for ((y, x), value) in heightfield.samples.indexed_iter_mut() {
            *value = sample(IVec2::new(x as i32, y as i32));
        }

        heightfield
    }

    /// Reads a raw little-endian unsigned 16 bit heightfield of
    /// `(2^size_log2)+1` samples per axis. Samples are recentered around zero.
    pub fn from_raw16<R: Read>(
        mut reader: R,
        size_log2: u32,
        sample_spacing: f32,
        vertical_scale: f32,
    ) -> ChunkGenResult<Self> {
        let mut heightfield = Self::new(size_log2, sample_spacing, vertical_scale);

        for value in heightfield.samples.iter_mut() {
            let raw = reader.read_u16::<LittleEndian>()?;
            *value = (raw as i32 - 0x8000) as i16;
        }

        Ok(heightfield)
    }

    /// Loads a raw heightfield file, inferring the grid size from the file
    /// length.
    pub fn load_raw16<P: AsRef<Path>>(
        path: P,
        sample_spacing: f32,
        vertical_scale: f32,
    ) -> ChunkGenResult<Self> {
        let data = fs::read(path)?;
        let real_size = (data.len() as f64 / 2.0).sqrt() as u32;

        if (real_size * real_size * 2) as usize != data.len() {
            return Err(ChunkGenError::InvalidHeightfieldSize(real_size));
        }

        let size_log2 = size_log2_for(real_size)?;

        Self::from_raw16(data.as_slice(), size_log2, sample_spacing, vertical_scale)
    }

    /// Loads a 16 bit grayscale image as a heightfield. Samples are recentered
    /// around zero.
    pub fn load_image<P: AsRef<Path>>(
        path: P,
        sample_spacing: f32,
        vertical_scale: f32,
    ) -> ChunkGenResult<Self> {
        let image = image::open(path)?;
        let image = image
            .as_luma16()
            .ok_or(ChunkGenError::InvalidImageFormat)?;

        if image.width() != image.height() {
            return Err(ChunkGenError::InvalidHeightfieldSize(image.width()));
        }

        let size_log2 = size_log2_for(image.width())?;

        Ok(Self::from_fn(
            size_log2,
            sample_spacing,
            vertical_scale,
            |pos| (image.get_pixel(pos.x as u32, pos.y as u32).0[0] as i32 - 0x8000) as i16,
        ))
    }

    /// The grid size excluding the duplicated edge row/column.
    #[inline]
    pub fn size(&self) -> i32 {
        1 << self.size_log2
    }

    #[inline]
    pub fn size_log2(&self) -> u32 {
        self.size_log2
    }

    #[inline]
    pub fn sample_spacing(&self) -> f32 {
        self.sample_spacing
    }

    #[inline]
    pub fn vertical_scale(&self) -> f32 {
        self.vertical_scale
    }

    #[inline]
    pub fn sample(&self, pos: IVec2) -> i16 {
        self.samples[(pos.y as usize, pos.x as usize)]
    }

    #[inline]
    pub fn set_sample(&mut self, pos: IVec2, height: i16) {
        self.samples[(pos.y as usize, pos.x as usize)] = height;
    }

    /// The breadth-first quadtree rank of the node centered at `pos`.
    ///
    /// The lowest set bit of `x | y` determines the node's depth: the center
    /// of a node at depth `d` is an odd multiple of half its size, so deeper
    /// centers carry lower set bits. This makes the mapping a bijection over
    /// all node centers of the fully populated tree.
    pub fn node_index(&self, pos: IVec2) -> u32 {
        debug_assert!(pos.x > 0 && pos.x < self.size() && pos.y > 0 && pos.y < self.size());

        let low_bit = (pos.x | pos.y).trailing_zeros();
        let depth = self.size_log2 - low_bit - 1;
        let shift = low_bit + 1;

        quadtree::node_index(depth, (pos.x >> shift) as u32, (pos.y >> shift) as u32)
    }

    /// The coarsest chunk level that has a chunk boundary along the grid
    /// coordinate `coord`, for a chunk tree whose root sits at `root_level`.
    ///
    /// Every chunk edge is interior to some least-detailed chunk; skirts never
    /// need to account for neighbors coarser than that.
    pub fn minimum_edge_lod(&self, coord: i32, root_level: i8) -> i8 {
        if coord <= 0 || coord >= self.size() {
            return root_level;
        }

        let leaf_log = self.size_log2 - root_level as u32;
        let low_bit = (coord as u32).trailing_zeros() as i32;

        (low_bit - leaf_log as i32).clamp(0, root_level as i32) as i8
    }
}

fn size_log2_for(real_size: u32) -> ChunkGenResult<u32> {
    let size = real_size.wrapping_sub(1);

    if size == 0 || !size.is_power_of_two() {
        return Err(ChunkGenError::InvalidHeightfieldSize(real_size));
    }

    Ok(size.trailing_zeros())
}
