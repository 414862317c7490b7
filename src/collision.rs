//! Per-chunk collision acceleration data.
//!
//! Leaf chunks carry a small min/max-height quadtree over a square grid of
//! bins, plus per-bin lists of triangle offsets into the chunk's index
//! buffer. Ray queries descend the quadtree and only test the triangles of
//! the bins they actually cross.

use crate::{error::ChunkGenResult, quadtree};
use byteorder::{LittleEndian, WriteBytesExt};
use glam::{IVec2, Vec2};
use itertools::iproduct;
use std::{collections::HashMap, io::Write};

pub const COLLISION_TREE_DEPTH: u32 = 4;

/// Bins per axis, the leaf level of the collision quadtree.
pub const COLLISION_GRID_SIZE: u32 = 1 << (COLLISION_TREE_DEPTH - 1);

/// Terminates each bin's run in the triangle buffer.
pub const BIN_LIST_TERMINATOR: u16 = 0xFFFF;

/// Packs per-bin triangle lists into one shared buffer.
///
/// Each bin stores the start offset of its run; runs are terminated by
/// [`BIN_LIST_TERMINATOR`]. Identical runs are stored once and shared, which
/// collapses the common case of many bins covered by the same two triangles.
pub struct CollisionBinner {
    grid_size: u32,
    offsets: Vec<u16>,
    buffer: Vec<u16>,
    runs: HashMap<Vec<u16>, u16>,
}

impl CollisionBinner {
    pub fn new(grid_size: u32) -> Self {
        Self {
            grid_size,
            offsets: vec![0; (grid_size * grid_size) as usize],
            buffer: Vec::new(),
            runs: HashMap::new(),
        }
    }

    /// Appends the triangle list of `bin` and records its run offset.
    pub fn insert_bin_list(&mut self, bin: IVec2, triangle_offsets: &[u16]) {
        let offset = match self.runs.get(triangle_offsets) {
            Some(&offset) => offset,
            None => {
                assert!(
                    self.buffer.len() < BIN_LIST_TERMINATOR as usize,
                    "collision triangle buffer exceeds the u16 offset range"
                );

                let offset = self.buffer.len() as u16;

                self.buffer.extend_from_slice(triangle_offsets);
                self.buffer.push(BIN_LIST_TERMINATOR);
                self.runs.insert(triangle_offsets.to_vec(), offset);

                offset
            }
        };

        self.offsets[(bin.x as u32 * self.grid_size + bin.y as u32) as usize] = offset;
    }

    /// Serializes the bin-offset table, the buffer length and the buffer.
    pub fn write<S: Write>(&self, stream: &mut S) -> ChunkGenResult<()> {
        for &offset in &self.offsets {
            stream.write_u16::<LittleEndian>(offset)?;
        }

        stream.write_u32::<LittleEndian>(self.buffer.len() as u32)?;

        for &element in &self.buffer {
            stream.write_u16::<LittleEndian>(element)?;
        }

        Ok(())
    }
}

/// Whether the triangle `(a, b, c)` overlaps the axis-aligned rectangle.
///
/// Bins span the chunk's full height range, so overlap testing reduces to
/// the ground plane. Separating axis test over the rectangle axes and the
/// three edge normals; touching counts as overlap.
pub fn tri_rect_overlap(a: Vec2, b: Vec2, c: Vec2, rect_min: Vec2, rect_max: Vec2) -> bool {
    let tri_min = a.min(b).min(c);
    let tri_max = a.max(b).max(c);

    if tri_max.x < rect_min.x
        || tri_min.x > rect_max.x
        || tri_max.y < rect_min.y
        || tri_min.y > rect_max.y
    {
        return false;
    }

    let corners = [
        rect_min,
        Vec2::new(rect_max.x, rect_min.y),
        rect_max,
        Vec2::new(rect_min.x, rect_max.y),
    ];

    for (start, end, opposite) in [(a, b, c), (b, c, a), (c, a, b)] {
        let edge = end - start;
        let normal = Vec2::new(-edge.y, edge.x);

        // Both edge endpoints project to the same value.
        let edge_projection = normal.dot(start);
        let opposite_projection = normal.dot(opposite);

        let tri_low = edge_projection.min(opposite_projection);
        let tri_high = edge_projection.max(opposite_projection);

        let mut rect_low = f32::MAX;
        let mut rect_high = f32::MIN;

        for corner in corners {
            let projection = normal.dot(corner);
            rect_low = rect_low.min(projection);
            rect_high = rect_high.max(projection);
        }

        if tri_high < rect_low || tri_low > rect_high {
            return false;
        }
    }

    true
}

/// Builds the min/max-height quadtree bottom-up from the leaf bins.
///
/// `bins_min`/`bins_max` are keyed `x * grid_size + y`; the returned arrays
/// are in breadth-first `node_index` order. Every bin must be populated.
pub fn build_minmax_tree(depth: u32, bins_min: &[i16], bins_max: &[i16]) -> (Vec<i16>, Vec<i16>) {
    let grid_size = 1 << (depth - 1);
    let node_count = quadtree::node_count(depth) as usize;

    let mut tree_min = vec![i16::MAX; node_count];
    let mut tree_max = vec![i16::MIN; node_count];

    for (x, y) in iproduct!(0..grid_size, 0..grid_size) {
        let index = quadtree::node_index(depth - 1, x, y) as usize;

        tree_min[index] = bins_min[(x * grid_size + y) as usize];
        tree_max[index] = bins_max[(x * grid_size + y) as usize];

        assert!(
            tree_min[index] <= tree_max[index],
            "unpopulated collision bin ({x}, {y})"
        );
    }

    for level in (0..depth - 1).rev() {
        for (x, y) in iproduct!(0..1 << level, 0..1 << level) {
            let index = quadtree::node_index(level, x, y) as usize;

            for (sub_x, sub_y) in iproduct!(0..2, 0..2) {
                let sub_index =
                    quadtree::node_index(level + 1, x * 2 + sub_x, y * 2 + sub_y) as usize;

                assert!(
                    tree_min[sub_index] <= tree_max[sub_index],
                    "invalid collision child node min/max"
                );

                tree_min[index] = tree_min[index].min(tree_min[sub_index]);
                tree_max[index] = tree_max[index].max(tree_max[sub_index]);
            }
        }
    }

    (tree_min, tree_max)
}
