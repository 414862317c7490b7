//! Per-chunk mesh accumulation and serialization.

use crate::{
    activation::ActivationField,
    collision::{self, CollisionBinner, COLLISION_GRID_SIZE, COLLISION_TREE_DEPTH},
    error::ChunkGenResult,
    stats::GenStats,
};
use byteorder::{LittleEndian, WriteBytesExt};
use glam::{IVec2, Vec2, Vec3};
use itertools::iproduct;
use log::warn;
use std::{
    collections::HashMap,
    io::{Seek, SeekFrom, Write},
};

pub const MESH_SENTINEL: u32 = 0xBEEF_1234;
pub const MESH_POSTSCRIPT: u32 = 0xB1E2_E3F4;
pub const COLLISION_SENTINEL: u32 = 0xB33F_D34D;
pub const DEBUG_SENTINEL: u32 = 0xDEAD_BEEF;

struct Vert {
    pos: IVec2,
    z: i16,
    special: bool,
}

/// Accumulates one chunk's vertices and triangle list, then serializes the
/// mesh block.
///
/// Grid vertices take their height from the heightfield and morph towards
/// the next coarser mesh; special vertices carry an explicit height (skirts)
/// and never morph.
pub struct ChunkMesher<'a> {
    field: &'a ActivationField,
    verts: Vec<Vert>,
    grid_lookup: HashMap<IVec2, u16>,
    indices: Vec<u16>,
    degenerate_triangles: u32,

    // Valid after update_bounds.
    bounds_min: Vec3,
    bounds_max: Vec3,
    min_z: i16,
    max_z: i16,
    compression: Vec2,
}

impl<'a> ChunkMesher<'a> {
    pub fn new(field: &'a ActivationField) -> Self {
        Self {
            field,
            verts: Vec::new(),
            grid_lookup: HashMap::new(),
            indices: Vec::new(),
            degenerate_triangles: 0,
            bounds_min: Vec3::ZERO,
            bounds_max: Vec3::ZERO,
            min_z: 0,
            max_z: 0,
            compression: Vec2::ONE,
        }
    }

    fn push_vert(&mut self, vert: Vert) -> u16 {
        assert!(
            self.verts.len() < 0xFFFF,
            "chunk has more than 65535 vertices; regenerate with a deeper chunk tree"
        );

        self.verts.push(vert);
        (self.verts.len() - 1) as u16
    }

    /// The index of the grid vertex at `pos`, inserting it on first use.
    pub fn grid_vert(&mut self, pos: IVec2) -> u16 {
        if let Some(&index) = self.grid_lookup.get(&pos) {
            return index;
        }

        let index = self.push_vert(Vert {
            pos,
            z: self.field.sample(pos),
            special: false,
        });
        self.grid_lookup.insert(pos, index);

        index
    }

    /// The index of the special vertex at `pos` with explicit height `z`,
    /// inserting it on first use. Special vertices at the same position but
    /// different heights stay distinct.
    pub fn special_vert(&mut self, pos: IVec2, z: i16) -> u16 {
        for (index, vert) in self.verts.iter().enumerate() {
            if vert.special && vert.pos == pos && vert.z == z {
                return index as u16;
            }
        }

        self.push_vert(Vert {
            pos,
            z,
            special: true,
        })
    }

    /// Appends a triangle. Triangles with a repeated index are dropped and
    /// counted as degenerate.
    pub fn emit_tri(&mut self, a: u16, b: u16, c: u16) {
        if a == b || b == c || c == a {
            self.degenerate_triangles += 1;
            return;
        }

        self.indices.extend_from_slice(&[a, b, c]);
    }

    pub fn triangle_count(&self) -> u32 {
        self.indices.len() as u32 / 3
    }

    /// Minimum height over all accumulated vertices, in discrete units.
    /// Valid after [`Self::write`].
    pub fn min_height(&self) -> i16 {
        self.min_z
    }

    /// Maximum height over all accumulated vertices, in discrete units.
    /// Valid after [`Self::write`].
    pub fn max_height(&self) -> i16 {
        self.max_z
    }

    fn vert_world(&self, vert: &Vert) -> Vec3 {
        let height = self.field.height();

        Vec3::new(
            vert.pos.x as f32 * height.sample_spacing(),
            vert.pos.y as f32 * height.sample_spacing(),
            vert.z as f32 * height.vertical_scale(),
        )
    }

    fn update_bounds(&mut self) {
        assert!(!self.verts.is_empty(), "cannot bound an empty chunk");

        self.bounds_min = Vec3::MAX;
        self.bounds_max = Vec3::MIN;
        self.min_z = i16::MAX;
        self.max_z = i16::MIN;

        for vert in &self.verts {
            let world = self.vert_world(vert);

            self.bounds_min = self.bounds_min.min(world);
            self.bounds_max = self.bounds_max.max(world);
            self.min_z = self.min_z.min(vert.z);
            self.max_z = self.max_z.max(vert.z);
        }

        // Quantize into [-2^14, 2^14]. That range holds 2^15 + 1 values,
        // matching the 2^N + 1 vertex positions of the triangle tree.
        let half_extents = ((self.bounds_max - self.bounds_min) / 2.0).max(Vec3::ONE);

        self.compression = Vec2::new(
            (1 << 14) as f32 / half_extents.x,
            (1 << 14) as f32 / half_extents.y,
        );
    }

    fn write_vertex<S: Write>(&self, stream: &mut S, vert: &Vert, level: i8) -> ChunkGenResult<()> {
        let spacing = self.field.height().sample_spacing();
        let center = (self.bounds_min + self.bounds_max) / 2.0;

        let x = ((vert.pos.x as f32 * spacing - center.x) * self.compression.x + 0.5).floor() as i32;
        let y = ((vert.pos.y as f32 * spacing - center.y) * self.compression.y + 0.5).floor() as i32;

        if i32::from(x as i16) != x || i32::from(y as i16) != y {
            warn!("quantized position overflow at {}, clamping", vert.pos);
        }

        stream.write_i16::<LittleEndian>(x.clamp(i16::MIN as i32, i16::MAX as i32) as i16)?;
        stream.write_i16::<LittleEndian>(y.clamp(i16::MIN as i32, i16::MAX as i32) as i16)?;
        stream.write_i16::<LittleEndian>(vert.z)?;

        // The offset to the same spot in the next coarser mesh. Special
        // vertices do not morph.
        let morph_delta = if vert.special {
            0
        } else {
            let lerped = self.field.height_at_lod(vert.pos, level + 1);
            i32::from(lerped) - i32::from(vert.z)
        };

        if i32::from(morph_delta as i16) != morph_delta {
            warn!("morph delta overflow at {}, clamping", vert.pos);
        }

        stream.write_i16::<LittleEndian>(
            morph_delta.clamp(i16::MIN as i32, i16::MAX as i32) as i16
        )?;

        Ok(())
    }

    /// Serializes the chunk's mesh block at the end of the stream and returns
    /// its absolute offset for the table of contents.
    pub fn write<S: Write + Seek>(
        &mut self,
        stream: &mut S,
        level: i8,
        write_collision: bool,
        debug_data: bool,
        stats: &mut GenStats,
    ) -> ChunkGenResult<u64> {
        assert!(!self.indices.is_empty(), "chunk has no triangles to write");

        self.update_bounds();

        stream.seek(SeekFrom::End(0))?;

        if debug_data {
            stream.write_u32::<LittleEndian>(DEBUG_SENTINEL)?;
        }

        let mesh_offset = stream.stream_position()?;

        stream.write_u32::<LittleEndian>(MESH_SENTINEL)?;

        stream.write_u16::<LittleEndian>(self.verts.len() as u16)?;
        for i in 0..self.verts.len() {
            self.write_vertex(stream, &self.verts[i], level)?;
        }

        stream.write_i32::<LittleEndian>(self.indices.len() as i32)?;
        for &index in &self.indices {
            stream.write_u16::<LittleEndian>(index)?;
        }

        stream.write_u32::<LittleEndian>(self.triangle_count())?;

        stats.output_real_triangles += self.triangle_count();
        stats.output_degenerate_triangles += self.degenerate_triangles;

        if write_collision {
            stream.write_u8(1)?;
            self.write_collision(stream)?;
        } else {
            stream.write_u8(0)?;
        }

        stream.write_u32::<LittleEndian>(MESH_POSTSCRIPT)?;

        Ok(mesh_offset)
    }

    /// Bins the grounded triangles into the collision grid and serializes
    /// the min/max quadtree, bin-offset table and triangle buffer.
    fn write_collision<S: Write>(&self, stream: &mut S) -> ChunkGenResult<()> {
        let grid_size = COLLISION_GRID_SIZE;
        let bin_count = (grid_size * grid_size) as usize;

        let mut bins: Vec<Vec<u16>> = vec![Vec::new(); bin_count];
        let mut bins_min = vec![i16::MAX; bin_count];
        let mut bins_max = vec![i16::MIN; bin_count];

        let extent = self.bounds_max - self.bounds_min;
        let bin_size = Vec2::new(extent.x, extent.y) / grid_size as f32;

        for (i, j) in iproduct!(0..grid_size, 0..grid_size) {
            let rect_min = Vec2::new(bin_size.x * i as f32, bin_size.y * j as f32);
            let rect_max = rect_min + bin_size;

            let bin = (i * grid_size + j) as usize;

            for triangle_offset in (0..self.indices.len()).step_by(3) {
                let a = &self.verts[self.indices[triangle_offset] as usize];
                let b = &self.verts[self.indices[triangle_offset + 1] as usize];
                let c = &self.verts[self.indices[triangle_offset + 2] as usize];

                // Skirts are not collidable.
                if a.special || b.special || c.special {
                    continue;
                }

                // Positions relative to the chunk bounds, ground plane only.
                let a_pos = (self.vert_world(a) - self.bounds_min).truncate();
                let b_pos = (self.vert_world(b) - self.bounds_min).truncate();
                let c_pos = (self.vert_world(c) - self.bounds_min).truncate();

                if collision::tri_rect_overlap(a_pos, b_pos, c_pos, rect_min, rect_max) {
                    assert!(
                        triangle_offset < 0xFFFF,
                        "collision triangle offset collides with the bin terminator"
                    );

                    bins[bin].push(triangle_offset as u16);

                    // Unclipped, so a large triangle widens the bin's range
                    // beyond its rectangle. Conservative but correct.
                    bins_min[bin] = bins_min[bin].min(a.z).min(b.z).min(c.z);
                    bins_max[bin] = bins_max[bin].max(a.z).max(b.z).max(c.z);
                }
            }

            assert!(
                bins_min[bin] <= bins_max[bin],
                "empty collision bin ({i}, {j})"
            );
        }

        let (tree_min, tree_max) = collision::build_minmax_tree(COLLISION_TREE_DEPTH, &bins_min, &bins_max);

        for i in 0..tree_min.len() {
            stream.write_i16::<LittleEndian>(tree_min[i])?;
            stream.write_i16::<LittleEndian>(tree_max[i])?;
        }

        stream.write_u32::<LittleEndian>(COLLISION_SENTINEL)?;

        let mut binner = CollisionBinner::new(grid_size);

        for (i, j) in iproduct!(0..grid_size as i32, 0..grid_size as i32) {
            binner.insert_bin_list(IVec2::new(i, j), &bins[(i * grid_size as i32 + j) as usize]);
        }

        binner.write(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightfield::Heightfield;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    fn flat_field(size_log2: u32, height: i16) -> ActivationField {
        ActivationField::new(Heightfield::from_fn(size_log2, 2.0, 1.0, |_| height))
    }

    #[test]
    fn grid_verts_are_deduplicated() {
        let field = flat_field(2, 0);
        let mut mesher = ChunkMesher::new(&field);

        let a = mesher.grid_vert(IVec2::new(0, 0));
        let b = mesher.grid_vert(IVec2::new(4, 0));
        assert_ne!(a, b);
        assert_eq!(mesher.grid_vert(IVec2::new(0, 0)), a);

        let s = mesher.special_vert(IVec2::new(0, 0), -5);
        assert_ne!(s, a);
        assert_eq!(mesher.special_vert(IVec2::new(0, 0), -5), s);
        assert_ne!(mesher.special_vert(IVec2::new(0, 0), -6), s);

        assert_eq!(mesher.verts.len(), 4);
    }

    #[test]
    fn degenerate_triangles_are_dropped() {
        let field = flat_field(2, 0);
        let mut mesher = ChunkMesher::new(&field);

        let a = mesher.grid_vert(IVec2::new(0, 0));
        let b = mesher.grid_vert(IVec2::new(4, 0));
        let c = mesher.grid_vert(IVec2::new(0, 4));

        mesher.emit_tri(a, b, c);
        mesher.emit_tri(a, a, b);
        mesher.emit_tri(c, b, c);

        assert_eq!(mesher.triangle_count(), 1);
        assert_eq!(mesher.degenerate_triangles, 2);
    }

    #[test]
    fn writes_flat_quad_with_zero_morph() {
        let field = flat_field(2, 1000);
        let mut mesher = ChunkMesher::new(&field);
        let mut stats = GenStats::default();

        let sw = mesher.grid_vert(IVec2::new(0, 4));
        let se = mesher.grid_vert(IVec2::new(4, 4));
        let nw = mesher.grid_vert(IVec2::new(0, 0));
        let ne = mesher.grid_vert(IVec2::new(4, 0));

        mesher.emit_tri(nw, sw, se);
        mesher.emit_tri(nw, se, ne);

        let mut cursor = Cursor::new(Vec::new());
        let offset = mesher
            .write(&mut cursor, 1, false, false, &mut stats)
            .unwrap();
        assert_eq!(offset, 0);

        assert_eq!(mesher.min_height(), 1000);
        assert_eq!(mesher.max_height(), 1000);

        cursor.set_position(0);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), MESH_SENTINEL);
        assert_eq!(cursor.read_u16::<LittleEndian>().unwrap(), 4);

        for _ in 0..4 {
            let x = cursor.read_i16::<LittleEndian>().unwrap();
            let y = cursor.read_i16::<LittleEndian>().unwrap();
            let z = cursor.read_i16::<LittleEndian>().unwrap();
            let morph = cursor.read_i16::<LittleEndian>().unwrap();

            assert!(x.unsigned_abs() <= 1 << 14);
            assert!(y.unsigned_abs() <= 1 << 14);
            assert_eq!(z, 1000);
            assert_eq!(morph, 0);
        }

        assert_eq!(cursor.read_i32::<LittleEndian>().unwrap(), 6);
        for _ in 0..6 {
            cursor.read_u16::<LittleEndian>().unwrap();
        }
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 2);
        assert_eq!(cursor.read_u8().unwrap(), 0);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), MESH_POSTSCRIPT);

        assert_eq!(stats.output_real_triangles, 2);
    }
}
