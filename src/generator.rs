//! Whole-file chunk generation.
//!
//! Drives the pipeline end to end: activation levels, propagation, the file
//! header and table of contents, then a recursive descent over the chunk
//! quadtree that meshes and serializes every chunk carrying detail.

use crate::{
    activation::ActivationField,
    collision::COLLISION_TREE_DEPTH,
    error::{ChunkGenError, ChunkGenResult},
    mesher::ChunkMesher,
    quadtree,
    stats::GenStats,
};
use byteorder::{LittleEndian, WriteBytesExt};
use glam::IVec2;
use itertools::iproduct;
use log::{info, warn};
use std::io::{Seek, SeekFrom, Write};

pub const FILE_MAGIC: &[u8; 4] = b"CHLD";
pub const FILE_VERSION: u16 = 1;

/// The renderer tolerates at most this LOD difference between neighboring
/// chunks; skirts are sized for it.
pub const MAX_NEIGHBOR_LEVEL_DIFFERENCE: i32 = 2;

#[derive(Clone, Debug)]
pub struct GenerateConfig {
    /// Levels in the chunk quadtree. Leaf chunks cover
    /// `2^(size_log2 - tree_depth + 1)` samples per axis.
    pub tree_depth: u32,
    /// World-space error at which a vertex must appear in the finest mesh.
    pub base_max_error: f32,
    /// Verify the propagation invariant after the activation passes.
    pub do_checks: bool,
    /// Mark the file as a debug build and fence each mesh block with an
    /// extra sentinel.
    pub debug_data: bool,
}

pub struct ChunkFileGenerator<'a> {
    field: &'a mut ActivationField,
    config: GenerateConfig,
    root_level: i8,
    toc_start: u64,
    stats: GenStats,
}

impl<'a> ChunkFileGenerator<'a> {
    pub fn new(field: &'a mut ActivationField, config: GenerateConfig) -> Self {
        let root_level = config.tree_depth.saturating_sub(1) as i8;

        Self {
            field,
            config,
            root_level,
            toc_start: 0,
            stats: GenStats::default(),
        }
    }

    /// Runs the whole pipeline and writes one chunk file to `stream`.
    pub fn generate<S: Write + Seek>(&mut self, stream: &mut S) -> ChunkGenResult<GenStats> {
        let size_log2 = self.field.height().size_log2();
        let tree_depth = self.config.tree_depth;

        if tree_depth == 0 || tree_depth > size_log2 {
            return Err(ChunkGenError::InvalidTreeDepth {
                tree_depth,
                size_log2,
            });
        }

        info!(
            "generating chunked geometry (tree_depth={tree_depth}, base_max_error={})",
            self.config.base_max_error
        );

        self.stats = GenStats::default();
        let size = self.field.height().size();
        self.stats.input_vertices = (size * size) as u32;

        info!("calculating activation levels");
        self.field
            .compute_levels(self.config.base_max_error, &mut self.stats);

        info!("propagating activation levels");
        for target in 0..size_log2 as i8 {
            self.field.propagate(target, &mut self.stats);
        }

        if self.config.do_checks {
            info!("checking activation levels");
            let violations = self.field.check_propagation();
            assert_eq!(violations, 0, "activation level propagation is inconsistent");
        }

        info!("writing header and table of contents");
        self.write_header(stream)?;

        info!("generating meshes");
        self.generate_node_data(
            stream,
            IVec2::ZERO,
            size_log2,
            self.root_level,
            i16::MIN,
            i16::MAX,
        )?;

        self.stats.output_bytes = stream.seek(SeekFrom::End(0))?;
        self.stats.report(tree_depth);

        Ok(self.stats.clone())
    }

    fn write_header<S: Write + Seek>(&mut self, stream: &mut S) -> ChunkGenResult<()> {
        let height = self.field.height();
        let tree_depth = self.config.tree_depth;

        stream.write_all(FILE_MAGIC)?;
        stream.write_u16::<LittleEndian>(FILE_VERSION)?;
        stream.write_u16::<LittleEndian>(tree_depth as u16)?;
        stream.write_f32::<LittleEndian>(self.config.base_max_error)?;
        stream.write_f32::<LittleEndian>(height.vertical_scale())?;

        // World-space extent of the most detailed chunks.
        let leaf_size = (1 << (height.size_log2() - (tree_depth - 1))) as f32;
        stream.write_f32::<LittleEndian>(leaf_size * height.sample_spacing())?;

        stream.write_u32::<LittleEndian>(quadtree::node_count(tree_depth))?;
        stream.write_u32::<LittleEndian>(COLLISION_TREE_DEPTH)?;
        stream.write_u8(self.config.debug_data as u8)?;

        // Zero-filled table of contents; mesh offsets are patched in as
        // chunks are emitted, and zero marks a chunk without geometry.
        self.toc_start = stream.stream_position()?;

        for _ in 0..quadtree::node_count(tree_depth) {
            stream.write_all(&[0; 8])?;
        }

        Ok(())
    }

    /// Whether the closed square at `pos` contains a sample whose activation
    /// level lies in `[0, level]`.
    ///
    /// Samples active only above `level` are already part of every coarser
    /// mesh, so they add nothing new here or in any finer chunk.
    fn square_has_detail(&self, pos: IVec2, size: i32, level: i8) -> bool {
        iproduct!(pos.y..=pos.y + size, pos.x..=pos.x + size).any(|(y, x)| {
            let sample_level = self.field.level(IVec2::new(x, y));
            sample_level >= 0 && sample_level <= level
        })
    }

    fn generate_node_data<S: Write + Seek>(
        &mut self,
        stream: &mut S,
        pos: IVec2,
        log_size: u32,
        level: i8,
        parent_min: i16,
        parent_max: i16,
    ) -> ChunkGenResult<()> {
        let size = 1 << log_size;
        let half = size >> 1;
        let c = pos + IVec2::splat(half);

        // A chunk without new detail stays zeroed in the TOC, and none of
        // its children can have detail either.
        if level < self.root_level && !self.square_has_detail(pos, size, level) {
            return Ok(());
        }

        self.stats.output_chunks += 1;

        // The chunk corners are always part of its mesh.
        for corner in [
            IVec2::ZERO,
            IVec2::new(size, 0),
            IVec2::new(0, size),
            IVec2::splat(size),
        ] {
            self.field.activate(pos + corner, level, &mut self.stats);
        }

        // Pruned subtrees never reach the deepest level, so collision goes
        // onto the effective leaves: chunks none of whose children will be
        // emitted.
        let is_leaf = level == 0
            || [
                pos,
                pos + IVec2::new(half, 0),
                pos + IVec2::new(0, half),
                pos + IVec2::splat(half),
            ]
            .iter()
            .all(|&child| !self.square_has_detail(child, half, level - 1));

        let field: &ActivationField = self.field;
        let mut mesher = ChunkMesher::new(field);

        // Skirts first, counterclockwise around the outside for consistent
        // winding, then the block mesh.
        generate_skirt(field, &mut mesher, c + IVec2::new(half, half), c + IVec2::new(half, -half), level, self.root_level);
        generate_skirt(field, &mut mesher, c + IVec2::new(half, -half), c + IVec2::new(-half, -half), level, self.root_level);
        generate_skirt(field, &mut mesher, c + IVec2::new(-half, -half), c + IVec2::new(-half, half), level, self.root_level);
        generate_skirt(field, &mut mesher, c + IVec2::new(-half, half), c + IVec2::new(half, half), level, self.root_level);

        generate_block(field, &mut mesher, level, log_size, c);

        let mesh_offset = mesher.write(
            stream,
            level,
            is_leaf,
            self.config.debug_data,
            &mut self.stats,
        )?;

        self.stats.note_chunk(level, mesher.triangle_count());

        let min = mesher.min_height();
        let max = mesher.max_height();

        if max > parent_max {
            warn!("chunk at {c} exceeds its parent's maximum height; expect paging issues");
        }
        if min < parent_min {
            warn!("chunk at {c} exceeds its parent's minimum height; expect paging issues");
        }

        drop(mesher);

        // Patch this chunk's TOC record.
        assert!(mesh_offset <= u64::from(u32::MAX), "chunk file exceeds 4 GiB");

        let record = self.toc_start + u64::from(self.field.height().node_index(c)) * 8;
        stream.seek(SeekFrom::Start(record))?;
        stream.write_i16::<LittleEndian>(min)?;
        stream.write_i16::<LittleEndian>(max)?;
        stream.write_u32::<LittleEndian>(mesh_offset as u32)?;

        if level > 0 {
            self.generate_node_data(stream, pos, log_size - 1, level - 1, min, max)?;
            self.generate_node_data(stream, pos + IVec2::new(half, 0), log_size - 1, level - 1, min, max)?;
            self.generate_node_data(stream, pos + IVec2::new(0, half), log_size - 1, level - 1, min, max)?;
            self.generate_node_data(stream, pos + IVec2::splat(half), log_size - 1, level - 1, min, max)?;
        }

        Ok(())
    }
}

/// Meshes the skirt along one chunk edge from `a` to `b`.
///
/// For every vertex active at `level`, a drop vertex is placed at the
/// minimum height the edge reaches in any mesh the renderer may show next
/// to this chunk, and the gap is filled with quads. Segments where the mesh
/// already touches that minimum produce no geometry.
fn generate_skirt(
    field: &ActivationField,
    mesher: &mut ChunkMesher,
    a: IVec2,
    b: IVec2,
    level: i8,
    root_level: i8,
) {
    let delta = (b - a).signum();

    assert!(
        delta != IVec2::ZERO && (delta.x == 0 || delta.y == 0),
        "skirt edges must be straight axis-aligned lines"
    );

    let steps = (b - a).abs().max_element() + 1;

    // The edge is interior to some least-detailed chunk; neighbors can
    // never be coarser than that, or than the paging limit.
    let major_coord = if delta.y == 0 { a.y } else { a.x };
    let min_edge_lod = field.height().minimum_edge_lod(major_coord, root_level);
    let level_diff = (i32::from(min_edge_lod) + 1)
        .min(i32::from(root_level))
        .saturating_sub(i32::from(level))
        .min(MAX_NEIGHBOR_LEVEL_DIFFERENCE) as i8;

    // First pass: per active vertex, the minimum height of the preceding
    // edge segment over the full mesh and all tolerated coarser meshes.
    let mut min_verts = Vec::new();
    let mut current_min = field.sample(a);

    for i in 0..steps {
        let pos = a + delta * i;

        current_min = current_min.min(field.sample(pos));

        if field.level(pos) >= level {
            for lod in level..=level + level_diff {
                current_min = current_min.min(field.height_at_lod(pos, lod));
            }

            min_verts.push(current_min);
            current_min = field.sample(pos);
        }
    }

    // Second pass: drop a quad per segment between consecutive active
    // vertices, down to the minimum of the two adjoining segments.
    let mut strip: Option<(u16, u16)> = None;
    let mut v_idx = 0;

    for i in 0..steps {
        let pos = a + delta * i;

        if field.level(pos) < level {
            continue;
        }

        let mut min_height = min_verts[v_idx];
        if let Some(&next) = min_verts.get(v_idx + 1) {
            min_height = min_height.min(next);
        }

        let new_a = mesher.grid_vert(pos);

        // A skirt that would not drop below the mesh is pure overdraw.
        let new_b = if min_height >= field.sample(pos) {
            new_a
        } else {
            mesher.special_vert(pos, min_height)
        };

        if let Some((strip_a, strip_b)) = strip {
            mesher.emit_tri(strip_a, strip_b, new_a);
            mesher.emit_tri(strip_b, new_b, new_a);
        }

        strip = Some((new_a, new_b));
        v_idx += 1;
    }
}

/// Meshes the square block of the chunk centered at `c`.
///
/// Two seed triangles share the square's diagonal; each is split at its
/// hypotenuse midpoint wherever that vertex is active at `level`, exactly
/// mirroring the recursion that assigned the activation levels.
fn generate_block(
    field: &ActivationField,
    mesher: &mut ChunkMesher,
    level: i8,
    log_size: u32,
    c: IVec2,
) {
    let half = 1 << (log_size - 1);

    let nw = c + IVec2::new(-half, -half);
    let ne = c + IVec2::new(half, -half);
    let sw = c + IVec2::new(-half, half);
    let se = c + IVec2::new(half, half);

    // Alternate the shared diagonal with the chunk's grid parity so the
    // split pattern lines up with the parent's across chunk seams.
    let origin = c - IVec2::splat(half);
    let parity = ((origin.x >> log_size) ^ (origin.y >> log_size)) & 1;

    if parity == 0 {
        emit_triangles(field, mesher, level, sw, se, nw);
        emit_triangles(field, mesher, level, ne, nw, se);
    } else {
        emit_triangles(field, mesher, level, nw, sw, ne);
        emit_triangles(field, mesher, level, se, ne, sw);
    }
}

fn emit_triangles(
    field: &ActivationField,
    mesher: &mut ChunkMesher,
    level: i8,
    apex: IVec2,
    right: IVec2,
    left: IVec2,
) {
    let d = left - right;

    if d.x.abs() > 1 || d.y.abs() > 1 {
        let base = right + d / 2;

        if field.level(base) >= level {
            emit_triangles(field, mesher, level, base, apex, right);
            emit_triangles(field, mesher, level, base, left, apex);
            return;
        }
    }

    let a = mesher.grid_vert(apex);
    let r = mesher.grid_vert(right);
    let l = mesher.grid_vert(left);

    mesher.emit_tri(a, r, l);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{heightfield::Heightfield, mesher};
    use byteorder::ReadBytesExt;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::io::{Cursor, Read};

    fn generate(field: Heightfield, config: GenerateConfig) -> (Vec<u8>, GenStats) {
        let mut field = ActivationField::new(field);
        let mut cursor = Cursor::new(Vec::new());

        let stats = ChunkFileGenerator::new(&mut field, config)
            .generate(&mut cursor)
            .unwrap();

        (cursor.into_inner(), stats)
    }

    struct Header {
        tree_depth: u16,
        chunk_count: u32,
        debug: u8,
    }

    fn read_header(cursor: &mut Cursor<Vec<u8>>) -> Header {
        let mut magic = [0; 4];
        cursor.read_exact(&mut magic).unwrap();
        assert_eq!(&magic, FILE_MAGIC);

        assert_eq!(cursor.read_u16::<LittleEndian>().unwrap(), FILE_VERSION);
        let tree_depth = cursor.read_u16::<LittleEndian>().unwrap();

        let _base_max_error = cursor.read_f32::<LittleEndian>().unwrap();
        let _vertical_scale = cursor.read_f32::<LittleEndian>().unwrap();
        let _leaf_size = cursor.read_f32::<LittleEndian>().unwrap();

        let chunk_count = cursor.read_u32::<LittleEndian>().unwrap();
        assert_eq!(chunk_count, quadtree::node_count(tree_depth as u32));
        assert_eq!(
            cursor.read_u32::<LittleEndian>().unwrap(),
            COLLISION_TREE_DEPTH
        );
        let debug = cursor.read_u8().unwrap();

        Header {
            tree_depth,
            chunk_count,
            debug,
        }
    }

    fn read_toc(cursor: &mut Cursor<Vec<u8>>, chunk_count: u32) -> Vec<(i16, i16, u32)> {
        (0..chunk_count)
            .map(|_| {
                (
                    cursor.read_i16::<LittleEndian>().unwrap(),
                    cursor.read_i16::<LittleEndian>().unwrap(),
                    cursor.read_u32::<LittleEndian>().unwrap(),
                )
            })
            .collect()
    }

    struct Block {
        verts: Vec<(i16, i16, i16, i16)>,
        triangles: u32,
        collision: bool,
    }

    fn read_block(cursor: &mut Cursor<Vec<u8>>, offset: u32) -> Block {
        cursor.set_position(offset as u64);
        assert_eq!(
            cursor.read_u32::<LittleEndian>().unwrap(),
            mesher::MESH_SENTINEL
        );

        let vert_count = cursor.read_u16::<LittleEndian>().unwrap();
        let verts = (0..vert_count)
            .map(|_| {
                (
                    cursor.read_i16::<LittleEndian>().unwrap(),
                    cursor.read_i16::<LittleEndian>().unwrap(),
                    cursor.read_i16::<LittleEndian>().unwrap(),
                    cursor.read_i16::<LittleEndian>().unwrap(),
                )
            })
            .collect();

        let index_count = cursor.read_i32::<LittleEndian>().unwrap();
        assert!(index_count > 0 && index_count % 3 == 0);
        for _ in 0..index_count {
            assert!(cursor.read_u16::<LittleEndian>().unwrap() < vert_count);
        }

        let triangles = cursor.read_u32::<LittleEndian>().unwrap();
        assert_eq!(triangles, index_count as u32 / 3);

        let collision = cursor.read_u8().unwrap() == 1;
        if collision {
            let node_count = quadtree::node_count(COLLISION_TREE_DEPTH);
            for _ in 0..node_count {
                let min = cursor.read_i16::<LittleEndian>().unwrap();
                let max = cursor.read_i16::<LittleEndian>().unwrap();
                assert!(min <= max);
            }

            assert_eq!(
                cursor.read_u32::<LittleEndian>().unwrap(),
                mesher::COLLISION_SENTINEL
            );

            let bin_count = 1 << (2 * (COLLISION_TREE_DEPTH - 1));
            let offsets: Vec<u16> = (0..bin_count)
                .map(|_| cursor.read_u16::<LittleEndian>().unwrap())
                .collect();

            let buffer_len = cursor.read_u32::<LittleEndian>().unwrap();
            let buffer: Vec<u16> = (0..buffer_len)
                .map(|_| cursor.read_u16::<LittleEndian>().unwrap())
                .collect();

            for offset in offsets {
                assert!((offset as u32) < buffer_len);
                assert!(buffer[offset as usize..].contains(&0xFFFF));
            }
        }

        assert_eq!(
            cursor.read_u32::<LittleEndian>().unwrap(),
            mesher::MESH_POSTSCRIPT
        );

        Block {
            verts,
            triangles,
            collision,
        }
    }

    fn config(tree_depth: u32) -> GenerateConfig {
        GenerateConfig {
            tree_depth,
            base_max_error: 1.0,
            do_checks: true,
            debug_data: false,
        }
    }

    #[test]
    fn flat_terrain_collapses_to_a_single_quad() {
        let (data, stats) = generate(
            Heightfield::from_fn(4, 2.0, 1.0, |_| 1000),
            GenerateConfig {
                base_max_error: 0.5,
                ..config(3)
            },
        );

        let mut cursor = Cursor::new(data);
        let header = read_header(&mut cursor);
        let toc = read_toc(&mut cursor, header.chunk_count);

        // Only the root chunk carries geometry.
        let populated: Vec<_> = toc.iter().filter(|entry| entry.2 != 0).collect();
        assert_eq!(populated.len(), 1);
        assert_eq!(toc[0], (1000, 1000, populated[0].2));

        let block = read_block(&mut cursor, toc[0].2);

        // Two triangles across the diagonal, no skirt geometry. The root is
        // the effective leaf here, so it carries the collision data.
        assert_eq!(block.verts.len(), 4);
        assert_eq!(block.triangles, 2);
        assert!(block.collision);

        for (_, _, z, morph) in block.verts {
            assert_eq!(z, 1000);
            assert_eq!(morph, 0);
        }

        assert_eq!(stats.output_chunks, 1);
        assert_eq!(stats.output_vertices, 4);
        assert_eq!(stats.output_real_triangles, 2);
    }

    #[test]
    fn bumpy_terrain_produces_a_consistent_file() {
        let mut rng = StdRng::seed_from_u64(3);
        let (data, stats) = generate(
            Heightfield::from_fn(4, 2.0, 1.0, |_| rng.random_range(-300..300)),
            config(3),
        );

        let mut cursor = Cursor::new(data);
        let header = read_header(&mut cursor);
        assert_eq!(header.tree_depth, 3);
        assert_eq!(header.debug, 0);

        let toc = read_toc(&mut cursor, header.chunk_count);
        assert_ne!(toc[0].2, 0, "the root chunk is always emitted");

        let populated = toc.iter().filter(|entry| entry.2 != 0).count();
        assert_eq!(stats.output_chunks, populated as u32);

        for &(min, max, offset) in toc.iter().filter(|entry| entry.2 != 0) {
            let block = read_block(&mut cursor, offset);

            // The TOC height range is the exact range of the block's verts.
            assert_eq!(block.verts.iter().map(|v| v.2).min(), Some(min));
            assert_eq!(block.verts.iter().map(|v| v.2).max(), Some(max));
        }

        // Collision sits on the effective leaves: populated chunks with no
        // populated children.
        for (rank, entry) in toc.iter().enumerate().filter(|(_, entry)| entry.2 != 0) {
            let depth = (0..header.tree_depth as u32)
                .find(|&depth| (rank as u32) < quadtree::node_count(depth + 1))
                .unwrap();
            let local = rank as u32 - quadtree::node_count(depth);
            let (x, y) = (local & ((1 << depth) - 1), local >> depth);

            let children_populated = depth + 1 < header.tree_depth as u32
                && iproduct!(0..2, 0..2).any(|(sub_x, sub_y)| {
                    let child =
                        quadtree::node_index(depth + 1, x * 2 + sub_x, y * 2 + sub_y) as usize;
                    toc[child].2 != 0
                });

            let block = read_block(&mut cursor, entry.2);
            assert_eq!(block.collision, !children_populated);
        }
    }

    #[test]
    fn grid_vertex_morphs_reach_the_coarser_mesh() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut field = ActivationField::new(Heightfield::from_fn(3, 1.0, 1.0, |_| {
            rng.random_range(-300..300)
        }));
        let mut stats = GenStats::default();

        field.compute_levels(1.0, &mut stats);
        for target in 0..3 {
            field.propagate(target, &mut stats);
        }

        let level = 1;
        let size = field.height().size();
        for corner in [
            IVec2::ZERO,
            IVec2::new(size, 0),
            IVec2::new(0, size),
            IVec2::splat(size),
        ] {
            field.activate(corner, level, &mut stats);
        }

        let mut mesher = ChunkMesher::new(&field);
        generate_block(&field, &mut mesher, level, 3, IVec2::splat(size / 2));

        let mut cursor = Cursor::new(Vec::new());
        mesher
            .write(&mut cursor, level, false, false, &mut stats)
            .unwrap();

        let block = read_block(&mut cursor, 0);

        // The chunk spans 8 world units per axis, so positions quantize at
        // exactly 4096 steps per unit and are recoverable.
        let mut morphing = 0;

        for (x, y, z, morph) in block.verts {
            let pos = IVec2::new(
                (f32::from(x) / 4096.0 + 4.0).round() as i32,
                (f32::from(y) / 4096.0 + 4.0).round() as i32,
            );

            assert_eq!(z, field.sample(pos));
            assert_eq!(
                i32::from(z) + i32::from(morph),
                i32::from(field.height_at_lod(pos, level + 1))
            );

            if morph != 0 {
                morphing += 1;
            }
        }

        assert!(morphing > 0, "expected some vertex to morph on rough terrain");
    }

    #[test]
    fn generation_is_deterministic() {
        let field = || {
            let mut rng = StdRng::seed_from_u64(42);
            Heightfield::from_fn(4, 2.0, 1.0, |_| rng.random_range(-300..300))
        };

        let (first, _) = generate(field(), config(3));
        let (second, _) = generate(field(), config(3));

        assert_eq!(first, second);
    }

    #[test]
    fn debug_sentinel_precedes_each_block() {
        let (data, _) = generate(
            Heightfield::from_fn(4, 2.0, 1.0, |_| 1000),
            GenerateConfig {
                debug_data: true,
                ..config(3)
            },
        );

        let mut cursor = Cursor::new(data);
        let header = read_header(&mut cursor);
        assert_eq!(header.debug, 1);

        let toc = read_toc(&mut cursor, header.chunk_count);

        cursor.set_position(toc[0].2 as u64 - 4);
        assert_eq!(
            cursor.read_u32::<LittleEndian>().unwrap(),
            mesher::DEBUG_SENTINEL
        );
        read_block(&mut cursor, toc[0].2);
    }

    #[test]
    fn rejects_a_tree_deeper_than_the_field() {
        let mut field = ActivationField::new(Heightfield::new(3, 1.0, 1.0));
        let mut cursor = Cursor::new(Vec::new());

        let result = ChunkFileGenerator::new(&mut field, config(4)).generate(&mut cursor);

        assert!(matches!(
            result,
            Err(ChunkGenError::InvalidTreeDepth { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "65535")]
    fn an_oversized_chunk_is_fatal() {
        let mut rng = StdRng::seed_from_u64(9);
        let field = Heightfield::from_fn(8, 1.0, 1.0, |_| rng.random_range(-20000..20000));
        let mut field = ActivationField::new(field);
        let mut cursor = Cursor::new(Vec::new());

        // A single chunk over the whole field cannot fit 16 bit indices.
        let _ = ChunkFileGenerator::new(
            &mut field,
            GenerateConfig {
                tree_depth: 1,
                base_max_error: 0.0,
                do_checks: false,
                debug_data: false,
            },
        )
        .generate(&mut cursor);
    }
}
