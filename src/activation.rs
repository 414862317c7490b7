//! Per-sample activation levels driving the binary-triangle-tree decimation.
//!
//! The activation level of a sample is the coarsest LOD at which the sample
//! must be present as a mesh vertex. Levels are assigned by an error-driven
//! pass over the BTT ([`ActivationField::compute_levels`]) and then made
//! globally consistent by propagating them through the quadtree update
//! dependency graph ([`ActivationField::propagate`]), per Ulrich's chunked
//! LOD scheme.

use crate::{error::ChunkGenResult, heightfield::Heightfield, stats::GenStats};
use byteorder::{LittleEndian, WriteBytesExt};
use glam::IVec2;
use log::error;
use ndarray::Array2;
use std::io::Write;

pub struct ActivationField {
    height: Heightfield,
    levels: Array2<i8>,
    next_target: i8,
}

impl ActivationField {
    pub fn new(height: Heightfield) -> Self {
        let real_size = (height.size() + 1) as usize;

        Self {
            height,
            levels: Array2::from_elem((real_size, real_size), -1),
            next_target: 0,
        }
    }

    #[inline]
    pub fn height(&self) -> &Heightfield {
        &self.height
    }

    #[inline]
    pub fn sample(&self, pos: IVec2) -> i16 {
        self.height.sample(pos)
    }

    #[inline]
    pub fn level(&self, pos: IVec2) -> i8 {
        self.levels[(pos.y as usize, pos.x as usize)]
    }

    #[inline]
    pub fn set_level(&mut self, pos: IVec2, level: i8) {
        self.levels[(pos.y as usize, pos.x as usize)] = level;
    }

    /// Raises the stored level of `pos` to at least `level`.
    pub fn activate(&mut self, pos: IVec2, level: i8, stats: &mut GenStats) {
        let current = self.level(pos);

        if level > current {
            if current == -1 {
                stats.output_vertices += 1;
            }

            self.set_level(pos, level);
        }
    }

    /// Runs the view-independent BTT error pass over both halves of the field,
    /// assigning every sample the level required by its interpolation error.
    ///
    /// The result is only locally consistent; [`Self::propagate`] must run
    /// afterwards for every target level.
    pub fn compute_levels(&mut self, base_max_error: f32, stats: &mut GenStats) {
        let size = self.height.size();

        // A new error pass starts a new propagation sequence.
        self.next_target = 0;

        // Southwest half of the square.
        self.update_triangle(
            base_max_error,
            IVec2::new(0, size),
            IVec2::new(size, size),
            IVec2::new(0, 0),
            stats,
        );
        // Northeast half.
        self.update_triangle(
            base_max_error,
            IVec2::new(size, 0),
            IVec2::new(0, 0),
            IVec2::new(size, size),
            stats,
        );
    }

    /// Computes the interpolation error of the triangle's base vertex against
    /// the straight hypotenuse and recurses into the two child triangles.
    fn update_triangle(
        &mut self,
        base_max_error: f32,
        apex: IVec2,
        right: IVec2,
        left: IVec2,
        stats: &mut GenStats,
    ) {
        let d = left - right;

        if d.x.abs() <= 1 && d.y.abs() <= 1 {
            // Base level, no base vertex to update.
            return;
        }

        // The base vertex sits midway between the left and right vertices.
        let base = right + d / 2;

        let midpoint =
            (self.sample(left) as i32 + self.sample(right) as i32) / 2;
        let error = ((self.sample(base) as i32 - midpoint) as f32
            * self.height.vertical_scale())
        .abs();

        if error > 0.0 && error >= base_max_error {
            // The coarsest mesh level that must include this vertex. A zero
            // error budget keeps every non-planar vertex at every level.
            let level = if base_max_error > 0.0 {
                ((error / base_max_error + 0.5).floor() as i32).clamp(0, 127) as i8
            } else {
                127
            };

            self.activate(base, level, stats);
        }

        self.update_triangle(base_max_error, base, apex, right, stats);
        self.update_triangle(base_max_error, base, left, apex, stats);
    }

    /// Propagates activation levels through the quadtree update dependency
    /// graph for one target level: child-square centers promote the parent's
    /// edge midpoints, and edge midpoints promote the square's center.
    ///
    /// Must be called once per target level, in increasing order starting at
    /// zero; the internal counter asserts this rather than leaving it to
    /// caller discipline.
    pub fn propagate(&mut self, target_level: i8, stats: &mut GenStats) {
        assert_eq!(
            target_level, self.next_target,
            "activation levels must be propagated with strictly increasing target levels"
        );
        self.next_target += 1;

        let center = IVec2::splat(self.height.size() >> 1);
        let level = self.height.size_log2() as i8 - 1;

        // Two sweeps. Within one sweep a square's center can settle before a
        // neighboring square promotes their shared edge midpoint; after the
        // first sweep every edge midpoint is final, the second finalizes the
        // centers.
        self.propagate_square(center, level, target_level, stats);
        self.propagate_square(center, level, target_level, stats);
    }

    fn propagate_square(&mut self, c: IVec2, level: i8, target_level: i8, stats: &mut GenStats) {
        let half = 1 << level;
        let quarter = half >> 1;

        if level > target_level {
            for j in 0..2 {
                for i in 0..2 {
                    self.propagate_square(
                        c + IVec2::new(-quarter + half * i, -quarter + half * j),
                        level - 1,
                        target_level,
                        stats,
                    );
                }
            }

            return;
        }

        if level > 0 {
            // Child-square centers promote the adjacent edge midpoints.
            let ne = self.level(c + IVec2::new(quarter, -quarter));
            self.activate(c + IVec2::new(half, 0), ne, stats);
            self.activate(c + IVec2::new(0, -half), ne, stats);

            let nw = self.level(c + IVec2::new(-quarter, -quarter));
            self.activate(c + IVec2::new(0, -half), nw, stats);
            self.activate(c + IVec2::new(-half, 0), nw, stats);

            let sw = self.level(c + IVec2::new(-quarter, quarter));
            self.activate(c + IVec2::new(-half, 0), sw, stats);
            self.activate(c + IVec2::new(0, half), sw, stats);

            let se = self.level(c + IVec2::new(quarter, quarter));
            self.activate(c + IVec2::new(0, half), se, stats);
            self.activate(c + IVec2::new(half, 0), se, stats);
        }

        // Edge midpoints promote the center.
        let east = self.level(c + IVec2::new(half, 0));
        let north = self.level(c + IVec2::new(0, -half));
        let south = self.level(c + IVec2::new(0, half));
        let west = self.level(c + IVec2::new(-half, 0));

        self.activate(c, east, stats);
        self.activate(c, north, stats);
        self.activate(c, south, stats);
        self.activate(c, west, stats);
    }

    /// Walks the whole tree verifying the dependency invariant, returning the
    /// number of violations found. Each violation is logged.
    pub fn check_propagation(&self) -> u32 {
        let mut violations = 0;
        let center = IVec2::splat(self.height.size() >> 1);

        self.check_square(
            center,
            self.height.size_log2() as i8 - 1,
            &mut violations,
        );

        violations
    }

    fn check_square(&self, c: IVec2, level: i8, violations: &mut u32) -> i8 {
        let half = 1 << level;
        let quarter = half >> 1;

        let (ne, nw, sw, se) = if level > 0 {
            (
                self.check_square(c + IVec2::new(quarter, -quarter), level - 1, violations),
                self.check_square(c + IVec2::new(-quarter, -quarter), level - 1, violations),
                self.check_square(c + IVec2::new(-quarter, quarter), level - 1, violations),
                self.check_square(c + IVec2::new(quarter, quarter), level - 1, violations),
            )
        } else {
            (-1, -1, -1, -1)
        };

        let east = self.level(c + IVec2::new(half, 0));
        let north = self.level(c + IVec2::new(0, -half));
        let west = self.level(c + IVec2::new(-half, 0));
        let south = self.level(c + IVec2::new(0, half));

        if level > 0 {
            for (children, edge, name) in [
                ([ne, se], east, "east"),
                ([ne, nw], north, "north"),
                ([nw, sw], west, "west"),
                ([sw, se], south, "south"),
            ] {
                if children.iter().any(|&child| child > edge) {
                    error!(
                        "propagation violation at {name} edge of square {c} (level {level})"
                    );
                    *violations += 1;
                }
            }
        }

        let center = self.level(c);
        let max_edge = east.max(north).max(west).max(south);

        if max_edge > center {
            error!("propagation violation at center of square {c} (level {level})");
            *violations += 1;
        }

        max_edge.max(center)
    }

    /// The height of the mesh simplified to `level` at `pos`, in discrete
    /// units.
    ///
    /// Exact sample if the position is active at or below `level`, otherwise
    /// interpolated on the enclosing coarser triangle.
    pub fn height_at_lod(&self, pos: IVec2, level: i8) -> i16 {
        let size = self.height.size();

        if pos.y > pos.x {
            // Southwest half.
            self.height_query(
                level,
                pos,
                IVec2::new(0, size),
                IVec2::new(size, size),
                IVec2::new(0, 0),
            )
        } else {
            // Northeast half.
            self.height_query(
                level,
                pos,
                IVec2::new(size, 0),
                IVec2::new(0, 0),
                IVec2::new(size, size),
            )
        }
    }

    fn height_query(&self, level: i8, pos: IVec2, apex: IVec2, right: IVec2, left: IVec2) -> i16 {
        if pos == apex || pos == right || pos == left {
            return self.sample(pos);
        }

        let d = left - right;

        assert!(
            d.x.abs() > 1 || d.y.abs() > 1,
            "height query descended past the finest triangle"
        );

        let base = (right + left) / 2;

        // Barycentric coordinates with respect to the right and left edges.
        let edge_length_squared = d.length_squared() as f64 / 2.0;

        let s_x = (pos - apex).dot(right - apex) as f64 / edge_length_squared;
        let s_y = (pos - apex).dot(left - apex) as f64 / edge_length_squared;

        debug_assert!((0.0..=1.0).contains(&s_x));
        debug_assert!((0.0..=1.0).contains(&s_y));

        if self.level(base) >= level {
            // The mesh is more tessellated at the desired LOD.
            return if s_x >= s_y {
                self.height_query(level, pos, base, apex, right)
            } else {
                self.height_query(level, pos, base, left, apex)
            };
        }

        // This triangle is as far as the desired LOD goes.
        let apex_height = self.sample(apex) as f64;
        let d_right = self.sample(right) as f64 - apex_height;
        let d_left = self.sample(left) as f64 - apex_height;

        (apex_height + s_x * d_right + s_y * d_left + 0.5).floor() as i16
    }

    /// Dumps the raw activation levels, row by row.
    pub fn dump_levels<W: Write>(&self, writer: &mut W) -> ChunkGenResult<()> {
        for y in 0..self.height.size() {
            for x in 0..self.height.size() {
                writer.write_i8(self.level(IVec2::new(x, y)))?;
            }
        }

        Ok(())
    }

    /// Dumps the heights of the mesh simplified to `level`, row by row.
    pub fn dump_height_at_lod<W: Write>(&self, writer: &mut W, level: i8) -> ChunkGenResult<()> {
        for y in 0..self.height.size() {
            for x in 0..self.height.size() {
                writer.write_i16::<LittleEndian>(self.height_at_lod(IVec2::new(x, y), level))?;
            }
        }

        Ok(())
    }
}
