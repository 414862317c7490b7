use log::info;

pub const MAX_TREE_LEVELS: usize = 32;

/// Accumulates counters over one generation run.
///
/// Owned by the generator and returned from `generate`, so concurrent runs
/// never share state.
#[derive(Clone, Default)]
pub struct GenStats {
    pub input_vertices: u32,
    pub output_vertices: u32,
    pub output_real_triangles: u32,
    pub output_degenerate_triangles: u32,
    pub output_chunks: u32,
    pub output_bytes: u64,

    chunk_count: [u32; MAX_TREE_LEVELS],
    chunk_triangles: [u64; MAX_TREE_LEVELS],
}

impl GenStats {
    pub fn note_chunk(&mut self, level: i8, triangles: u32) {
        let level = level as usize;

        self.chunk_count[level] += 1;
        self.chunk_triangles[level] += triangles as u64;
    }

    pub fn chunk_count(&self, level: i8) -> u32 {
        self.chunk_count[level as usize]
    }

    pub fn report(&self, tree_depth: u32) {
        info!("=== chunk statistics ===");
        info!("level    count    avg. triangles");

        for level in 0..MAX_TREE_LEVELS {
            if self.chunk_count[level] > 0 {
                info!(
                    "{:5} {:8} {:17.1}",
                    level,
                    self.chunk_count[level],
                    self.chunk_triangles[level] as f64 / self.chunk_count[level] as f64
                );
            }
        }

        let verts_per_chunk = self.output_vertices as f64 / self.output_chunks.max(1) as f64;

        info!("========================================");
        info!("          chunks: {:10}", self.output_chunks);
        info!("     input verts: {:10}", self.input_vertices);
        info!("    output verts: {:10}", self.output_vertices);
        info!(" avg verts/chunk: {verts_per_chunk:10.0}");

        if verts_per_chunk < 1000.0 {
            info!(
                "note: verts/chunk is low; for higher poly throughput consider \
                 a tree depth of {} and reprocessing",
                tree_depth.saturating_sub(1)
            );
        } else if verts_per_chunk > 5000.0 {
            info!(
                "note: verts/chunk is high; for smoother framerate consider \
                 a tree depth of {} and reprocessing",
                tree_depth + 1
            );
        }

        info!("    output bytes: {:10}", self.output_bytes);
        info!(
            "bytes/input vert: {:10.2}",
            self.output_bytes as f64 / self.input_vertices.max(1) as f64
        );
        info!(
            "  real triangles: {:10}",
            self.output_real_triangles
        );
        info!(
            "  dropped degens: {:10}",
            self.output_degenerate_triangles
        );
    }
}
