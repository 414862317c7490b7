use anyhow::{Context, Result};
use chunklod::{ActivationField, ChunkFileGenerator, GenerateConfig, Heightfield};
use clap::Parser;
use env_logger::Env;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug)]
#[command(name = "chunklod", author, version, about)]
struct Cli {
    /// Input heightfield: a raw little-endian u16 file (.raw) or a 16 bit
    /// grayscale image, (2^N)+1 samples per axis.
    input: PathBuf,
    /// Output chunk file.
    output: PathBuf,

    /// Levels in the chunk quadtree.
    #[arg(short, long, default_value_t = 5)]
    tree_depth: u32,
    /// World-space error below which detail is dropped from the finest mesh.
    #[arg(short, long = "error", default_value_t = 0.5)]
    base_max_error: f32,
    /// World units between adjacent samples.
    #[arg(short, long, default_value_t = 2.0)]
    sample_spacing: f32,
    /// World units per discrete height unit.
    #[arg(short, long, default_value_t = 1.0 / 512.0)]
    vertical_scale: f32,

    /// Verify internal invariants while generating.
    #[arg(long, default_value_t = false)]
    checks: bool,
    /// Emit debug sentinels into the output file.
    #[arg(long, default_value_t = false)]
    debug_data: bool,
    /// Dump the raw activation levels to this file after generating.
    #[arg(long)]
    dump_activation: Option<PathBuf>,
}

fn load_heightfield(cli: &Cli) -> Result<Heightfield> {
    let raw = cli.input.extension().is_some_and(|ext| ext == "raw");

    let heightfield = if raw {
        Heightfield::load_raw16(&cli.input, cli.sample_spacing, cli.vertical_scale)
    } else {
        Heightfield::load_image(&cli.input, cli.sample_spacing, cli.vertical_scale)
    };

    heightfield.with_context(|| format!("failed to load heightfield {}", cli.input.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut field = ActivationField::new(load_heightfield(&cli)?);

    let config = GenerateConfig {
        tree_depth: cli.tree_depth,
        base_max_error: cli.base_max_error,
        do_checks: cli.checks,
        debug_data: cli.debug_data,
    };

    let file = File::create(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    let mut writer = BufWriter::new(file);

    ChunkFileGenerator::new(&mut field, config)
        .generate(&mut writer)
        .context("chunk generation failed")?;

    if let Some(path) = &cli.dump_activation {
        dump_activation(&field, path)?;
    }

    Ok(())
}

fn dump_activation(field: &ActivationField, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
    );

    field.dump_levels(&mut writer)?;

    Ok(())
}
