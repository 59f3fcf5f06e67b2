use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::info;
use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

use nrc_codec::{Codec, CodecParams, Dialect};
use nrc_container::write_container;
use nrc_session::encode_frame_stream;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Stream of length-prefixed codec frames.
    Codec,
    /// Marker/CRC fragment container, no codec.
    Plain,
    /// Codec frame stream wrapped in the fragment container.
    Hybrid,
}

/// Encode a file into a noise-resilient container.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Source file.
    input: PathBuf,
    /// Output container.
    output: PathBuf,

    #[arg(long, value_enum, default_value = "codec")]
    mode: Mode,

    /// Coefficient CSV (required unless --mode plain).
    #[arg(long)]
    codec: Option<PathBuf>,
    /// Ring word width M.
    #[arg(long = "M", default_value_t = 8)]
    bits_m: u32,
    /// Information bits per symbol Q.
    #[arg(long = "Q", default_value_t = 2)]
    bits_q: u32,
    /// Coding function family 1..5.
    #[arg(long = "fun", default_value_t = 1)]
    fun_type: u8,
    /// Initial state h1.
    #[arg(long, default_value_t = 7, allow_hyphen_values = true)]
    h1: i32,
    /// Initial state h2.
    #[arg(long, default_value_t = 23, allow_hyphen_values = true)]
    h2: i32,
    /// Use the error-correcting paired dialect.
    #[arg(long)]
    paired: bool,
    #[arg(long)]
    debug: bool,
    #[arg(long)]
    stats: bool,

    /// Dump the codec frame stream before fragmentation (hybrid mode).
    #[arg(long)]
    intermediate: Option<PathBuf>,
}

fn build_codec(cli: &Cli) -> anyhow::Result<Codec<ChaCha20Rng>> {
    let Some(csv_path) = &cli.codec else {
        bail!("--codec <csv> is required for this mode");
    };
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    let mut codec = Codec::new(ChaCha20Rng::from_seed(seed));
    codec.configure(CodecParams {
        bits_m: cli.bits_m,
        bits_q: cli.bits_q,
        fun_type: cli.fun_type,
        h1: cli.h1,
        h2: cli.h2,
        info_instead_of_rand: true,
        debug_mode: cli.debug,
        stats_mode: cli.stats,
    })?;
    codec.load_coefficients_path(csv_path)?;
    info!(
        "codec ready: M={} Q={} fun={}",
        cli.bits_m, cli.bits_q, cli.fun_type
    );
    Ok(codec)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let data = fs::read(&cli.input)
        .with_context(|| format!("cannot read {}", cli.input.display()))?;
    let filename = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".into());
    let dialect = if cli.paired {
        Dialect::Paired
    } else {
        Dialect::Simple
    };

    let container = match cli.mode {
        Mode::Plain => write_container(&data)?,
        Mode::Codec => {
            let mut codec = build_codec(&cli)?;
            let stream = encode_frame_stream(&mut codec, &filename, data, dialect)?;
            print_stats(&cli, &codec);
            stream
        }
        Mode::Hybrid => {
            let mut codec = build_codec(&cli)?;
            let stream = encode_frame_stream(&mut codec, &filename, data, dialect)?;
            if let Some(path) = &cli.intermediate {
                fs::write(path, &stream)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                info!("intermediate stream saved to {}", path.display());
            }
            print_stats(&cli, &codec);
            write_container(&stream)?
        }
    };

    fs::write(&cli.output, &container)
        .with_context(|| format!("cannot write {}", cli.output.display()))?;
    info!(
        "container written: {} ({} bytes)",
        cli.output.display(),
        container.len()
    );
    Ok(())
}

fn print_stats(cli: &Cli, codec: &Codec<ChaCha20Rng>) {
    if !cli.stats {
        return;
    }
    let stats = codec.stats();
    info!(
        "encoder stats: {} symbols, {} collision states, {} direct-info, {} skipped",
        stats.symbols_encoded, stats.collisions, stats.direct_info, stats.skipped_enc
    );
}
