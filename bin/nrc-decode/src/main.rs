use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

use nrc_codec::{Codec, CodecParams, Dialect};
use nrc_container::scan;
use nrc_session::decode_frame_stream;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Stream of length-prefixed codec frames.
    Codec,
    /// Marker/CRC fragment container, no codec.
    Plain,
    /// Codec frame stream wrapped in the fragment container.
    Hybrid,
}

/// Decode a container back into the original file.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Container to read. May carry arbitrary noise around the fragments
    /// in plain and hybrid modes.
    input: PathBuf,
    /// Output file.
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
    /// The container was written with the paired dialect.
    #[arg(long)]
    paired: bool,
    #[arg(long)]
    debug: bool,
    #[arg(long)]
    stats: bool,
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

/// Recover the inner byte stream from a noisy fragment container.
fn scan_fragments(raw: &[u8]) -> anyhow::Result<(Vec<u8>, bool)> {
    let report = scan(raw)?;
    if report.found == 0 {
        bail!("no valid fragments in container");
    }
    if !report.is_complete() {
        warn!(
            "partial recovery: {}/{} chunks, missing {:?}",
            report.found, report.total, report.missing
        );
    }
    let complete = report.is_complete();
    Ok((report.data, complete))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let raw = fs::read(&cli.input)
        .with_context(|| format!("cannot read {}", cli.input.display()))?;
    let dialect = if cli.paired {
        Dialect::Paired
    } else {
        Dialect::Simple
    };

    let (data, complete) = match cli.mode {
        Mode::Plain => scan_fragments(&raw)?,
        Mode::Codec => {
            let mut codec = build_codec(&cli)?;
            let (header, data) = decode_frame_stream(&mut codec, &raw, dialect)?;
            info!("recovered {:?} intact", header.filename);
            print_stats(&cli, &codec);
            (data, true)
        }
        Mode::Hybrid => {
            let mut codec = build_codec(&cli)?;
            let (stream, _) = scan_fragments(&raw)?;
            let (header, data) = decode_frame_stream(&mut codec, &stream, dialect)?;
            info!("recovered {:?} intact", header.filename);
            print_stats(&cli, &codec);
            (data, true)
        }
    };

    fs::write(&cli.output, &data)
        .with_context(|| format!("cannot write {}", cli.output.display()))?;
    info!("file written: {} ({} bytes)", cli.output.display(), data.len());

    if !complete {
        bail!("container was only partially recovered; output has gaps");
    }
    Ok(())
}

fn print_stats(cli: &Cli, codec: &Codec<ChaCha20Rng>) {
    if !cli.stats {
        return;
    }
    let stats = codec.stats();
    if stats.errors_corrected_h + stats.errors_corrected_v > 0 {
        info!(
            "error correction: {} bits repaired in h words, {} in v words",
            stats.errors_corrected_h, stats.errors_corrected_v
        );
    } else {
        info!("no transmission errors detected");
    }
    info!(
        "decoder stats: {} symbols, {} skipped",
        stats.symbols_decoded, stats.skipped_dec
    );
}
