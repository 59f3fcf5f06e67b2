use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};
use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

use nrc_codec::{Codec, CodecParams};
use nrc_hal::{DatagramLink, WallClock};
use nrc_net::{SystemClock, UdpLink};
use nrc_session::{FilePayload, SendSession};

/// Send a file to a peer over lossy UDP.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// File to transmit.
    file: PathBuf,
    /// Receiver address, e.g. 192.168.1.20:12345.
    #[arg(long)]
    peer: String,
    #[arg(long, default_value = "0.0.0.0:0")]
    bind: String,

    /// Coefficient CSV.
    #[arg(long)]
    codec: PathBuf,
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
    #[arg(long)]
    debug: bool,
    #[arg(long)]
    stats: bool,
}

/// Push one datagram out, riding through transient backpressure.
fn transmit(link: &mut UdpLink, frame: &[u8]) {
    for _ in 0..50 {
        match link.send(frame) {
            Ok(_) => return,
            Err(nb::Error::WouldBlock) => std::thread::sleep(Duration::from_millis(1)),
            Err(nb::Error::Other(e)) => {
                warn!("send failed: {e}");
                return;
            }
        }
    }
    warn!("datagram dropped after sustained backpressure");
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let data = fs::read(&cli.file)
        .with_context(|| format!("cannot read {}", cli.file.display()))?;
    let filename = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".into());

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
    codec.load_coefficients_path(&cli.codec)?;
    info!(
        "codec ready: M={} Q={} fun={}",
        cli.bits_m, cli.bits_q, cli.fun_type
    );

    let mut link = UdpLink::new(&cli.bind, Some(&cli.peer))?;
    let clock = SystemClock::new();
    let mut session = SendSession::new(codec, FilePayload::new(&filename, data));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        warn!("signal received, stopping");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut buf = vec![0u8; 65535];
    while running.load(Ordering::SeqCst) && !session.is_complete() {
        let now = clock.now_ms();
        let mut idle = true;

        if let Some(frame) = session.poll(now)? {
            transmit(&mut link, &frame);
            idle = false;
        }

        match link.recv(&mut buf) {
            Ok(n) => {
                if let Some(reply) = session.handle_datagram(&buf[..n], now)? {
                    transmit(&mut link, &reply);
                }
                idle = false;
            }
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => return Err(e.into()),
        }

        if idle {
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    if !session.is_complete() {
        bail!("transfer aborted");
    }

    if cli.stats {
        let stats = session.codec().stats();
        info!(
            "encoder stats: {} symbols, {} collision states, {} direct-info, {} skipped",
            stats.symbols_encoded, stats.collisions, stats.direct_info, stats.skipped_enc
        );
    }
    info!("file delivered");
    Ok(())
}
