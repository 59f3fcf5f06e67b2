#![no_std]
#![forbid(unsafe_code)]
#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;

use log::{debug, warn};
use rand_core::RngCore;

use nrc_core::{Error, Result};
use nrc_ring::Ring;

pub mod coeff;
pub mod funs;
mod message;
mod paired;

pub use coeff::CoeffTable;
pub use message::HASH_LEN;

/// Immutable codec configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    /// Word width M of the arithmetic ring, 1..=31.
    pub bits_m: u32,
    /// Information bits per symbol Q, 1..=16; implies 2^Q coding functions.
    pub bits_q: u32,
    /// Polynomial family, 1..=5.
    pub fun_type: u8,
    /// Initial rolling states.
    pub h1: i32,
    pub h2: i32,
    /// Collision fallback: prefer transmitting the symbol value itself over
    /// an unrecoverable random filler.
    pub info_instead_of_rand: bool,
    pub debug_mode: bool,
    pub stats_mode: bool,
}

impl Default for CodecParams {
    fn default() -> Self {
        Self {
            bits_m: 8,
            bits_q: 2,
            fun_type: 1,
            h1: 7,
            h2: 23,
            info_instead_of_rand: true,
            debug_mode: false,
            stats_mode: false,
        }
    }
}

/// Symbol-to-wire encoding scheme.
///
/// `Simple` emits one ring word per symbol. `Paired` emits an (h, v) word
/// pair per symbol and can locate and flip one wrong bit per pair on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Simple,
    Paired,
}

/// Counters exposed for diagnostics; none affect behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecStats {
    pub symbols_encoded: u64,
    pub symbols_decoded: u64,
    /// Encoder states where the candidate set had fewer than 2^Q distinct
    /// values and the selection fell through to the fallback branch.
    pub collisions: u64,
    /// Symbols transmitted through the direct-info channel.
    pub direct_info: u64,
    /// Symbols replaced by random filler on encode / dropped on decode.
    pub skipped_enc: u64,
    pub skipped_dec: u64,
    /// Single-bit corrections performed by the paired dialect.
    pub errors_corrected_h: u64,
    pub errors_corrected_v: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct RollingState {
    enc_h1: i32,
    enc_h2: i32,
    dec_h1: i32,
    dec_h2: i32,
}

/// The recursive digital codec.
///
/// Both directions of one link live here: the encoder's rolling state pair
/// and the decoder's mirror of it. With identical parameters, coefficients
/// and initial state on both ends of a lossless channel the two mirrors
/// advance in lockstep, including over skipped symbols.
pub struct Codec<R: RngCore> {
    params: CodecParams,
    ring: Ring,
    coeff: Option<CoeffTable>,
    state: RollingState,
    stats: CodecStats,
    rng: R,
    configured: bool,
}

impl<R: RngCore> Codec<R> {
    /// An unconfigured codec; `configure` must run before anything else.
    pub fn new(rng: R) -> Self {
        Self {
            params: CodecParams::default(),
            ring: Ring::new(8),
            coeff: None,
            state: RollingState::default(),
            stats: CodecStats::default(),
            rng,
            configured: false,
        }
    }

    /// Validate and adopt parameters, drop any loaded coefficients, reset.
    pub fn configure(&mut self, params: CodecParams) -> Result<()> {
        if !(1..=31).contains(&params.bits_m) {
            return Err(Error::InvalidParameter(format!(
                "bits_m must be in 1..=31, got {}",
                params.bits_m
            )));
        }
        if !(1..=16).contains(&params.bits_q) {
            return Err(Error::InvalidParameter(format!(
                "bits_q must be in 1..=16, got {}",
                params.bits_q
            )));
        }
        if !(1..=5).contains(&params.fun_type) {
            return Err(Error::InvalidParameter(format!(
                "fun_type must be in 1..=5, got {}",
                params.fun_type
            )));
        }
        self.params = params;
        self.ring = Ring::new(params.bits_m);
        self.coeff = None;
        self.configured = true;
        self.reset();
        debug!(
            "codec configured: M={} Q={} fun={} h=({}, {})",
            params.bits_m, params.bits_q, params.fun_type, params.h1, params.h2
        );
        Ok(())
    }

    /// Adopt a coefficient table. Row count must be 2^Q and column count
    /// must match the configured function family.
    pub fn load_coefficients(&mut self, table: CoeffTable) -> Result<()> {
        if !self.configured {
            return Err(Error::OrderingError("configure before loading coefficients"));
        }
        let expected_rows = self.fun_count();
        if table.len() != expected_rows {
            return Err(Error::InvalidCoefficients(format!(
                "expected {expected_rows} rows for Q={}, got {}",
                self.params.bits_q,
                table.len()
            )));
        }
        let expected_cols = CoeffTable::cols_for(self.params.fun_type);
        if table.cols() != expected_cols {
            return Err(Error::InvalidCoefficients(format!(
                "fun_type {} needs {expected_cols} columns, table has {}",
                self.params.fun_type,
                table.cols()
            )));
        }
        self.coeff = Some(table);
        Ok(())
    }

    /// Parse and adopt a coefficient table from CSV text.
    pub fn load_coefficients_csv(&mut self, text: &str) -> Result<()> {
        if !self.configured {
            return Err(Error::OrderingError("configure before loading coefficients"));
        }
        let table = CoeffTable::parse(text, self.params.fun_type, self.params.bits_q)?;
        self.load_coefficients(table)
    }

    #[cfg(feature = "std")]
    pub fn load_coefficients_path(&mut self, path: &std::path::Path) -> Result<()> {
        if !self.configured {
            return Err(Error::OrderingError("configure before loading coefficients"));
        }
        let table = CoeffTable::load(path, self.params.fun_type, self.params.bits_q)?;
        self.load_coefficients(table)
    }

    /// Rewind both mirrors to the configured initial state, clear counters.
    pub fn reset(&mut self) {
        let h1 = self.ring.wrap(self.params.h1 as i64);
        let h2 = self.ring.wrap(self.params.h2 as i64);
        self.state = RollingState {
            enc_h1: h1,
            enc_h2: h2,
            dec_h1: h1,
            dec_h2: h2,
        };
        self.stats = CodecStats::default();
    }

    /// Force both mirrors to a given state. Counters survive; this is the
    /// recovery path after a desync, not a restart.
    pub fn sync_states(&mut self, h1: i32, h2: i32) {
        let h1 = self.ring.wrap(h1 as i64);
        let h2 = self.ring.wrap(h2 as i64);
        self.state.enc_h1 = h1;
        self.state.enc_h2 = h2;
        self.state.dec_h1 = h1;
        self.state.dec_h2 = h2;
    }

    pub fn enc_state(&self) -> (i32, i32) {
        (self.state.enc_h1, self.state.enc_h2)
    }

    pub fn dec_state(&self) -> (i32, i32) {
        (self.state.dec_h1, self.state.dec_h2)
    }

    pub fn params(&self) -> &CodecParams {
        &self.params
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn stats(&self) -> &CodecStats {
        &self.stats
    }

    pub fn fun_count(&self) -> usize {
        1usize << self.params.bits_q
    }

    /// Candidate values of all 2^Q coding functions at state (x, y).
    fn all_code_fun(&self, x: i32, y: i32) -> Result<Vec<i32>> {
        let coeff = self
            .coeff
            .as_ref()
            .ok_or(Error::OrderingError("coefficients not loaded"))?;
        let mut rr = Vec::with_capacity(coeff.len());
        for k in 0..coeff.len() {
            rr.push(funs::eval(&self.ring, self.params.fun_type, coeff.row(k), x, y));
        }
        Ok(rr)
    }

    /// Encode one symbol into one ring word and advance the encoder state.
    pub fn encode_symbol(&mut self, sym: u16) -> Result<i32> {
        if (sym as usize) >= self.fun_count() {
            return Err(Error::InvalidParameter(format!(
                "symbol {sym} out of range for Q={}",
                self.params.bits_q
            )));
        }
        let rr = self.all_code_fun(self.state.enc_h1, self.state.enc_h2)?;

        // Smallest index whose value already occurred earlier in the
        // candidate list. Scanning in order, the first repeat is it.
        let mut seen: BTreeMap<i32, usize> = BTreeMap::new();
        let mut min_dup: Option<usize> = None;
        for (k, &v) in rr.iter().enumerate() {
            if seen.contains_key(&v) {
                min_dup = Some(k);
                break;
            }
            seen.insert(v, k);
        }

        let next = match min_dup {
            None => rr[sym as usize],
            Some(dup) if (sym as usize) < dup => rr[sym as usize],
            Some(_) => {
                self.stats.collisions += 1;
                let direct = self.ring.wrap(sym as i64 + 1);
                if self.params.info_instead_of_rand && !rr.contains(&direct) {
                    self.stats.direct_info += 1;
                    if self.params.debug_mode {
                        debug!("collision at symbol {sym}: direct-info value {direct}");
                    }
                    direct
                } else {
                    self.stats.skipped_enc += 1;
                    if self.params.debug_mode {
                        debug!("collision at symbol {sym}: emitting random filler");
                    }
                    self.random_filler(&rr)
                }
            }
        };

        self.state.enc_h2 = self.state.enc_h1;
        self.state.enc_h1 = next;
        self.stats.symbols_encoded += 1;
        Ok(next)
    }

    /// A ring word absent from the candidate list and, when the direct-info
    /// channel is live, outside its [1, 2^Q] band. The peer has no way to
    /// invert such a word and drops the position.
    fn random_filler(&mut self, rr: &[i32]) -> i32 {
        let band_hi = 1i64 << self.params.bits_q;
        let admissible = |v: i32, info: bool| {
            !rr.contains(&v) && !(info && v >= 1 && (v as i64) <= band_hi)
        };
        let info = self.params.info_instead_of_rand;
        let span = self.ring.modulus() as u32;
        for _ in 0..64 {
            let v = self.ring.wrap((self.rng.next_u32() % span) as i64);
            if admissible(v, info) {
                return v;
            }
        }
        // Tiny rings can be nearly covered; sweep instead of looping forever.
        let lo = -(self.ring.modulus() >> 1);
        for raw in lo..lo + self.ring.modulus() {
            let v = raw as i32;
            if admissible(v, info) {
                return v;
            }
        }
        warn!("ring fully covered by candidates; filler cannot be made unambiguous");
        rr[0]
    }

    /// Invert one ring word and advance the decoder state. `None` marks a
    /// skipped position (encoder filler).
    pub fn decode_word(&mut self, w: i32) -> Result<Option<u16>> {
        let rr = self.all_code_fun(self.state.dec_h1, self.state.dec_h2)?;
        let out = if let Some(k) = rr.iter().position(|&v| v == w) {
            Some(k as u16)
        } else if self.params.info_instead_of_rand
            && w >= 1
            && (w as i64) <= (1i64 << self.params.bits_q)
        {
            Some((w - 1) as u16)
        } else {
            self.stats.skipped_dec += 1;
            None
        };

        self.state.dec_h2 = self.state.dec_h1;
        self.state.dec_h1 = w;
        if out.is_some() {
            self.stats.symbols_decoded += 1;
        }
        Ok(out)
    }

    /// Encode a symbol stream; one serialized ring word per symbol.
    pub fn encode_symbols(&mut self, symbols: &[u16]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(symbols.len() * self.ring.bytes_per_word());
        for &sym in symbols {
            let word = self.encode_symbol(sym)?;
            self.ring.write_word(word, &mut out);
        }
        Ok(out)
    }

    /// Decode a coded byte stream. A trailing partial word is truncated.
    pub fn decode_symbols(&mut self, coded: &[u8]) -> Result<Vec<u16>> {
        let bpw = self.ring.bytes_per_word();
        let mut out = Vec::with_capacity(coded.len() / bpw);
        let mut i = 0;
        while i + bpw <= coded.len() {
            let word = self.ring.read_word(&coded[i..]);
            if let Some(sym) = self.decode_word(word)? {
                out.push(sym);
            }
            i += bpw;
        }
        if i < coded.len() {
            debug!("dropping {} trailing bytes of partial word", coded.len() - i);
        }
        Ok(out)
    }
}
