//! Paired (h, v) dialect with single-bit error recovery.
//!
//! Each symbol k is transmitted as two chained words: h = f_k(x, y) over the
//! rolling state, then v = f_k(h, x). The redundancy lets the decoder test
//! three hypotheses per pair (clean, one bit wrong in h, one bit wrong in v)
//! and repair the wire word it convicts.

use alloc::format;
use alloc::vec::Vec;

use log::{debug, info};
use rand_core::RngCore;

use nrc_core::{Error, Result};

use crate::Codec;

impl<R: RngCore> Codec<R> {
    /// Encode a symbol stream as (h, v) word pairs.
    pub fn encode_symbols_paired(&mut self, symbols: &[u16]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(symbols.len() * 2 * self.ring.bytes_per_word());
        for &sym in symbols {
            if (sym as usize) >= self.fun_count() {
                return Err(Error::InvalidParameter(format!(
                    "symbol {sym} out of range for Q={}",
                    self.params.bits_q
                )));
            }
            let rr = self.all_code_fun(self.state.enc_h1, self.state.enc_h2)?;
            let h = rr[sym as usize];
            let rrv = self.all_code_fun(h, self.state.enc_h1)?;
            let v = rrv[sym as usize];
            self.ring.write_word(h, &mut out);
            self.ring.write_word(v, &mut out);
            // next pair sees h1 = v(k), h2 = h(k)
            self.state.enc_h2 = h;
            self.state.enc_h1 = v;
            self.stats.symbols_encoded += 1;
        }
        Ok(out)
    }

    /// Decode (h, v) word pairs, correcting at most one flipped bit per
    /// pair. A trailing partial pair is truncated; a pair that fails every
    /// hypothesis is dropped.
    pub fn decode_symbols_paired(&mut self, coded: &[u8]) -> Result<Vec<u16>> {
        let bpw = self.ring.bytes_per_word();
        let pair = 2 * bpw;
        let mut out = Vec::with_capacity(coded.len() / pair);
        let mut i = 0;
        while i + pair <= coded.len() {
            let mut h = self.ring.read_word(&coded[i..]);
            let mut v = self.ring.read_word(&coded[i + bpw..]);
            let (h1, h2) = (self.state.dec_h1, self.state.dec_h2);

            if let Some(sym) = self.pair_match(h1, h2, h, v)? {
                out.push(sym);
                self.stats.symbols_decoded += 1;
            } else if let Some((sym, pos)) = self.pair_match_flip_h(h1, h2, h, v)? {
                let before = h;
                h = self.flip_bit(h, pos);
                self.stats.errors_corrected_h += 1;
                info!("corrected bit {pos} in h word ({before} -> {h})");
                out.push(sym);
                self.stats.symbols_decoded += 1;
            } else if let Some((sym, pos)) = self.pair_match_flip_v(h1, h2, h, v)? {
                let before = v;
                v = self.flip_bit(v, pos);
                self.stats.errors_corrected_v += 1;
                info!("corrected bit {pos} in v word ({before} -> {v})");
                out.push(sym);
                self.stats.symbols_decoded += 1;
            } else {
                self.stats.skipped_dec += 1;
                if self.params.debug_mode {
                    debug!("pair ({h}, {v}) failed every hypothesis; dropped");
                }
            }

            self.state.dec_h2 = h;
            self.state.dec_h1 = v;
            i += pair;
        }
        Ok(out)
    }

    /// Invert bit `pos` (1-based) and re-wrap into the ring.
    fn flip_bit(&self, x: i32, pos: u32) -> i32 {
        self.ring.wrap((x ^ (1i32 << (pos - 1))) as i64)
    }

    /// Hypothesis "no error": a function index producing both h over
    /// (h1, h2) and v over (h, h1).
    fn pair_match(&self, h1: i32, h2: i32, h: i32, v: i32) -> Result<Option<u16>> {
        let rr = self.all_code_fun(h1, h2)?;
        let rrv = self.all_code_fun(h, h1)?;
        Ok(first_joint_match(&rr, &rrv, h, v))
    }

    /// Hypothesis "one bit of h flipped": try every bit position in turn
    /// with the candidate sets recomputed from the repaired h.
    fn pair_match_flip_h(&self, h1: i32, h2: i32, h: i32, v: i32) -> Result<Option<(u16, u32)>> {
        let rr = self.all_code_fun(h1, h2)?;
        for pos in 1..=self.params.bits_q {
            let repaired = self.flip_bit(h, pos);
            let rrv = self.all_code_fun(repaired, h1)?;
            if let Some(sym) = first_joint_match(&rr, &rrv, repaired, v) {
                return Ok(Some((sym, pos)));
            }
        }
        Ok(None)
    }

    /// Hypothesis "one bit of v flipped": h is trusted, so the candidate
    /// sets are fixed and only v varies.
    fn pair_match_flip_v(&self, h1: i32, h2: i32, h: i32, v: i32) -> Result<Option<(u16, u32)>> {
        let rr = self.all_code_fun(h1, h2)?;
        let rrv = self.all_code_fun(h, h1)?;
        for pos in 1..=self.params.bits_q {
            let repaired = self.flip_bit(v, pos);
            if let Some(sym) = first_joint_match(&rr, &rrv, h, repaired) {
                return Ok(Some((sym, pos)));
            }
        }
        Ok(None)
    }
}

/// Smallest function index whose candidates equal h and v simultaneously.
fn first_joint_match(rr: &[i32], rrv: &[i32], h: i32, v: i32) -> Option<u16> {
    (0..rr.len())
        .find(|&k| rr[k] == h && rrv[k] == v)
        .map(|k| k as u16)
}
