//! The five polynomial coding-function families.
//!
//! Each family maps the two previous ring words (x, y) through one
//! coefficient row; all arithmetic wraps in the M-bit ring.

use nrc_ring::Ring;

/// Evaluate family `fun_type` with coefficient `row` at (x, y).
///
/// | family | f(x, y)                   | row        |
/// |--------|---------------------------|------------|
/// | 1      | a*x + b*y + q             | (a, b, q)  |
/// | 2      | a*x^2 + b*y + q           | (a, b, q)  |
/// | 3      | a*x^2 + b*y^2 + q         | (a, b, q)  |
/// | 4      | a*x^3 + b*y^2 + q         | (a, b, q)  |
/// | 5      | a*x + b*x*y + c*y + q     | (a, b, c, q) |
pub fn eval(ring: &Ring, fun_type: u8, row: &[i32; 4], x: i32, y: i32) -> i32 {
    let (x, y) = (x as i64, y as i64);
    let a = row[0] as i64;
    let b = row[1] as i64;
    match fun_type {
        1 => {
            let q = row[2] as i64;
            ring.add(ring.add(ring.mul(a, x) as i64, ring.mul(b, y) as i64) as i64, q)
        }
        2 => {
            let q = row[2] as i64;
            let xx = ring.mul(x, x) as i64;
            ring.add(ring.add(ring.mul(a, xx) as i64, ring.mul(b, y) as i64) as i64, q)
        }
        3 => {
            let q = row[2] as i64;
            let xx = ring.mul(x, x) as i64;
            let yy = ring.mul(y, y) as i64;
            ring.add(ring.add(ring.mul(a, xx) as i64, ring.mul(b, yy) as i64) as i64, q)
        }
        4 => {
            let q = row[2] as i64;
            let xxx = ring.mul(ring.mul(x, x) as i64, x) as i64;
            let yy = ring.mul(y, y) as i64;
            ring.add(ring.add(ring.mul(a, xxx) as i64, ring.mul(b, yy) as i64) as i64, q)
        }
        5 => {
            let c = row[2] as i64;
            let q = row[3] as i64;
            let xy = ring.mul(x, y) as i64;
            ring.add(
                ring.add(
                    ring.add(ring.mul(a, x) as i64, ring.mul(b, xy) as i64) as i64,
                    ring.mul(c, y) as i64,
                ) as i64,
                q,
            )
        }
        _ => 0,
    }
}
