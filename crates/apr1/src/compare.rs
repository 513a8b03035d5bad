//! Constant-time comparison of hash strings.

use subtle::{Choice, ConstantTimeEq};

/// Returns `true` if `a` and `b` are byte-for-byte identical.
///
/// Every byte position up to the longer length is visited and the result is
/// accumulated in a [`Choice`], so the running time depends on the input
/// lengths only, never on where (or whether) the contents differ.
pub fn compare_hashes(a: &[u8], b: &[u8]) -> bool {
    let same_len = (a.len() as u64).ct_eq(&(b.len() as u64));

    let mut same_bytes = Choice::from(1);
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        same_bytes &= x.ct_eq(&y);
    }

    (same_len & same_bytes).into()
}
