//! The `crypt(3)` flavoured base64 used by APR1-MD5.
//!
//! The alphabet is the `itoa64` table from Apache APR's `apr_md5.c`:
//!
//! ```text
//! ./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz
//! ```
//!
//! It differs from standard base64 in both symbol order and bit order: every
//! 24-bit group is emitted least-significant six bits first.

/// Custom base64 alphabet (itoa64) shared by salts and encoded digests.
pub const ITOA64: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of the encoded digest part of an `$apr1$` hash.
pub const ENCODED_HASH_LEN: usize = 22;

/// Byte index triples visited while encoding the final digest.
///
/// The order comes from `apr_md5_encode()`. Byte 5 closing the fifth group and
/// the zero padding in the last group are part of the format.
const GROUPS: [[Option<usize>; 3]; 6] = [
    [Some(0), Some(6), Some(12)],
    [Some(1), Some(7), Some(13)],
    [Some(2), Some(8), Some(14)],
    [Some(3), Some(9), Some(15)],
    [Some(4), Some(10), Some(5)],
    [None, None, Some(11)],
];

/// Returns `true` if `byte` belongs to the itoa64 alphabet.
pub fn is_itoa64(byte: u8) -> bool {
    matches!(byte, b'.' | b'/' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z')
}

/// Packs `(a, b, c)` into 24 bits and writes four symbols, low bits first.
fn fill(out: &mut [u8], a: u8, b: u8, c: u8) {
    let mut v = u32::from(a) << 16 | u32::from(b) << 8 | u32::from(c);
    for slot in out.iter_mut().take(4) {
        *slot = ITOA64[(v & 0x3f) as usize];
        v >>= 6;
    }
}

/// Encodes a 16-byte final digest into its 22-character representation.
///
/// Six groups produce 24 symbols; the last two only carry the zero padding of
/// the final group and are dropped.
pub fn encode_digest(digest: &[u8; 16]) -> [u8; ENCODED_HASH_LEN] {
    let byte = |index: Option<usize>| index.map_or(0, |i| digest[i]);

    let mut symbols = [0u8; 24];
    for (chunk, [a, b, c]) in symbols.chunks_exact_mut(4).zip(GROUPS) {
        fill(chunk, byte(a), byte(b), byte(c));
    }

    let mut encoded = [0u8; ENCODED_HASH_LEN];
    encoded.copy_from_slice(&symbols[..ENCODED_HASH_LEN]);
    encoded
}
