//! Apache APR1-MD5 password hashing.
//!
//! This module implements the APR1-MD5 password hashing algorithm used by
//! Apache's htpasswd tool. The format is: `$apr1$salt$hash`
//!
//! # Algorithm Source
//!
//! The construction is the one in Apache APR's `apr_md5_encode()`
//! (`crypto/apr_md5.c`), itself derived from the FreeBSD 3.0 MD5 `crypt()`.
//! Output must match those byte for byte, so the odd parts (re-feeding the
//! head of the alt digest, the length-bit loop, the round gating and the
//! encoding order) are reproduced as is.
//!
//! # Security Warning
//!
//! MD5 is cryptographically broken. APR1-MD5 exists here for compatibility
//! with existing htpasswd files and consumers of the format.

use crate::hash_string::{HashString, PREFIX, ParseError};
use crate::itoa64::encode_digest;
use crate::salt::{self, OsRandom, RandomSource};
use md5::digest::generic_array::GenericArray;
use md5::{Digest, Md5};
use snafu::{ResultExt, Snafu};
use zeroize::{Zeroize, Zeroizing};

/// Number of MD5 rounds in the APR1 algorithm.
pub const ROUNDS: u32 = 1000;

/// MD5 output size in bytes.
const DIGEST_LEN: usize = 16;

/// Errors that can occur while hashing or verifying APR1-MD5 passwords.
#[derive(Debug, Snafu)]
pub enum Error {
    /// A salt was needed and could not be generated.
    #[snafu(display("Failed to generate salt"))]
    GenerateSalt {
        /// Underlying salt generation error.
        source: salt::Error,
    },

    /// Input was required to be UTF-8 and was not.
    #[snafu(display("The {field} is not valid UTF-8"))]
    InvalidEncoding {
        /// Which input failed validation (`password` or `salt`).
        field: &'static str,
        /// Underlying UTF-8 error.
        source: std::str::Utf8Error,
    },

    /// The stored hash is not an APR1-MD5 hash string.
    #[snafu(display("Failed to parse stored hash"))]
    MalformedHash {
        /// Underlying parse error.
        source: ParseError,
    },
}

/// Writes the output of `ctx` into `out` without an intermediate copy.
fn finalize_into(ctx: Md5, out: &mut [u8; DIGEST_LEN]) {
    ctx.finalize_into(GenericArray::from_mut_slice(out));
}

/// Runs the APR1 digest construction and returns the final 16-byte digest.
fn mix(password: &[u8], salt: &[u8]) -> Zeroizing<[u8; DIGEST_LEN]> {
    // Step 1: password, magic, salt.
    let mut ctx = Md5::new();
    ctx.update(password);
    ctx.update(PREFIX.as_bytes());
    ctx.update(salt);

    // Step 2: alt = MD5(password + salt + password). The head of `alt` is fed
    // once per 16 bytes of password; the slice always starts at 0.
    let mut alt = [0u8; DIGEST_LEN];
    let mut alt_ctx = Md5::new();
    alt_ctx.update(password);
    alt_ctx.update(salt);
    alt_ctx.update(password);
    finalize_into(alt_ctx, &mut alt);

    let mut remaining = password.len();
    while remaining > 0 {
        ctx.update(&alt[..remaining.min(DIGEST_LEN)]);
        remaining = remaining.saturating_sub(DIGEST_LEN);
    }
    alt.zeroize();

    // Step 3: one byte per bit of the password length, a zero byte for set
    // bits and the first password byte for clear ones.
    let mut bits = password.len();
    while bits > 0 {
        if bits & 1 == 1 {
            ctx.update([0u8]);
        } else {
            ctx.update(&password[..1]);
        }
        bits >>= 1;
    }

    // Step 4.
    let mut running = Zeroizing::new([0u8; DIGEST_LEN]);
    finalize_into(ctx, &mut running);

    // Step 5: 1000 rounds.
    for i in 0..ROUNDS {
        let mut round = Md5::new();

        if i & 1 == 1 {
            round.update(password);
        } else {
            round.update(&running[..]);
        }

        if i % 3 != 0 {
            round.update(salt);
        }

        if i % 7 != 0 {
            round.update(password);
        }

        if i & 1 == 1 {
            round.update(&running[..]);
        } else {
            round.update(password);
        }

        finalize_into(round, &mut running);
    }

    running
}

/// Hashes `password` with `salt` without any salt generation.
fn crypt(password: &[u8], salt: &[u8]) -> HashString {
    tracing::trace!(salt_len = salt.len(), "computing apr1 hash");
    let digest = mix(password, salt);
    let encoded = Zeroizing::new(encode_digest(&digest));
    HashString::assemble(salt, &encoded)
}

/// Hash a password using the APR1-MD5 algorithm.
///
/// # Arguments
///
/// * `password` - The password bytes; no normalization is applied
/// * `salt` - The salt, used verbatim. Conventionally 8 itoa64 characters;
///   truncating longer salts is up to the caller. An empty salt makes this
///   function generate one from the operating system's CSPRNG.
///
/// # Errors
///
/// Fails only if a salt had to be generated and the random source failed.
pub fn hash_password(password: &[u8], salt: &[u8]) -> Result<HashString, Error> {
    hash_password_with(password, salt, &mut OsRandom)
}

/// Like [`hash_password`], drawing a missing salt from `rng`.
pub fn hash_password_with<R: RandomSource + ?Sized>(
    password: &[u8],
    salt: &[u8],
    rng: &mut R,
) -> Result<HashString, Error> {
    if salt.is_empty() {
        let generated = salt::generate_salt_with(rng).context(GenerateSaltSnafu)?;
        return Ok(crypt(password, &generated));
    }
    Ok(crypt(password, salt))
}

/// Like [`hash_password`], but requires both inputs to be valid UTF-8.
///
/// For callers whose policy is text-only credentials. The algorithm itself is
/// defined over bytes and does not need this.
pub fn hash_password_utf8(password: &[u8], salt: &[u8]) -> Result<HashString, Error> {
    std::str::from_utf8(password).context(InvalidEncodingSnafu { field: "password" })?;
    std::str::from_utf8(salt).context(InvalidEncodingSnafu { field: "salt" })?;
    hash_password(password, salt)
}

/// Verify a password against an APR1-MD5 hash.
///
/// The salt is taken from `stored` and the hash recomputed, then both strings
/// are compared in constant time.
///
/// # Returns
///
/// `Ok(true)` if the password matches, `Ok(false)` otherwise, and an error if
/// `stored` is not an `$apr1$` hash string.
pub fn verify_password(password: &[u8], stored: &[u8]) -> Result<bool, Error> {
    let stored = HashString::parse(stored)
        .inspect_err(|e| tracing::debug!(reason = e.reason(), "stored hash is not apr1"))
        .context(MalformedHashSnafu)?;
    Ok(crypt(password, stored.salt()) == stored)
}
