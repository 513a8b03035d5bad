//! The `$apr1$<salt>$<encoded>` hash string.

use crate::compare::compare_hashes;
use crate::itoa64::{ENCODED_HASH_LEN, is_itoa64};
use snafu::{OptionExt, Snafu};
use std::fmt;

/// APR1-MD5 hash prefix.
pub const PREFIX: &str = "$apr1$";

const SEPARATOR: u8 = b'$';

/// A stored hash string could not be parsed.
#[derive(Debug, Snafu)]
#[snafu(display("Malformed $apr1$ hash: {reason}"))]
pub struct ParseError {
    reason: &'static str,
}

impl ParseError {
    /// Short description of what is wrong with the input.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// A complete APR1-MD5 hash string.
///
/// The salt is kept exactly as supplied, so the string is only guaranteed to
/// be UTF-8 when the salt is. Equality goes through [`compare_hashes`] and is
/// constant time.
#[derive(Clone)]
pub struct HashString {
    raw: Vec<u8>,
    salt_end: usize,
}

impl HashString {
    /// Concatenates the prefix, the salt, `$` and the encoded digest.
    pub(crate) fn assemble(salt: &[u8], encoded: &[u8; ENCODED_HASH_LEN]) -> Self {
        let mut raw = Vec::with_capacity(PREFIX.len() + salt.len() + 1 + ENCODED_HASH_LEN);
        raw.extend_from_slice(PREFIX.as_bytes());
        raw.extend_from_slice(salt);
        let salt_end = raw.len();
        raw.push(SEPARATOR);
        raw.extend_from_slice(encoded);
        Self { raw, salt_end }
    }

    /// Parses a stored hash string.
    ///
    /// The salt runs up to the next `$` and may be empty; exactly 22 itoa64
    /// characters must follow it.
    pub fn parse(input: impl AsRef<[u8]>) -> Result<Self, ParseError> {
        let input = input.as_ref();
        let rest = input
            .strip_prefix(PREFIX.as_bytes())
            .context(ParseSnafu { reason: "missing $apr1$ prefix" })?;
        let salt_len = rest
            .iter()
            .position(|&b| b == SEPARATOR)
            .context(ParseSnafu { reason: "missing separator after salt" })?;

        let encoded = &rest[salt_len + 1..];
        snafu::ensure!(
            encoded.len() == ENCODED_HASH_LEN,
            ParseSnafu { reason: "encoded digest must be 22 characters" }
        );
        snafu::ensure!(
            encoded.iter().all(|&b| is_itoa64(b)),
            ParseSnafu { reason: "encoded digest contains a character outside ./0-9A-Za-z" }
        );

        Ok(Self {
            raw: input.to_vec(),
            salt_end: PREFIX.len() + salt_len,
        })
    }

    /// The salt, verbatim.
    pub fn salt(&self) -> &[u8] {
        &self.raw[PREFIX.len()..self.salt_end]
    }

    /// The 22-character encoded digest.
    pub fn encoded_hash(&self) -> &[u8] {
        &self.raw[self.salt_end + 1..]
    }

    /// The whole hash string as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Consumes the hash string, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.raw
    }

    /// The whole hash string as text; fails only when the salt is not UTF-8.
    pub fn to_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.raw)
    }
}

impl AsRef<[u8]> for HashString {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl PartialEq for HashString {
    fn eq(&self, other: &Self) -> bool {
        compare_hashes(&self.raw, &other.raw)
    }
}

impl Eq for HashString {}

impl PartialEq<str> for HashString {
    fn eq(&self, other: &str) -> bool {
        compare_hashes(&self.raw, other.as_bytes())
    }
}

impl PartialEq<&str> for HashString {
    fn eq(&self, other: &&str) -> bool {
        compare_hashes(&self.raw, other.as_bytes())
    }
}

impl fmt::Display for HashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.raw))
    }
}

impl fmt::Debug for HashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HashString")
            .field(&String::from_utf8_lossy(&self.raw))
            .finish()
    }
}
