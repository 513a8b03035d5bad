//! Salt generation for APR1-MD5.
//!
//! A salt is eight symbols from the itoa64 alphabet. Six random bytes
//! (48 bits) are split into eight 6-bit indices, so every symbol is drawn
//! uniformly and independently. Only a cryptographically secure source is
//! ever used; a failing source fails the call.

use crate::itoa64::ITOA64;
use snafu::{ResultExt, Snafu};
use zeroize::Zeroizing;

/// Salt length in characters for APR1-MD5.
pub const SALT_LEN: usize = 8;

/// Random bytes consumed per salt: 6 bytes * 8 bits = 8 chars * 6 bits.
const SALT_ENTROPY_BYTES: usize = 6;

/// Errors that can occur while generating a salt.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The secure random source is unavailable or failed.
    #[snafu(display("Secure random source failed"))]
    RandomSource {
        /// Error reported by the random source.
        source: getrandom::Error,
    },
}

/// A cryptographically secure source of random bytes.
///
/// Implementations must either fill `dest` completely or fail; there is no
/// partial fill.
pub trait RandomSource {
    /// Fills `dest` with random bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), getrandom::Error>;
}

/// The operating system's CSPRNG, via [`getrandom`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), getrandom::Error> {
        getrandom::fill(dest)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), getrandom::Error> {
        (**self).fill(dest)
    }
}

/// Generates a random salt using the operating system's CSPRNG.
pub fn generate_salt() -> Result<[u8; SALT_LEN], Error> {
    generate_salt_with(&mut OsRandom)
}

/// Generates a random salt using the given random source.
pub fn generate_salt_with<R: RandomSource + ?Sized>(rng: &mut R) -> Result<[u8; SALT_LEN], Error> {
    let mut entropy = Zeroizing::new([0u8; SALT_ENTROPY_BYTES]);
    if let Err(source) = rng.fill(&mut entropy[..]) {
        tracing::warn!(error = %source, "secure random source failed while generating a salt");
        return Err(source).context(RandomSourceSnafu);
    }

    let mut salt = [0u8; SALT_LEN];
    let mut val: u32 = 0;
    let mut bits: u32 = 0;
    let mut bytes = entropy.iter();

    for slot in &mut salt {
        if bits < 6
            && let Some(&byte) = bytes.next()
        {
            val |= u32::from(byte) << bits;
            bits += 8;
        }
        *slot = ITOA64[(val & 0x3f) as usize];
        val >>= 6;
        bits -= 6;
    }

    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itoa64::is_itoa64;

    /// Replays a fixed byte pattern.
    struct Fixed(u8);

    impl RandomSource for Fixed {
        fn fill(&mut self, dest: &mut [u8]) -> Result<(), getrandom::Error> {
            dest.fill(self.0);
            Ok(())
        }
    }

    struct Broken;

    impl RandomSource for Broken {
        fn fill(&mut self, _dest: &mut [u8]) -> Result<(), getrandom::Error> {
            Err(getrandom::Error::UNSUPPORTED)
        }
    }

    #[test]
    fn test_generate_salt_length() {
        let salt = generate_salt().unwrap();
        assert_eq!(salt.len(), SALT_LEN);
    }

    #[test]
    fn test_generate_salt_valid_chars() {
        for _ in 0..64 {
            let salt = generate_salt().unwrap();
            for &ch in &salt {
                assert!(is_itoa64(ch), "Invalid salt character: {}", ch as char);
            }
        }
    }

    #[test]
    fn test_generate_salt_differs() {
        // 48 bits of entropy; a repeat here means the source is not random.
        let a = generate_salt().unwrap();
        let b = generate_salt().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_bit_packing() {
        assert_eq!(&generate_salt_with(&mut Fixed(0x00)).unwrap(), b"........");
        assert_eq!(&generate_salt_with(&mut Fixed(0xff)).unwrap(), b"zzzzzzzz");
        // 0x55 repeated: every 6-bit group starts on an even bit, so each
        // one reads 0b010101 = 21, i.e. 'J'.
        assert_eq!(&generate_salt_with(&mut Fixed(0x55)).unwrap(), b"JJJJJJJJ");
    }

    #[test]
    fn test_random_source_failure_is_reported() {
        let err = generate_salt_with(&mut Broken).unwrap_err();
        assert!(matches!(err, Error::RandomSource { .. }));
    }
}
