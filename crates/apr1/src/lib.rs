#![warn(missing_docs)]

//! Apache APR1-MD5 (`$apr1$`) password hashing.
//!
//! Produces and checks the salted, iterated MD5 hash strings written by
//! Apache's `htpasswd -m`, e.g. `$apr1$ZIOpPHmv$w.iQ7YJbtKjs/I5iTlVcl/`.
//! Passwords and salts are raw bytes; text policy is left to the caller (see
//! [`hash_password_utf8`]).
//!
//! # Example
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Hash with a fixed salt...
//! let hash = apr1::hash_password(b"password", b"ZIOpPHmv")?;
//! assert_eq!(hash, "$apr1$ZIOpPHmv$w.iQ7YJbtKjs/I5iTlVcl/");
//!
//! // ...or let the library pick a random one.
//! let hash = apr1::hash_password(b"password", b"")?;
//! assert!(apr1::verify_password(b"password", hash.as_bytes())?);
//!
//! // Compare two stored hashes in constant time.
//! assert!(apr1::compare_hashes(hash.as_bytes(), hash.as_bytes()));
//! # Ok(())
//! # }
//! ```

mod apr1_md5;
mod compare;
mod hash_string;
mod itoa64;
pub mod salt;

pub use apr1_md5::{
    Error, ROUNDS, hash_password, hash_password_utf8, hash_password_with, verify_password,
};
pub use compare::compare_hashes;
pub use hash_string::{HashString, PREFIX, ParseError};
pub use itoa64::{ENCODED_HASH_LEN, ITOA64, encode_digest, is_itoa64};
pub use salt::{OsRandom, RandomSource, SALT_LEN, generate_salt, generate_salt_with};
