//! Compatibility tests for `$apr1$` hashes.
//!
//! Fixed vectors always run. Interop with Apache htpasswd and OpenSSL only
//! runs when `/usr/bin/htpasswd` / an `openssl` on `PATH` are available.

use apr1::{ENCODED_HASH_LEN, HashString, PREFIX, compare_hashes, hash_password, is_itoa64};
use std::path::Path;
use std::process::Command;

/// (password, salt, expected)
const VECTORS: &[(&str, &str, &str)] = &[
    ("password", "ZIOpPHmv", "$apr1$ZIOpPHmv$w.iQ7YJbtKjs/I5iTlVcl/"),
    ("hello", "xlWep/gn", "$apr1$xlWep/gn$6UNiHq3WE714EKfeH2X5c."),
    ("password", "lZL6V/ci", "$apr1$lZL6V/ci$eIMz/iKDkbtys/uU7LEK00"),
    ("testpass123", "WxrZ8P3I", "$apr1$WxrZ8P3I$XD2BykvOa82I1l5jCMtbW0"),
    // Longer than one alt digest: the head of alt is fed more than once.
    ("passwordpasswordpasswordpassword", "epicepic", "$apr1$epicepic$tCyT.K.FOhELsBKvhUySa0"),
    ("0123456789abcdef0", "az/.ZA98", "$apr1$az/.ZA98$RBO4mgz38rHrv0SZYCfho/"),
];

/// Fixed sample set for the property checks below.
const SAMPLES: &[(&[u8], &[u8])] = &[
    (b"", b"saltsalt"),
    (b"a", b"saltsalt"),
    (b"password", b"ZIOpPHmv"),
    (b"passwordpasswordpasswordpassword", b"epicepic"),
    (b"0123456789abcdef", b"./0189AZ"),
    (b"0123456789abcdef0", b"az/.ZA98"),
    (b"\xff\xfe\x00\x01", b"12345678"),
    (b"correct horse battery staple", b"Xy9/.qRt"),
];

fn has_apache_htpasswd() -> bool {
    Path::new("/usr/bin/htpasswd").exists()
}

fn has_openssl() -> bool {
    Command::new("openssl")
        .arg("version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn hash(password: &[u8], salt: &[u8]) -> HashString {
    hash_password(password, salt).unwrap()
}

#[test]
fn test_known_vectors() {
    for &(password, salt, expected) in VECTORS {
        let result = hash(password.as_bytes(), salt.as_bytes());
        assert_eq!(result.to_str().unwrap(), expected, "password {:?}", password);
        assert!(apr1::verify_password(password.as_bytes(), expected.as_bytes()).unwrap());
    }
}

#[test]
fn test_deterministic() {
    for &(password, salt) in SAMPLES {
        let first = hash(password, salt);
        assert_eq!(first, hash(password, salt));
        assert_eq!(HashString::parse(&first).unwrap(), first);
    }
}

#[test]
fn test_hash_size() {
    // $apr1$ + 8 salt chars + $ + 22 hash chars
    for &(password, salt) in SAMPLES {
        let result = hash(password, salt);
        assert_eq!(result.as_bytes().len(), PREFIX.len() + 8 + 1 + ENCODED_HASH_LEN);
    }
}

#[test]
fn test_salt_round_trip() {
    for &(password, salt) in SAMPLES {
        let result = hash(password, salt);
        let text = result.to_str().unwrap();
        let segment = text[PREFIX.len()..].split('$').next().unwrap();
        assert_eq!(segment.as_bytes(), salt);
        assert_eq!(result.salt(), salt);
    }
}

#[test]
fn test_alphabet_containment() {
    for _ in 0..32 {
        let result = hash_password(b"password", b"").unwrap();
        assert!(result.salt().iter().all(|&b| is_itoa64(b)));
        assert!(result.encoded_hash().iter().all(|&b| is_itoa64(b)));
    }
    for &(password, salt) in SAMPLES {
        assert!(hash(password, salt).encoded_hash().iter().all(|&b| is_itoa64(b)));
    }
}

#[test]
fn test_single_bit_sensitivity() {
    for &(password, salt) in SAMPLES {
        let base = hash(password, salt);

        for byte in 0..password.len() {
            for bit in 0..8 {
                let mut flipped = password.to_vec();
                flipped[byte] ^= 1 << bit;
                let other = hash(&flipped, salt);
                assert_ne!(
                    base.encoded_hash(),
                    other.encoded_hash(),
                    "password byte {} bit {}",
                    byte,
                    bit
                );
            }
        }

        for byte in 0..salt.len() {
            for bit in 0..8 {
                let mut flipped = salt.to_vec();
                flipped[byte] ^= 1 << bit;
                let other = hash(password, &flipped);
                assert_ne!(
                    base.encoded_hash(),
                    other.encoded_hash(),
                    "salt byte {} bit {}",
                    byte,
                    bit
                );
            }
        }
    }
}

#[test]
fn test_comparator() {
    let hashes: Vec<HashString> = SAMPLES.iter().map(|&(p, s)| hash(p, s)).collect();
    for (i, a) in hashes.iter().enumerate() {
        assert!(compare_hashes(a.as_bytes(), a.as_bytes()));
        for b in &hashes[i + 1..] {
            assert!(!compare_hashes(a.as_bytes(), b.as_bytes()));
        }
        let truncated = &a.as_bytes()[..a.as_bytes().len() - 1];
        assert!(!compare_hashes(a.as_bytes(), truncated));
    }
}

//
// Interop with Apache htpasswd
//

#[test]
fn test_apache_htpasswd_hash_verifies() {
    if !has_apache_htpasswd() {
        return;
    }

    // htpasswd -nbm prints "user:$apr1$...$..."
    let output = Command::new("/usr/bin/htpasswd")
        .args(["-nbm", "alice", "testpass123"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let (_, stored) = stdout.trim().split_once(':').unwrap();
    assert!(stored.starts_with(PREFIX));
    assert!(apr1::verify_password(b"testpass123", stored.as_bytes()).unwrap());
    assert!(!apr1::verify_password(b"testpass124", stored.as_bytes()).unwrap());
}

#[test]
fn test_our_hash_verified_by_apache() {
    if !has_apache_htpasswd() {
        return;
    }

    let dir = tempfile::TempDir::new().unwrap();
    let file_path = dir.path().join("test.htpasswd");
    let stored = hash_password(b"testpass123", b"").unwrap();
    let mut line = b"alice:".to_vec();
    line.extend(stored.into_bytes());
    line.push(b'\n');
    std::fs::write(&file_path, line).unwrap();

    let path = file_path.to_str().unwrap();
    let ok = Command::new("/usr/bin/htpasswd")
        .args(["-vb", path, "alice", "testpass123"])
        .output()
        .unwrap();
    assert!(ok.status.success(), "{}", String::from_utf8_lossy(&ok.stderr));

    let wrong = Command::new("/usr/bin/htpasswd")
        .args(["-vb", path, "alice", "wrongpass"])
        .output()
        .unwrap();
    assert!(!wrong.status.success());
}

//
// Interop with OpenSSL
//

#[test]
fn test_openssl_matches() {
    if !has_openssl() {
        return;
    }

    for &(password, salt) in SAMPLES {
        let (Ok(password), Ok(salt)) = (std::str::from_utf8(password), std::str::from_utf8(salt))
        else {
            continue;
        };
        if password.is_empty() {
            continue;
        }

        let output = Command::new("openssl")
            .args(["passwd", "-apr1", "-salt", salt, password])
            .output()
            .unwrap();
        if !output.status.success() {
            continue;
        }

        let expected = String::from_utf8(output.stdout).unwrap();
        assert_eq!(
            hash(password.as_bytes(), salt.as_bytes()).to_str().unwrap(),
            expected.trim()
        );
    }
}
