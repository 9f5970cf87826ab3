//! Encrypted subjects, format v2.
//!
//! An esub is 24 bytes rendered as 48 hex digits:
//!
//! ```text
//! | iv (8) | c1 (8) | c2 (8) |
//! c1 = MD5(text)[0..8]  ^ Blowfish_k(iv)
//! c2 = MD5(text)[8..16] ^ Blowfish_k(c1)
//! k  = MD5(key)
//! ```
//!
//! That is two single-block OFB encryptions, the second chained off the
//! first ciphertext block. The older single-pass CFB tags are a different
//! format and are not recognised.

use blowfish::Blowfish;
use blowfish::cipher::generic_array::GenericArray;
use blowfish::cipher::{BlockEncrypt, KeyInit};
use md5::{Digest, Md5};
use rand::RngCore;
use rand::rngs::OsRng;

use super::{Scheme, SubjectMatcher, is_hex};
use crate::error::DecodeError;

pub const IV_LEN: usize = 8;
pub const DIGITS: usize = 48;

/// A shared key with its Blowfish schedule already expanded.
#[derive(Clone)]
pub struct EsubKey {
    cipher: Blowfish,
}

impl EsubKey {
    pub fn new(key: &str) -> Self {
        let digest = Md5::digest(key.as_bytes());
        // a 16-byte key is always within Blowfish's 4..=56 byte range
        let cipher = Blowfish::new_from_slice(&digest).expect("md5 digest is a valid blowfish key");
        Self { cipher }
    }

    fn keystream(&self, input: &[u8; 8]) -> [u8; 8] {
        let mut block = GenericArray::clone_from_slice(input);
        self.cipher.encrypt_block(&mut block);
        let mut out = [0u8; 8];
        out.copy_from_slice(&block);
        out
    }

    fn seal(&self, text: &str, iv: &[u8; IV_LEN]) -> [u8; 24] {
        let digest = Md5::digest(text.as_bytes());

        let mut c1 = [0u8; 8];
        for ((c, p), k) in c1.iter_mut().zip(&digest[..8]).zip(self.keystream(iv)) {
            *c = p ^ k;
        }
        let mut c2 = [0u8; 8];
        for ((c, p), k) in c2.iter_mut().zip(&digest[8..]).zip(self.keystream(&c1)) {
            *c = p ^ k;
        }

        let mut out = [0u8; 24];
        out[..8].copy_from_slice(iv);
        out[8..16].copy_from_slice(&c1);
        out[16..].copy_from_slice(&c2);
        out
    }
}

impl std::fmt::Debug for EsubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EsubKey { .. }")
    }
}

/// Build an esub for `text` under `key` with a caller-supplied IV.
pub fn generate(text: &str, key: &str, iv: [u8; IV_LEN]) -> String {
    hex::encode(EsubKey::new(key).seal(text, &iv))
}

/// Build an esub with a fresh random IV.
pub fn generate_random(text: &str, key: &str) -> String {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    generate(text, key, iv)
}

/// Decode a candidate into raw bytes, rejecting anything that is not
/// exactly 48 hex digits.
pub fn decode(candidate: &str) -> Result<[u8; 24], DecodeError> {
    if candidate.len() != DIGITS {
        return Err(DecodeError::InvalidLength {
            len: candidate.len(),
            min: DIGITS,
            max: DIGITS,
        });
    }
    if !is_hex(candidate) {
        return Err(DecodeError::NotHex);
    }
    let mut raw = [0u8; 24];
    hex::decode_to_slice(candidate, &mut raw).map_err(|_| DecodeError::NotHex)?;
    Ok(raw)
}

fn check_raw(key: &EsubKey, text: &str, raw: &[u8; 24]) -> bool {
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&raw[..IV_LEN]);
    key.seal(text, &iv) == *raw
}

/// Does `candidate` carry `text` encrypted under `key`?
pub fn check(text: &str, key: &str, candidate: &str) -> bool {
    match decode(candidate) {
        Ok(raw) => check_raw(&EsubKey::new(key), text, &raw),
        Err(_) => false,
    }
}

/// One configured esub: the tag text and its shared key.
#[derive(Debug, Clone)]
pub struct EsubEntry {
    text: String,
    key: EsubKey,
}

impl EsubEntry {
    pub fn new(text: impl Into<String>, key: &str) -> Self {
        Self {
            text: text.into(),
            key: EsubKey::new(key),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EncryptedSubjectMatcher {
    entries: Vec<EsubEntry>,
}

impl EncryptedSubjectMatcher {
    pub fn new(entries: impl IntoIterator<Item = EsubEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

impl SubjectMatcher for EncryptedSubjectMatcher {
    fn scheme(&self) -> Scheme {
        Scheme::Encrypted
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_mine(&self, subject: &str) -> bool {
        let Ok(raw) = decode(subject) else {
            return false;
        };
        self.entries
            .iter()
            .any(|entry| check_raw(&entry.key, &entry.text, &raw))
    }
}
