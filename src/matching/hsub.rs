//! Hashed subjects.
//!
//! An hsub is `hex(iv || SHA-256(iv || text))`, cut down to between 48 and 80
//! hex digits. The 8-byte IV makes every tag for the same text look
//! unrelated; only someone who knows `text` can recompute and compare.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::{Scheme, SubjectMatcher, is_hex};
use crate::error::DecodeError;

pub const IV_LEN: usize = 8;
/// IV plus 16 bytes of digest.
pub const MIN_DIGITS: usize = 48;
/// IV plus the full 32-byte digest.
pub const MAX_DIGITS: usize = 80;
pub const DEFAULT_DIGITS: usize = MIN_DIGITS;

/// Build an hsub for `text` with a caller-supplied IV.
///
/// `digits` must be even and within [`MIN_DIGITS`]..=[`MAX_DIGITS`].
pub fn generate(text: &str, iv: [u8; IV_LEN], digits: usize) -> Result<String, DecodeError> {
    if digits % 2 != 0 || !(MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
        return Err(DecodeError::InvalidLength {
            len: digits,
            min: MIN_DIGITS,
            max: MAX_DIGITS,
        });
    }
    Ok(encode(text, &iv, digits))
}

/// Build an hsub with a fresh random IV.
pub fn generate_random(text: &str, digits: usize) -> Result<String, DecodeError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    generate(text, iv, digits)
}

fn encode(text: &str, iv: &[u8], digits: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(iv);
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut raw = Vec::with_capacity(IV_LEN + digest.len());
    raw.extend_from_slice(iv);
    raw.extend_from_slice(&digest);
    let mut out = hex::encode(raw);
    out.truncate(digits);
    out
}

/// Pull the IV out of a candidate tag, rejecting anything that cannot be an
/// hsub.
pub fn decode_iv(candidate: &str) -> Result<[u8; IV_LEN], DecodeError> {
    let len = candidate.len();
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&len) {
        return Err(DecodeError::InvalidLength {
            len,
            min: MIN_DIGITS,
            max: MAX_DIGITS,
        });
    }
    if !is_hex(candidate) {
        return Err(DecodeError::NotHex);
    }
    let mut iv = [0u8; IV_LEN];
    hex::decode_to_slice(&candidate[..IV_LEN * 2], &mut iv).map_err(|_| DecodeError::NotHex)?;
    Ok(iv)
}

/// Does `candidate` carry our `text`? Never fails: undecodable input is
/// simply not ours.
pub fn check(text: &str, candidate: &str) -> bool {
    match decode_iv(candidate) {
        Ok(iv) => encode(text, &iv, candidate.len()).eq_ignore_ascii_case(candidate),
        Err(_) => false,
    }
}

/// Matches subjects against one or more public hsub texts.
#[derive(Debug, Clone, Default)]
pub struct HashedSubjectMatcher {
    texts: Vec<String>,
}

impl HashedSubjectMatcher {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
        }
    }
}

impl SubjectMatcher for HashedSubjectMatcher {
    fn scheme(&self) -> Scheme {
        Scheme::Hashed
    }

    fn len(&self) -> usize {
        self.texts.len()
    }

    fn is_mine(&self, subject: &str) -> bool {
        // decode once, then one hash per configured text
        let Ok(iv) = decode_iv(subject) else {
            return false;
        };
        self.texts
            .iter()
            .any(|text| encode(text, &iv, subject.len()).eq_ignore_ascii_case(subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IV: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

    #[test]
    fn known_answer() {
        assert_eq!(
            generate("alice", IV, MAX_DIGITS).unwrap(),
            "00010203040506078bbdcf471115167dc7458d1f869d50e70ecbfb4f04d30da42e1addb2b9ec5f76"
        );
        assert_eq!(
            generate("alice", IV, MIN_DIGITS).unwrap(),
            "00010203040506078bbdcf471115167dc7458d1f869d50e7"
        );
    }

    #[test]
    fn every_supported_length_round_trips() {
        for digits in (MIN_DIGITS..=MAX_DIGITS).step_by(2) {
            let tag = generate("secret tag", [0xa5; 8], digits).unwrap();
            assert_eq!(tag.len(), digits);
            assert!(check("secret tag", &tag), "length {digits}");
            assert!(!check("secret tah", &tag), "length {digits}");
            assert!(!check("secret tag ", &tag), "length {digits}");
        }
    }

    #[test]
    fn random_iv_tags_differ_but_both_match() {
        let a = generate_random("bob", DEFAULT_DIGITS).unwrap();
        let b = generate_random("bob", DEFAULT_DIGITS).unwrap();
        assert_ne!(a, b);
        assert!(check("bob", &a));
        assert!(check("bob", &b));
    }

    #[test]
    fn uppercase_candidates_are_accepted() {
        let tag = generate("alice", IV, 64).unwrap();
        assert!(check("alice", &tag.to_ascii_uppercase()));
    }

    #[test]
    fn malformed_candidates_are_not_mine() {
        let tag = generate("alice", IV, MIN_DIGITS).unwrap();
        assert!(!check("alice", &tag[..46]));
        assert!(!check("alice", &format!("{tag}{}", "0".repeat(33))));
        assert!(!check("alice", &format!("zz{}", &tag[2..])));
        assert!(!check("alice", "hello"));
        assert!(!check("alice", ""));
        assert_eq!(
            decode_iv("not a tag"),
            Err(DecodeError::InvalidLength {
                len: 9,
                min: MIN_DIGITS,
                max: MAX_DIGITS
            })
        );
        assert_eq!(decode_iv(&"g".repeat(48)), Err(DecodeError::NotHex));
    }

    #[test]
    fn odd_or_out_of_range_generation_is_rejected() {
        assert!(generate("alice", IV, 49).is_err());
        assert!(generate("alice", IV, 46).is_err());
        assert!(generate("alice", IV, 82).is_err());
    }

    #[test]
    fn matcher_checks_every_text() {
        let m = HashedSubjectMatcher::new(["first", "second"]);
        let tag = generate("second", IV, 56).unwrap();
        assert!(m.is_mine(&tag));
        assert!(!m.is_mine(&generate("third", IV, 56).unwrap()));
        assert!(!m.is_mine("plain subject"));
    }
}
