//! Locality-sensitive digests for fuzzy string comparison.
//!
//! A [`SimHash`] is a 256-bit fingerprint built from overlapping character
//! trigrams: each trigram is hashed with SHA-256 and every digest bit casts a
//! +1/−1 vote; the sign of each accumulated vote becomes the output bit.
//! Similar strings share most trigrams and therefore most bits, so Hamming
//! distance between digests approximates string dissimilarity.

use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

const HASH_LEN_BITS: usize = 256;
const HASH_LEN_BYTES: usize = HASH_LEN_BITS / 8;

const N_GRAM_LENGTH: usize = 3;
const N_GRAM_OVERLAP: usize = 1;

/// Score returned by [`SimHash::similarity`] for an identical digest.
pub const IDENTICAL_SCORE: i32 = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimHash {
    value: [u8; HASH_LEN_BYTES],
}

impl SimHash {
    /// Compute the digest of a string. Case and whitespace are ignored so
    /// that "Shape Of You" and "shape of you" hash identically.
    pub fn calc<T: AsRef<str>>(source: T) -> SimHash {
        let sanitized: String = source
            .as_ref()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let graphemes: Vec<&str> = sanitized.graphemes(true).collect();
        let ngrams = make_n_grams(&graphemes, N_GRAM_LENGTH, N_GRAM_OVERLAP);

        let mut votes = [0i64; HASH_LEN_BITS];
        for ngram in ngrams {
            let mut hasher = Sha256::new();
            hasher.update(ngram);
            let digest = hasher.finalize();
            for (i, vote) in votes.iter_mut().enumerate() {
                let bit = (digest[i / 8] >> (7 - (i % 8))) & 1;
                *vote += if bit == 1 { 1 } else { -1 };
            }
        }

        let mut value = [0u8; HASH_LEN_BYTES];
        for (i, vote) in votes.iter().enumerate() {
            if *vote > 0 {
                value[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        SimHash { value }
    }

    /// Pairwise similarity in the range −128..=128: 128 for an identical
    /// digest, around zero for unrelated strings.
    pub fn similarity(&self, other: &SimHash) -> i32 {
        let mut differing = 0u32;
        for (a, b) in self.value.iter().zip(other.value.iter()) {
            differing += (a ^ b).count_ones();
        }
        IDENTICAL_SCORE - differing as i32
    }
}

impl std::fmt::Display for SimHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.value {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

fn make_n_grams(source: &[&str], n_gram_length: usize, overlap: usize) -> Vec<String> {
    assert!(
        overlap < n_gram_length,
        "The overlap must be smaller than the length of the n gram."
    );
    let mut ngrams: Vec<String> = vec![];
    let mut left = 0;
    let step = n_gram_length - overlap;
    let max_left = if source.len() > overlap {
        source.len() - overlap
    } else {
        source.len()
    };
    loop {
        let right = std::cmp::min(left + n_gram_length, source.len());
        ngrams.push(source[left..right].concat());
        left += step;
        if left >= max_left {
            break;
        }
    }
    ngrams
}
