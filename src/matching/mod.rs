//! Fuzzy matching of user-supplied track metadata against external search
//! hits, built on locality-sensitive sim-hash digests.

mod resolver;
mod sim_hash;

pub use resolver::{CandidateKind, FuzzyResolver, MatchCandidate};
pub use sim_hash::{SimHash, IDENTICAL_SCORE};
