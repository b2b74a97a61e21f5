//! Candidate resolution for external search hits.

use super::sim_hash::SimHash;

/// What kind of entity a search hit points at. Only song hits are eligible
/// for resolution; album and artist pages share titles with songs and would
/// otherwise shadow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Song,
    Other,
}

/// A search hit from the match source, compared against the query via fuzzy
/// digests and never persisted.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    /// Opaque identifier in the external service.
    pub id: String,
    pub title: String,
    pub artist: String,
    pub kind: CandidateKind,
}

/// Picks the best external candidate for a `(title, artist)` query.
///
/// The artist threshold is deliberately higher than the title threshold:
/// artist names vary little between sources, while titles accumulate remix,
/// live and "feat." suffixes.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyResolver {
    pub artist_threshold: i32,
    pub title_threshold: i32,
}

impl Default for FuzzyResolver {
    fn default() -> Self {
        Self {
            artist_threshold: 80,
            title_threshold: 50,
        }
    }
}

impl FuzzyResolver {
    pub fn new(artist_threshold: i32, title_threshold: i32) -> Self {
        Self {
            artist_threshold,
            title_threshold,
        }
    }

    /// Return the first candidate, in source order, that is a song and whose
    /// artist and title similarities both clear their thresholds. Source
    /// order is trusted as relevance order; there is no re-ranking by score.
    pub fn best<'a>(
        &self,
        title: &str,
        artist: &str,
        candidates: &'a [MatchCandidate],
    ) -> Option<&'a MatchCandidate> {
        // SimHash::calc lower-cases its input, so the comparison is
        // case-insensitive on both sides.
        let title_hash = SimHash::calc(title);
        let artist_hash = SimHash::calc(artist);

        candidates.iter().find(|candidate| {
            if candidate.kind != CandidateKind::Song {
                return false;
            }
            let artist_score = artist_hash.similarity(&SimHash::calc(&candidate.artist));
            let title_score = title_hash.similarity(&SimHash::calc(&candidate.title));
            artist_score > self.artist_threshold && title_score > self.title_threshold
        })
    }
}
