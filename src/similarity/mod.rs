//! Near-duplicate title detection
//!
//! A lexical set heuristic, not semantic search: titles are normalized to
//! whitespace token sets and compared with Jaccard similarity. Scans the
//! full corpus linearly, which is fine at internal-knowledge-base scale.

use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Default similarity threshold for the duplicate gate (0.0–1.0).
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// A corpus entry the detector compares against.
#[derive(Debug, Clone)]
pub struct CorpusTitle {
    pub document_id: Uuid,
    pub slug: String,
    pub title: String,
}

/// A corpus title that scored at or above the threshold.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarCandidate {
    pub document_id: Uuid,
    pub slug: String,
    pub title: String,
    pub similarity_percent: u8,
}

fn token_set(title: &str) -> HashSet<String> {
    title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// Jaccard similarity of two titles as an integer percent in [0, 100].
pub fn similarity_percent(a: &str, b: &str) -> u8 {
    let set_a = token_set(a);
    let set_b = token_set(b);

    if set_a.is_empty() && set_b.is_empty() {
        return 100;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0;
    }

    ((intersection as f64 / union as f64) * 100.0).round() as u8
}

/// Rank corpus titles by similarity to the candidate.
///
/// Entries below `threshold` (a 0.0–1.0 fraction) are dropped; the rest
/// are sorted descending by score with ties keeping corpus order.
pub fn find_similar(
    candidate: &str,
    corpus: &[CorpusTitle],
    threshold: f64,
) -> Vec<SimilarCandidate> {
    let cutoff = (threshold * 100.0).round() as u8;

    let mut matches: Vec<SimilarCandidate> = corpus
        .iter()
        .filter_map(|entry| {
            let score = similarity_percent(candidate, &entry.title);
            if score >= cutoff {
                Some(SimilarCandidate {
                    document_id: entry.document_id,
                    slug: entry.slug.clone(),
                    title: entry.title.clone(),
                    similarity_percent: score,
                })
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|a, b| b.similarity_percent.cmp(&a.similarity_percent));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(titles: &[&str]) -> Vec<CorpusTitle> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| CorpusTitle {
                document_id: Uuid::new_v4(),
                slug: format!("kb-test-{}", i),
                title: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_identical_titles_score_100() {
        assert_eq!(similarity_percent("Intro to Rust", "Intro to Rust"), 100);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(similarity_percent("Intro to Rust", "  intro TO rust "), 100);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ("Intro to Rust", "Advanced Rust"),
            ("GDPR handbook", "GDPR handbook v2"),
            ("", "Something"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity_percent(a, b), similarity_percent(b, a));
        }
    }

    #[test]
    fn test_disjoint_titles_score_0() {
        assert_eq!(similarity_percent("alpha beta", "gamma delta"), 0);
    }

    #[test]
    fn test_empty_candidate_never_matches_nonempty() {
        assert_eq!(similarity_percent("", "Intro to Rust"), 0);
        let results = find_similar("", &corpus(&["Intro to Rust"]), DEFAULT_THRESHOLD);
        assert!(results.is_empty());
    }

    #[test]
    fn test_partial_overlap() {
        // {intro, to, rust} vs {intro, to, go}: 2 shared of 4 total
        assert_eq!(similarity_percent("Intro to Rust", "Intro to Go"), 50);
    }

    #[test]
    fn test_threshold_gate() {
        let corpus = corpus(&["Intro to Rust", "Intro to Go", "Unrelated"]);
        let results = find_similar("intro to rust", &corpus, 0.8);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Intro to Rust");
        assert_eq!(results[0].similarity_percent, 100);
    }

    #[test]
    fn test_results_sorted_descending() {
        let corpus = corpus(&["intro to rust basics", "intro to rust"]);
        let results = find_similar("intro to rust", &corpus, 0.5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].similarity_percent, 100);
        assert!(results[0].similarity_percent >= results[1].similarity_percent);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let corpus = corpus(&["intro to rust", "INTRO TO RUST"]);
        let results = find_similar("intro to rust", &corpus, 0.8);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "intro to rust");
        assert_eq!(results[1].title, "INTRO TO RUST");
    }

    #[test]
    fn test_scores_within_bounds() {
        let cases = [
            ("a b c", "a b c d"),
            ("one", "one two three four five"),
            ("x", "x"),
        ];
        for (a, b) in cases {
            let score = similarity_percent(a, b);
            assert!(score <= 100);
        }
    }
}
