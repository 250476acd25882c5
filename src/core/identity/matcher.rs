// src/core/identity/matcher.rs
use tracing::{debug, warn};

use super::types::FaceDescriptor;

/// Distance under which two descriptors are considered the same face.
pub const DEFAULT_TOLERANCE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched { face_id: String, distance: f64 },
    /// Every usable candidate was compared; none was within tolerance.
    NoMatch { compared: usize },
    /// Nothing to compare against.
    NoCandidates,
}

/// First-match linear scan.
///
/// Candidates are visited in the order given (store order) and the first one
/// within tolerance wins, even if a later candidate is closer.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    tolerance: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl Matcher {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn is_match(&self, probe: &FaceDescriptor, candidate: &FaceDescriptor) -> bool {
        probe.len() == candidate.len() && probe.distance(candidate) < self.tolerance
    }

    pub fn find_first<I>(&self, probe: &FaceDescriptor, candidates: I) -> MatchOutcome
    where
        I: IntoIterator<Item = (String, FaceDescriptor)>,
    {
        let mut compared = 0;

        for (face_id, candidate) in candidates {
            if candidate.len() != probe.len() {
                warn!(
                    face_id = %face_id,
                    expected = probe.len(),
                    found = candidate.len(),
                    "Skipping template with mismatched dimensions"
                );
                continue;
            }

            compared += 1;
            let distance = probe.distance(&candidate);
            if distance < self.tolerance {
                debug!(face_id = %face_id, distance, compared, "Match found");
                return MatchOutcome::Matched { face_id, distance };
            }
        }

        if compared == 0 {
            MatchOutcome::NoCandidates
        } else {
            MatchOutcome::NoMatch { compared }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, values: &[f64]) -> (String, FaceDescriptor) {
        (id.to_string(), FaceDescriptor::new(values.to_vec()))
    }

    #[test]
    fn test_first_match_wins_over_closer_later_candidate() {
        let matcher = Matcher::default();
        let probe = FaceDescriptor::new(vec![0.0, 0.0]);

        let outcome = matcher.find_first(
            &probe,
            vec![
                candidate("far", &[5.0, 5.0]),
                candidate("near", &[0.5, 0.0]),
                candidate("exact", &[0.0, 0.0]),
            ],
        );

        match outcome {
            MatchOutcome::Matched { face_id, distance } => {
                assert_eq!(face_id, "near");
                assert!((distance - 0.5).abs() < 1e-12);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let matcher = Matcher::new(1.0);
        let probe = FaceDescriptor::new(vec![0.0]);
        assert!(!matcher.is_match(&probe, &FaceDescriptor::new(vec![1.0])));
        assert!(matcher.is_match(&probe, &FaceDescriptor::new(vec![0.999])));
    }

    #[test]
    fn test_no_candidates_is_distinct_from_no_match() {
        let matcher = Matcher::default();
        let probe = FaceDescriptor::new(vec![0.0, 0.0]);

        assert_eq!(matcher.find_first(&probe, Vec::new()), MatchOutcome::NoCandidates);
        assert_eq!(
            matcher.find_first(&probe, vec![candidate("a", &[3.0, 3.0])]),
            MatchOutcome::NoMatch { compared: 1 }
        );
    }

    #[test]
    fn test_mismatched_dimensions_are_skipped() {
        let matcher = Matcher::default();
        let probe = FaceDescriptor::new(vec![0.0, 0.0]);

        let outcome = matcher.find_first(
            &probe,
            vec![candidate("short", &[0.0]), candidate("ok", &[0.1, 0.1])],
        );
        assert!(matches!(outcome, MatchOutcome::Matched { ref face_id, .. } if face_id == "ok"));

        let outcome = matcher.find_first(&probe, vec![candidate("short", &[0.0])]);
        assert_eq!(outcome, MatchOutcome::NoCandidates);
    }
}
