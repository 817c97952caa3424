//! Uniqueness Tracker
//!
//! The set of accepted, bypass-stripped DNA keys. It only grows for the
//! duration of a run.

use std::collections::HashSet;

use super::filter_dna_options;

#[derive(Debug, Clone, Default)]
pub struct UniquenessTracker {
    keys: HashSet<String>,
}

impl UniquenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no accepted DNA shares this DNA's bypass-stripped key.
    pub fn is_unique(&self, dna: &str) -> bool {
        !self.keys.contains(&filter_dna_options(dna))
    }

    /// Record an accepted DNA. Returns false if its key was already present.
    pub fn commit(&mut self, dna: &str) -> bool {
        self.keys.insert(filter_dna_options(dna))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_then_duplicate() {
        let mut tracker = UniquenessTracker::new();
        assert!(tracker.is_unique("0:a.png-1:b.png"));
        assert!(tracker.commit("0:a.png-1:b.png"));
        assert!(!tracker.is_unique("0:a.png-1:b.png"));
        assert!(!tracker.commit("0:a.png-1:b.png"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_bypassed_layers_do_not_distinguish() {
        let mut tracker = UniquenessTracker::new();
        tracker.commit("0:a.png-1:eyes.png?bypassDNA=true");
        assert!(!tracker.is_unique("0:a.png-2:other.png?bypassDNA=true"));
        assert!(tracker.is_unique("1:z.png-1:eyes.png?bypassDNA=true"));
    }

    #[test]
    fn test_new_is_empty() {
        assert!(UniquenessTracker::new().is_empty());
    }
}
