//! Record of `(file, aspect)` pairs already processed.
//!
//! The ledger is the termination mechanism of the traversal: every pair is
//! attempted at most once, so total work is bounded by files × aspects even when
//! the dependency graph has cycles.

use std::collections::{BTreeSet, HashMap};

use crate::core::types::Aspect;

#[derive(Debug, Clone, Default)]
pub struct AspectLedger {
    completed: HashMap<String, BTreeSet<Aspect>>,
}

impl AspectLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self, file: &str, aspect: Aspect) -> bool {
        self.completed
            .get(file)
            .is_some_and(|aspects| aspects.contains(&aspect))
    }

    /// Mark a pair complete. Returns `false` if it was already recorded.
    pub fn mark(&mut self, file: &str, aspect: Aspect) -> bool {
        self.completed
            .entry(file.to_string())
            .or_default()
            .insert(aspect)
    }

    pub fn aspects(&self, file: &str) -> Vec<Aspect> {
        self.completed
            .get(file)
            .map(|aspects| aspects.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Total number of completed pairs.
    pub fn len(&self) -> usize {
        self.completed.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_tracked_independently() {
        let mut ledger = AspectLedger::new();
        assert!(ledger.mark("a.ts", Aspect::Summary));
        assert!(ledger.is_complete("a.ts", Aspect::Summary));
        assert!(!ledger.is_complete("a.ts", Aspect::Full));
        assert!(!ledger.is_complete("b.ts", Aspect::Summary));
    }

    #[test]
    fn marking_twice_reports_duplicate() {
        let mut ledger = AspectLedger::new();
        assert!(ledger.mark("a.ts", Aspect::Summary));
        assert!(!ledger.mark("a.ts", Aspect::Summary));
        assert!(ledger.mark("a.ts", Aspect::Full));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.aspects("a.ts"), vec![Aspect::Summary, Aspect::Full]);
    }
}
