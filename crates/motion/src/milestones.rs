//! Rep-count milestones (badges).
//!
//! Each tier is awarded at most once per tracker, the first time the
//! running total reaches it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Bronze,
    Silver,
    Gold,
}

/// Award `badge` once the total reaches `reps`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneTier {
    pub reps: u32,
    pub badge: Badge,
}

/// Bronze at 10, silver at 20, gold at 50 reps
pub fn default_tiers() -> Vec<MilestoneTier> {
    vec![
        MilestoneTier { reps: 10, badge: Badge::Bronze },
        MilestoneTier { reps: 20, badge: Badge::Silver },
        MilestoneTier { reps: 50, badge: Badge::Gold },
    ]
}

#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    tiers: Vec<MilestoneTier>,
    next: usize,
}

impl MilestoneTracker {
    pub fn new(mut tiers: Vec<MilestoneTier>) -> Self {
        tiers.sort_by_key(|tier| tier.reps);
        tiers.dedup_by_key(|tier| tier.reps);
        Self { tiers, next: 0 }
    }

    /// Report the highest tier newly reached at `total_reps`, if any.
    ///
    /// Lower tiers skipped over in the same call are consumed silently.
    pub fn reached(&mut self, total_reps: u32) -> Option<MilestoneTier> {
        let mut awarded = None;
        while let Some(tier) = self.tiers.get(self.next) {
            if tier.reps > total_reps {
                break;
            }
            awarded = Some(*tier);
            self.next += 1;
        }
        awarded
    }

    /// Tiers not yet awarded
    pub fn remaining(&self) -> &[MilestoneTier] {
        &self.tiers[self.next..]
    }
}

impl Default for MilestoneTracker {
    fn default() -> Self {
        Self::new(default_tiers())
    }
}
