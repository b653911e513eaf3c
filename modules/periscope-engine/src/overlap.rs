//! Pairwise overlap detection over accumulated contexts.
//!
//! Pure and deterministic: the same context snapshots always produce the
//! same overlaps. Results are computed fresh on every run and never cached —
//! contexts may have changed between runs.

use std::collections::HashSet;

use uuid::Uuid;

use periscope_common::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlapKind {
    Relationship,
    Geographic,
    Topic,
}

impl std::fmt::Display for OverlapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlapKind::Relationship => write!(f, "relationship"),
            OverlapKind::Geographic => write!(f, "geographic"),
            OverlapKind::Topic => write!(f, "topic"),
        }
    }
}

/// A shared element set between one pair of targets. Ephemeral — never
/// persisted. Pair order preserves the input target order.
#[derive(Debug, Clone)]
pub struct Overlap {
    pub target_a: Uuid,
    pub target_b: Uuid,
    pub kind: OverlapKind,
    pub shared_elements: Vec<String>,
}

/// All overlaps for one run, grouped by class.
#[derive(Debug, Clone, Default)]
pub struct OverlapSet {
    pub relationship: Vec<Overlap>,
    pub geographic: Vec<Overlap>,
    pub topic: Vec<Overlap>,
}

impl OverlapSet {
    pub fn is_empty(&self) -> bool {
        self.relationship.is_empty() && self.geographic.is_empty() && self.topic.is_empty()
    }

    pub fn total(&self) -> usize {
        self.relationship.len() + self.geographic.len() + self.topic.len()
    }
}

/// Compute relationship, geographic, and topic overlaps for every unordered
/// target pair. O(n²·k) over n targets with average map size k.
pub fn detect_overlaps(targets: &[Target]) -> OverlapSet {
    let mut set = OverlapSet::default();

    for i in 0..targets.len() {
        for j in (i + 1)..targets.len() {
            let a = &targets[i];
            let b = &targets[j];

            let shared = shared_keys(
                a.context.relationships.keys(),
                b.context.relationships.keys(),
            );
            if !shared.is_empty() {
                set.relationship.push(Overlap {
                    target_a: a.id,
                    target_b: b.id,
                    kind: OverlapKind::Relationship,
                    shared_elements: shared,
                });
            }

            let shared = shared_keys(
                a.context.geographic_activity.keys(),
                b.context.geographic_activity.keys(),
            );
            if !shared.is_empty() {
                set.geographic.push(Overlap {
                    target_a: a.id,
                    target_b: b.id,
                    kind: OverlapKind::Geographic,
                    shared_elements: shared,
                });
            }

            let shared = shared_keys(
                a.context.topic_clusters.keys(),
                b.context.topic_clusters.keys(),
            );
            if !shared.is_empty() {
                set.topic.push(Overlap {
                    target_a: a.id,
                    target_b: b.id,
                    kind: OverlapKind::Topic,
                    shared_elements: shared,
                });
            }
        }
    }

    set
}

/// Case-insensitive key intersection. Keeps the first iterator's original
/// casing, sorted for reproducible fixtures.
fn shared_keys<'a>(
    a: impl Iterator<Item = &'a String>,
    b: impl Iterator<Item = &'a String>,
) -> Vec<String> {
    let b_lower: HashSet<String> = b.map(|k| k.to_lowercase()).collect();
    let mut shared: Vec<String> = a
        .filter(|k| b_lower.contains(&k.to_lowercase()))
        .cloned()
        .collect();
    shared.sort();
    shared
}
