//! Defense-in-depth validation of reasoner output.
//!
//! The reasoning engine is non-deterministic and will occasionally invent
//! target names, omit fields, or emit strengths outside any sane range.
//! Candidates failing structural checks are dropped silently — this is
//! containment, not error reporting.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use uuid::Uuid;

use periscope_common::{ConnectionType, Target};

use crate::reasoner::RawConnection;

/// A candidate that survived validation: every name resolved, strength in
/// range, type recognized.
#[derive(Debug, Clone)]
pub struct Connection {
    pub connection_type: ConnectionType,
    pub title: String,
    pub targets_involved: Vec<String>,
    pub target_ids: Vec<Uuid>,
    pub shared_elements: Vec<String>,
    pub description: String,
    pub evidence: Vec<String>,
    pub strength: f64,
    pub business_implication: String,
}

/// Validate raw candidates against the known target set.
pub fn validate(raw: Vec<RawConnection>, targets: &[Target]) -> Vec<Connection> {
    // Exact name match only — no fuzzy resolution of hallucinated names.
    let by_name: HashMap<&str, Uuid> = targets.iter().map(|t| (t.name.as_str(), t.id)).collect();

    raw.into_iter()
        .filter_map(|candidate| validate_one(candidate, &by_name))
        .collect()
}

fn validate_one(raw: RawConnection, by_name: &HashMap<&str, Uuid>) -> Option<Connection> {
    let Some(type_str) = raw.connection_type.as_deref() else {
        debug!("Candidate dropped: missing connection_type");
        return None;
    };
    let Ok(connection_type) = type_str.parse::<ConnectionType>() else {
        debug!(connection_type = type_str, "Candidate dropped: unknown connection_type");
        return None;
    };
    let Some(title) = raw.title.filter(|t| !t.trim().is_empty()) else {
        debug!("Candidate dropped: missing title");
        return None;
    };

    // At least two distinct names, order-preserving dedup.
    let mut seen = HashSet::new();
    let names: Vec<String> = raw
        .targets_involved
        .into_iter()
        .filter(|n| seen.insert(n.clone()))
        .collect();
    if names.len() < 2 {
        debug!(title = title.as_str(), "Candidate dropped: fewer than 2 distinct targets");
        return None;
    }

    let mut target_ids = Vec::with_capacity(names.len());
    for name in &names {
        match by_name.get(name.as_str()) {
            Some(id) => target_ids.push(*id),
            None => {
                debug!(
                    title = title.as_str(),
                    target = name.as_str(),
                    "Candidate dropped: names unknown target"
                );
                return None;
            }
        }
    }

    Some(Connection {
        connection_type,
        title,
        targets_involved: names,
        target_ids,
        shared_elements: raw.shared_elements,
        description: raw.description,
        evidence: raw.evidence,
        strength: clamp_strength(raw.strength),
        business_implication: raw.business_implication,
    })
}

/// Absent or non-finite strength falls back to 0.5; finite values are
/// clamped into [0.1, 0.95].
fn clamp_strength(raw: Option<f64>) -> f64 {
    match raw {
        Some(s) if s.is_finite() => s.clamp(0.1, 0.95),
        _ => 0.5,
    }
}
