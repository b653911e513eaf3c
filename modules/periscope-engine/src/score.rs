//! Deterministic significance scoring for validated connections.
//!
//! Pure functions of connection + target set only — no clock, no I/O — so
//! every scoring path is unit-testable.

use periscope_common::{ConnectionType, ImpactLevel, Priority, Target, Urgency};

use crate::validate::Connection;

/// Significance on a 0–100 scale: base 50, plus bonuses for connection
/// type, reasoner strength, involved-target priority, and shared-element
/// breadth.
pub fn significance(connection: &Connection, targets: &[Target]) -> u8 {
    let mut score: i32 = 50;

    score += match connection.connection_type {
        ConnectionType::CompetitiveClash => 20,
        ConnectionType::MarketConvergence | ConnectionType::SupplyChain => 15,
        ConnectionType::SharedRelationship | ConnectionType::TimingCorrelation => 10,
        ConnectionType::TopicOverlap => 5,
    };

    score += (connection.strength * 20.0).round() as i32;

    let high_priority_involved = targets
        .iter()
        .filter(|t| connection.target_ids.contains(&t.id))
        .any(|t| t.priority >= Priority::High);
    if high_priority_involved {
        score += 15;
    }

    score += (2 * connection.shared_elements.len() as i32).min(10);

    score.clamp(0, 100) as u8
}

/// Urgency ladder derived from significance.
pub fn urgency_for(significance: u8) -> Urgency {
    if significance >= 90 {
        Urgency::Critical
    } else if significance >= 75 {
        Urgency::High
    } else if significance >= 50 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Impact from reasoner strength, bumped one level when a critical-priority
/// target is involved.
pub fn impact_for(connection: &Connection, targets: &[Target]) -> ImpactLevel {
    let base = if connection.strength >= 0.8 {
        ImpactLevel::High
    } else if connection.strength >= 0.5 {
        ImpactLevel::Medium
    } else {
        ImpactLevel::Low
    };

    let critical_involved = targets
        .iter()
        .filter(|t| connection.target_ids.contains(&t.id))
        .any(|t| t.priority == Priority::Critical);

    if critical_involved {
        match base {
            ImpactLevel::Low => ImpactLevel::Medium,
            ImpactLevel::Medium => ImpactLevel::High,
            ImpactLevel::High | ImpactLevel::Critical => ImpactLevel::Critical,
        }
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{target_with_context, TestContext};
    use periscope_common::ConnectionType;

    fn connection(
        connection_type: ConnectionType,
        targets: &[Target],
        strength: f64,
        shared: usize,
    ) -> Connection {
        Connection {
            connection_type,
            title: "test".to_string(),
            targets_involved: targets.iter().map(|t| t.name.clone()).collect(),
            target_ids: targets.iter().map(|t| t.id).collect(),
            shared_elements: (0..shared).map(|i| format!("e{i}")).collect(),
            description: String::new(),
            evidence: Vec::new(),
            strength,
            business_implication: String::new(),
        }
    }

    #[test]
    fn worked_example_scores_91() {
        // Acme (high) + Globex (medium), shared_relationship, strength 0.7,
        // one shared element: 50 + 10 + 14 + 15 + 2 = 91.
        let targets = vec![
            target_with_context("Acme", Priority::High, TestContext::new().relationship("Foo")),
            target_with_context(
                "Globex",
                Priority::Medium,
                TestContext::new().relationship("Foo"),
            ),
        ];
        let conn = connection(ConnectionType::SharedRelationship, &targets, 0.7, 1);
        assert_eq!(significance(&conn, &targets), 91);
    }

    #[test]
    fn score_stays_within_bounds_across_extremes() {
        let targets = vec![
            target_with_context("A", Priority::Critical, TestContext::new()),
            target_with_context("B", Priority::Critical, TestContext::new()),
        ];
        // Maximum everything: 50 + 20 + 19 + 15 + 10 = 114 → clamped to 100.
        let max = connection(ConnectionType::CompetitiveClash, &targets, 0.95, 40);
        assert_eq!(significance(&max, &targets), 100);

        let low_targets = vec![
            target_with_context("A", Priority::Low, TestContext::new()),
            target_with_context("B", Priority::Low, TestContext::new()),
        ];
        let min = connection(ConnectionType::TopicOverlap, &low_targets, 0.1, 0);
        // 50 + 5 + 2 = 57; always within [0, 100].
        assert_eq!(significance(&min, &low_targets), 57);
    }

    #[test]
    fn per_type_bonuses_are_distinct() {
        let targets = vec![
            target_with_context("A", Priority::Low, TestContext::new()),
            target_with_context("B", Priority::Low, TestContext::new()),
        ];
        let score_of = |ct| {
            let conn = connection(ct, &targets, 0.5, 0);
            significance(&conn, &targets)
        };
        // Base 50 + strength 10 = 60, plus the type bonus.
        assert_eq!(score_of(ConnectionType::CompetitiveClash), 80);
        assert_eq!(score_of(ConnectionType::MarketConvergence), 75);
        assert_eq!(score_of(ConnectionType::SupplyChain), 75);
        assert_eq!(score_of(ConnectionType::SharedRelationship), 70);
        assert_eq!(score_of(ConnectionType::TimingCorrelation), 70);
        assert_eq!(score_of(ConnectionType::TopicOverlap), 65);
    }

    #[test]
    fn priority_bonus_requires_an_involved_target() {
        let involved = vec![
            target_with_context("A", Priority::Low, TestContext::new()),
            target_with_context("B", Priority::Low, TestContext::new()),
        ];
        // A critical-priority bystander not named in the connection must not
        // contribute the bonus.
        let mut all = involved.clone();
        all.push(target_with_context("C", Priority::Critical, TestContext::new()));

        let conn = connection(ConnectionType::TopicOverlap, &involved, 0.5, 0);
        assert_eq!(significance(&conn, &all), 65);
    }

    #[test]
    fn shared_element_bonus_caps_at_ten() {
        let targets = vec![
            target_with_context("A", Priority::Low, TestContext::new()),
            target_with_context("B", Priority::Low, TestContext::new()),
        ];
        let five = connection(ConnectionType::TopicOverlap, &targets, 0.5, 5);
        let fifty = connection(ConnectionType::TopicOverlap, &targets, 0.5, 50);
        assert_eq!(significance(&five, &targets), significance(&fifty, &targets));
    }

    #[test]
    fn urgency_ladder() {
        assert_eq!(urgency_for(100), Urgency::Critical);
        assert_eq!(urgency_for(90), Urgency::Critical);
        assert_eq!(urgency_for(89), Urgency::High);
        assert_eq!(urgency_for(75), Urgency::High);
        assert_eq!(urgency_for(74), Urgency::Medium);
        assert_eq!(urgency_for(50), Urgency::Medium);
        assert_eq!(urgency_for(49), Urgency::Low);
        assert_eq!(urgency_for(0), Urgency::Low);
    }

    #[test]
    fn impact_follows_strength_and_bumps_on_critical() {
        let normal = vec![
            target_with_context("A", Priority::High, TestContext::new()),
            target_with_context("B", Priority::Medium, TestContext::new()),
        ];
        let critical = vec![
            target_with_context("A", Priority::Critical, TestContext::new()),
            target_with_context("B", Priority::Medium, TestContext::new()),
        ];

        let weak = connection(ConnectionType::TopicOverlap, &normal, 0.3, 0);
        assert_eq!(impact_for(&weak, &normal), ImpactLevel::Low);

        let mid = connection(ConnectionType::TopicOverlap, &normal, 0.6, 0);
        assert_eq!(impact_for(&mid, &normal), ImpactLevel::Medium);

        let strong = connection(ConnectionType::TopicOverlap, &normal, 0.9, 0);
        assert_eq!(impact_for(&strong, &normal), ImpactLevel::High);

        let strong_critical = connection(ConnectionType::TopicOverlap, &critical, 0.9, 0);
        assert_eq!(impact_for(&strong_critical, &critical), ImpactLevel::Critical);

        let mid_critical = connection(ConnectionType::TopicOverlap, &critical, 0.6, 0);
        assert_eq!(impact_for(&mid_critical, &critical), ImpactLevel::High);
    }
}
