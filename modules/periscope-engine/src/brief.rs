//! Brief construction for the reasoning call.
//!
//! Pure string building, separated from I/O so it can be tested without a
//! network. Every per-target section is bounded (top-5 items per category,
//! truncated summaries) so the prompt does not grow with profile size.

use std::collections::HashMap;

use uuid::Uuid;

use ai_client::util::truncate_to_char_boundary;
use periscope_common::{OrganizationContext, Target};

use crate::overlap::{Overlap, OverlapSet};

pub(crate) const TOP_ITEMS_PER_CATEGORY: usize = 5;
const MAX_HIGHLIGHTS: usize = 3;
const MAX_SUMMARY_BYTES: usize = 240;

/// Assemble the full user prompt: organization frame, bounded per-target
/// briefs, overlap hints, task framing.
pub fn build_reasoning_prompt(
    targets: &[Target],
    organization: &OrganizationContext,
    overlaps: &OverlapSet,
) -> String {
    let briefs: Vec<String> = targets.iter().map(target_brief).collect();

    format!(
        "Organization: {} ({})\n{}\n\nMONITORED TARGETS:\n{}\n\nOVERLAP HINTS \
         (already known — a connection that merely restates one of these is worthless):\n{}\n\n\
         Propose the non-obvious, forward-looking connections between these targets.",
        organization.name,
        if organization.industry.is_empty() {
            "industry unknown"
        } else {
            organization.industry.as_str()
        },
        truncate_to_char_boundary(&organization.description, 600),
        briefs.join("\n"),
        overlap_hints(overlaps, targets),
    )
}

/// One bounded section per target: identity line, sentiment, top
/// relationships/regions/topics, recent highlights, analyst read.
pub(crate) fn target_brief(target: &Target) -> String {
    let ctx = &target.context;
    let mut lines = vec![format!(
        "### {} ({}, priority {}, {} facts, {} recent)",
        target.name, target.target_type, target.priority, ctx.total_facts, ctx.recent_facts,
    )];

    lines.push(format!(
        "Sentiment: {:.2} ({})",
        ctx.sentiment.current_score, ctx.sentiment.trend,
    ));

    let mut relationships: Vec<_> = ctx.relationships.iter().collect();
    relationships.sort_by(|a, b| b.1.mention_count.cmp(&a.1.mention_count).then(a.0.cmp(b.0)));
    if !relationships.is_empty() {
        let rendered: Vec<String> = relationships
            .iter()
            .take(TOP_ITEMS_PER_CATEGORY)
            .map(|(name, profile)| {
                if profile.relationship_types.is_empty() {
                    format!("{} ({} mentions)", name, profile.mention_count)
                } else {
                    format!(
                        "{} ({}, {} mentions)",
                        name,
                        profile.relationship_types.join("/"),
                        profile.mention_count,
                    )
                }
            })
            .collect();
        lines.push(format!("Relationships: {}", rendered.join("; ")));
    }

    let mut regions: Vec<_> = ctx.geographic_activity.iter().collect();
    regions.sort_by(|a, b| b.1.fact_count.cmp(&a.1.fact_count).then(a.0.cmp(b.0)));
    if !regions.is_empty() {
        let rendered: Vec<String> = regions
            .iter()
            .take(TOP_ITEMS_PER_CATEGORY)
            .map(|(name, activity)| match &activity.dominant_type {
                Some(dominant) => {
                    format!("{} ({} facts, mostly {})", name, activity.fact_count, dominant)
                }
                None => format!("{} ({} facts)", name, activity.fact_count),
            })
            .collect();
        lines.push(format!("Regions: {}", rendered.join("; ")));
    }

    let mut topics: Vec<_> = ctx.topic_clusters.iter().collect();
    topics.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    if !topics.is_empty() {
        let rendered: Vec<String> = topics
            .iter()
            .take(TOP_ITEMS_PER_CATEGORY)
            .map(|(topic, count)| format!("{topic} ({count})"))
            .collect();
        lines.push(format!("Topics: {}", rendered.join("; ")));
    }

    for highlight in ctx.recent_highlights.iter().take(MAX_HIGHLIGHTS) {
        lines.push(format!(
            "Recent: [{}] {} ({})",
            highlight.date.format("%Y-%m-%d"),
            truncate_to_char_boundary(&highlight.summary, MAX_SUMMARY_BYTES),
            highlight.fact_type,
        ));
    }

    let mut read_parts = Vec::new();
    if let Some(activity) = &ctx.insights.primary_activity {
        read_parts.push(activity.clone());
    }
    if let Some(shift) = &ctx.insights.notable_shift {
        read_parts.push(format!("shift: {shift}"));
    }
    if !ctx.insights.risk_indicators.is_empty() {
        read_parts.push(format!("risks: {}", ctx.insights.risk_indicators.join(", ")));
    }
    if !read_parts.is_empty() {
        lines.push(format!("Read: {}", read_parts.join("; ")));
    }

    lines.join("\n")
}

/// Render pre-computed overlaps as compact hint lines rather than raw data
/// dumps, keeping the hallucination surface small.
pub(crate) fn overlap_hints(overlaps: &OverlapSet, targets: &[Target]) -> String {
    if overlaps.is_empty() {
        return "None detected.".to_string();
    }

    let names: HashMap<Uuid, &str> = targets.iter().map(|t| (t.id, t.name.as_str())).collect();

    let mut lines = Vec::with_capacity(overlaps.total());
    for overlap in overlaps
        .relationship
        .iter()
        .chain(&overlaps.geographic)
        .chain(&overlaps.topic)
    {
        lines.push(hint_line(overlap, &names));
    }
    lines.join("\n")
}

fn hint_line(overlap: &Overlap, names: &HashMap<Uuid, &str>) -> String {
    format!(
        "- shared {}: {} + {} -> {}",
        overlap.kind,
        names.get(&overlap.target_a).unwrap_or(&"?"),
        names.get(&overlap.target_b).unwrap_or(&"?"),
        overlap.shared_elements.join(", "),
    )
}
