use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Monitoring priority assigned to a target by its organization.
/// Ordered so `priority >= Priority::High` reads naturally in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Competitor,
    Stakeholder,
    Topic,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Competitor => write!(f, "competitor"),
            TargetType::Stakeholder => write!(f, "stakeholder"),
            TargetType::Topic => write!(f, "topic"),
        }
    }
}

impl FromStr for TargetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "competitor" => Ok(TargetType::Competitor),
            "stakeholder" => Ok(TargetType::Stakeholder),
            "topic" => Ok(TargetType::Topic),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl std::fmt::Display for SentimentTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentTrend::Improving => write!(f, "improving"),
            SentimentTrend::Stable => write!(f, "stable"),
            SentimentTrend::Declining => write!(f, "declining"),
        }
    }
}

/// The six kinds of cross-target connection the engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    CompetitiveClash,
    MarketConvergence,
    SupplyChain,
    SharedRelationship,
    TimingCorrelation,
    TopicOverlap,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::CompetitiveClash => write!(f, "competitive_clash"),
            ConnectionType::MarketConvergence => write!(f, "market_convergence"),
            ConnectionType::SupplyChain => write!(f, "supply_chain"),
            ConnectionType::SharedRelationship => write!(f, "shared_relationship"),
            ConnectionType::TimingCorrelation => write!(f, "timing_correlation"),
            ConnectionType::TopicOverlap => write!(f, "topic_overlap"),
        }
    }
}

impl FromStr for ConnectionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "competitive_clash" => Ok(ConnectionType::CompetitiveClash),
            "market_convergence" => Ok(ConnectionType::MarketConvergence),
            "supply_chain" => Ok(ConnectionType::SupplyChain),
            "shared_relationship" => Ok(ConnectionType::SharedRelationship),
            "timing_correlation" => Ok(ConnectionType::TimingCorrelation),
            "topic_overlap" => Ok(ConnectionType::TopicOverlap),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Urgency::Low => write!(f, "low"),
            Urgency::Medium => write!(f, "medium"),
            Urgency::High => write!(f, "high"),
            Urgency::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImpactLevel::Low => write!(f, "low"),
            ImpactLevel::Medium => write!(f, "medium"),
            ImpactLevel::High => write!(f, "high"),
            ImpactLevel::Critical => write!(f, "critical"),
        }
    }
}

// --- Accumulated context ---

/// One named counterpart in a target's relationship map: who they deal with,
/// how, and how often it comes up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipProfile {
    #[serde(default)]
    pub relationship_types: Vec<String>,
    #[serde(default)]
    pub mention_count: u32,
    #[serde(default)]
    pub last_mentioned: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sentiment_avg: f64,
}

/// Activity rollup for one named region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionActivity {
    #[serde(default)]
    pub fact_count: u32,
    #[serde(default)]
    pub recent_facts: u32,
    #[serde(default)]
    pub dominant_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: DateTime<Utc>,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentSummary {
    #[serde(default)]
    pub current_score: f64,
    #[serde(default)]
    pub trend: SentimentTrend,
    #[serde(default)]
    pub history: Vec<SentimentPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub date: DateTime<Utc>,
    pub summary: String,
    pub fact_type: String,
    #[serde(default)]
    pub significance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextInsights {
    #[serde(default)]
    pub primary_activity: Option<String>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub notable_shift: Option<String>,
    #[serde(default)]
    pub risk_indicators: Vec<String>,
}

/// The rolled-up intelligence profile accumulated for one target by the
/// upstream collection pipelines. Read-only to this engine.
///
/// Map keys preserve the casing the extractors produced; overlap detection
/// compares them case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccumulatedContext {
    #[serde(default)]
    pub total_facts: u32,
    #[serde(default)]
    pub recent_facts: u32,
    /// Fact category → count.
    #[serde(default)]
    pub fact_types: HashMap<String, u32>,
    #[serde(default)]
    pub sentiment: SentimentSummary,
    /// Region name → activity rollup.
    #[serde(default)]
    pub geographic_activity: HashMap<String, RegionActivity>,
    /// Related-entity name → relationship profile.
    #[serde(default)]
    pub relationships: HashMap<String, RelationshipProfile>,
    /// Topic → mention count.
    #[serde(default)]
    pub topic_clusters: HashMap<String, u32>,
    #[serde(default)]
    pub recent_highlights: Vec<Highlight>,
    #[serde(default)]
    pub insights: ContextInsights,
}

// --- Target ---

/// A monitored entity. Owned by the profile store; this engine never
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub target_type: TargetType,
    pub priority: Priority,
    pub fact_count: u32,
    pub context: AccumulatedContext,
}

/// Free-text descriptive context for the organization that owns a set of
/// targets. Fed to the reasoner so connections land in the right industry
/// frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationContext {
    pub name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub description: String,
}

// --- Signal ---

/// A persisted, scored connection. One row per validated connection per
/// run; rows are never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub signal_type: String,
    pub signal_subtype: String,
    pub title: String,
    pub description: String,
    pub primary_target_id: Uuid,
    pub primary_target_name: String,
    pub related_target_ids: Vec<Uuid>,
    pub related_target_names: Vec<String>,
    /// round(strength × 100), so 0–100.
    pub confidence_score: u8,
    pub significance_score: u8,
    pub urgency: Urgency,
    pub impact_level: ImpactLevel,
    pub evidence: serde_json::Value,
    pub reasoning: String,
    pub pattern_data: serde_json::Value,
    pub business_implication: String,
    pub source_pipeline: String,
    pub status: String,
    pub detected_at: DateTime<Utc>,
}
