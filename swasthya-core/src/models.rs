//! Render-ready view models, one per data domain.
//!
//! Field names serialize in camelCase so a browser client sees the same
//! shape the remote service speaks.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentActivity {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub status: AgentActivity,
    pub predictive_agent: String,
    pub operations_agent: String,
    pub coordination_agent: String,
}

impl AgentView {
    pub fn is_active(&self) -> bool {
        self.status == AgentActivity::Active
    }
}

/// Surge risk level. Values outside the three known levels are kept verbatim
/// so a newer server never breaks derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Other(String),
}

impl RiskLevel {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "LOW" => RiskLevel::Low,
            "MEDIUM" => RiskLevel::Medium,
            "HIGH" => RiskLevel::High,
            other => RiskLevel::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Other(raw) => raw,
        }
    }

    /// `None` for unknown levels; presentation picks its fallback styling.
    pub fn severity_rank(&self) -> Option<u8> {
        match self {
            RiskLevel::Low => Some(0),
            RiskLevel::Medium => Some(1),
            RiskLevel::High => Some(2),
            RiskLevel::Other(_) => None,
        }
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Two-segment gauge: `filled + remainder == 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GaugePair {
    pub filled: u8,
    pub remainder: u8,
}

impl GaugePair {
    pub fn from_score(score: i64) -> Self {
        let filled = score.clamp(0, 100) as u8;
        Self { filled, remainder: 100 - filled }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionView {
    pub risk_level: RiskLevel,
    pub risk_score: i64,
    pub predicted_surge: f64,       // percent
    pub recommended_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<i64>,
    pub gauge: GaugePair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisView {
    pub crisis: String,
    pub affected_hospitals: u64,
    pub estimated_patients: u64,
    pub auto_actions: Vec<String>,  // server order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
}

/// Server-classified facility status, never recomputed client side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HospitalStatus {
    Normal,
    Moderate,
    Critical,
    Other(String),
}

impl HospitalStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "NORMAL" => HospitalStatus::Normal,
            "MODERATE" => HospitalStatus::Moderate,
            "CRITICAL" => HospitalStatus::Critical,
            other => HospitalStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HospitalStatus::Normal => "NORMAL",
            HospitalStatus::Moderate => "MODERATE",
            HospitalStatus::Critical => "CRITICAL",
            HospitalStatus::Other(raw) => raw,
        }
    }

    pub fn severity_rank(&self) -> Option<u8> {
        match self {
            HospitalStatus::Normal => Some(0),
            HospitalStatus::Moderate => Some(1),
            HospitalStatus::Critical => Some(2),
            HospitalStatus::Other(_) => None,
        }
    }
}

impl Serialize for HospitalStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalView {
    pub name: String,
    pub status: HospitalStatus,
    pub total_beds: u32,
    pub available_beds: u32,
    pub occupancy_percent: Option<u8>,  // absent when total_beds == 0
    pub severity_rank: Option<u8>,
}

/// Hospital list in server order.
pub type HospitalsView = Vec<HospitalView>;
