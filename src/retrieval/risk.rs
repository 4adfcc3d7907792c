//! Legal risk assessment model.
//!
//! The generator's reply is free-form text that should contain a JSON
//! object. It is parsed once, here, into a loosely typed shape and then
//! normalised into [`LegalDocumentRiskAssessment`]. Consumers never see
//! missing fields or out-of-range scores.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terms whose presence marks a document as a candidate for assessment.
pub const LEGAL_TERMS: &[&str] = &[
    "agreement",
    "contract",
    "clause",
    "party",
    "obligation",
    "liability",
    "indemnification",
    "warranty",
    "termination",
    "confidentiality",
    "intellectual property",
    "governing law",
    "jurisdiction",
    "arbitration",
    "dispute resolution",
];

/// Clause summaries included in a [`RiskSummary`].
const SUMMARY_CLAUSE_LIMIT: usize = 10;
const EXPLANATION_PREVIEW_CHARS: usize = 150;
const CLAUSE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl FromStr for RiskLevel {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(AssessmentError::InvalidRiskLevel(s.to_string())),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssessmentError {
    #[error("no JSON object found in the response")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid risk level '{0}'")]
    InvalidRiskLevel(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseRiskAssessment {
    pub clause_text: String,
    pub risk_level: RiskLevel,
    /// Always within [0, 1]
    pub confidence_score: f64,
    pub reasoning: String,
    pub potential_issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalDocumentRiskAssessment {
    pub document_name: String,
    pub overall_risk_level: RiskLevel,
    pub high_risk_clauses: usize,
    pub medium_risk_clauses: usize,
    pub low_risk_clauses: usize,
    pub clause_assessments: Vec<ClauseRiskAssessment>,
    pub summary: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAssessment {
    document_name: Option<String>,
    overall_risk_level: Option<String>,
    high_risk_clauses: Option<usize>,
    medium_risk_clauses: Option<usize>,
    low_risk_clauses: Option<usize>,
    #[serde(default)]
    clause_assessments: Vec<RawClause>,
    summary: Option<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawClause {
    clause_text: Option<String>,
    risk_level: Option<String>,
    confidence_score: Option<f64>,
    reasoning: Option<String>,
    #[serde(default)]
    potential_issues: Vec<String>,
}

impl RawClause {
    fn normalise(self) -> Result<ClauseRiskAssessment, AssessmentError> {
        let clause_text = self
            .clause_text
            .ok_or(AssessmentError::MissingField("clause_text"))?;
        let risk_level = self
            .risk_level
            .ok_or(AssessmentError::MissingField("risk_level"))?
            .parse()?;
        let confidence_score = self
            .confidence_score
            .filter(|score| score.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);

        Ok(ClauseRiskAssessment {
            clause_text,
            risk_level,
            confidence_score,
            reasoning: self.reasoning.unwrap_or_default(),
            potential_issues: self.potential_issues,
        })
    }
}

impl LegalDocumentRiskAssessment {
    /// Parse a generator reply for `requested_name`.
    pub fn parse(response: &str, requested_name: &str) -> Result<Self, AssessmentError> {
        let json = extract_json_object(response).ok_or(AssessmentError::NoJson)?;
        let raw: RawAssessment =
            serde_json::from_str(json).map_err(|e| AssessmentError::InvalidJson(e.to_string()))?;

        let overall_risk_level = raw
            .overall_risk_level
            .ok_or(AssessmentError::MissingField("overall_risk_level"))?
            .parse()?;

        let clause_assessments = raw
            .clause_assessments
            .into_iter()
            .map(RawClause::normalise)
            .collect::<Result<Vec<_>, _>>()?;

        let count = |level: RiskLevel| {
            clause_assessments
                .iter()
                .filter(|clause| clause.risk_level == level)
                .count()
        };

        Ok(Self {
            document_name: raw
                .document_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| requested_name.to_string()),
            overall_risk_level,
            high_risk_clauses: raw
                .high_risk_clauses
                .unwrap_or_else(|| count(RiskLevel::High)),
            medium_risk_clauses: raw
                .medium_risk_clauses
                .unwrap_or_else(|| count(RiskLevel::Medium)),
            low_risk_clauses: raw
                .low_risk_clauses
                .unwrap_or_else(|| count(RiskLevel::Low)),
            clause_assessments,
            summary: raw.summary.unwrap_or_default(),
            recommendations: raw.recommendations,
        })
    }
}

/// Slice from the first `{` to the last `}`, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Whether `text` mentions any term from [`LEGAL_TERMS`], ignoring case.
pub fn looks_like_legal_document(text: &str) -> bool {
    let lowered = text.to_lowercase();
    LEGAL_TERMS.iter().any(|term| lowered.contains(term))
}

/// Condensed view of an assessment for API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub overall_risk_level: RiskLevel,
    pub high_risk_clauses: usize,
    pub medium_risk_clauses: usize,
    pub low_risk_clauses: usize,
    pub total_clauses_assessed: usize,
    pub clause_summaries: Vec<ClauseSummary>,
    pub has_more_clauses: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseSummary {
    /// 1-based position in the assessment
    pub clause_number: usize,
    pub risk_level: RiskLevel,
    pub confidence_score: f64,
    pub brief_explanation: String,
    pub clause_preview: String,
}

impl From<&LegalDocumentRiskAssessment> for RiskSummary {
    fn from(assessment: &LegalDocumentRiskAssessment) -> Self {
        let clauses = &assessment.clause_assessments;
        let clause_summaries = clauses
            .iter()
            .take(SUMMARY_CLAUSE_LIMIT)
            .enumerate()
            .map(|(i, clause)| ClauseSummary {
                clause_number: i + 1,
                risk_level: clause.risk_level,
                confidence_score: (clause.confidence_score * 100.0).round() / 100.0,
                brief_explanation: preview(&clause.reasoning, EXPLANATION_PREVIEW_CHARS),
                clause_preview: preview(&clause.clause_text, CLAUSE_PREVIEW_CHARS),
            })
            .collect();

        Self {
            overall_risk_level: assessment.overall_risk_level,
            high_risk_clauses: assessment.high_risk_clauses,
            medium_risk_clauses: assessment.medium_risk_clauses,
            low_risk_clauses: assessment.low_risk_clauses,
            total_clauses_assessed: clauses.len(),
            clause_summaries,
            has_more_clauses: clauses.len() > SUMMARY_CLAUSE_LIMIT,
        }
    }
}

/// First `max_chars` characters, with "..." appended when cut.
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
