//! Retrieval-augmented answering and document risk assessment.

pub mod generation;
pub mod orchestrator;
pub mod risk;

pub use generation::{GenerationError, OpenAiChatGenerator, TextGenerator};
pub use orchestrator::{
    Answer, CONTEXT_SEPARATOR, INSUFFICIENT_CONTEXT_MESSAGE, RetrievalError,
    RetrievalOrchestrator, Source, build_context,
};
pub use risk::{
    AssessmentError, ClauseRiskAssessment, ClauseSummary, LegalDocumentRiskAssessment,
    RiskLevel, RiskSummary, looks_like_legal_document,
};
