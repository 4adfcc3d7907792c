//! Query answering over the live index.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::generation::{GenerationError, TextGenerator};
use super::risk::{AssessmentError, LegalDocumentRiskAssessment};
use crate::config::RetrievalConfig;
use crate::vector::{
    EmbeddingError, EmbeddingGenerator, IndexError, IndexHandle, SearchHit, embed_query,
};

/// Separator placed between context chunks.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Reply used when no context could be retrieved.
pub const INSUFFICIENT_CONTEXT_MESSAGE: &str =
    "I don't have enough information to answer your question based on the available documents.";

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("No document found with name: {0}")]
    DocumentNotFound(String),

    #[error("Malformed risk assessment: {0}")]
    MalformedAssessment(#[from] AssessmentError),
}

/// Where a piece of context came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub document_name: String,
    pub chunk_index: usize,
    pub similarity: f32,
}

impl From<&SearchHit> for Source {
    fn from(hit: &SearchHit) -> Self {
        Self {
            document_name: hit.document_name.clone(),
            chunk_index: hit.chunk_index,
            similarity: hit.similarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The generator answered from retrieved context.
    Generated {
        response: String,
        sources: Vec<Source>,
    },
    /// Nothing was retrieved; the generator was not called.
    InsufficientContext,
}

impl Answer {
    pub fn response(&self) -> &str {
        match self {
            Self::Generated { response, .. } => response,
            Self::InsufficientContext => INSUFFICIENT_CONTEXT_MESSAGE,
        }
    }

    pub fn sources(&self) -> &[Source] {
        match self {
            Self::Generated { sources, .. } => sources,
            Self::InsufficientContext => &[],
        }
    }

    pub fn context_used(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

/// Embeds queries, searches the live index and hands context to the
/// generator. All calls block; run them off the async executor.
pub struct RetrievalOrchestrator {
    index: Arc<IndexHandle>,
    embedder: Arc<dyn EmbeddingGenerator>,
    generator: Arc<dyn TextGenerator>,
    config: RetrievalConfig,
}

impl RetrievalOrchestrator {
    pub fn new(
        index: Arc<IndexHandle>,
        embedder: Arc<dyn EmbeddingGenerator>,
        generator: Arc<dyn TextGenerator>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Top-k chunks for a query from the current index generation.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        let vector = embed_query(self.embedder.as_ref(), query)?;
        let hits = self.index.current().similarity_search(&vector, top_k)?;
        tracing::debug!(
            target: "retrieval",
            "query '{query}' matched {} chunks (top_k={top_k})",
            hits.len()
        );
        Ok(hits)
    }

    /// Answer a question from the `top_k` most similar chunks.
    pub fn answer(&self, query: &str, top_k: usize) -> Result<Answer, RetrievalError> {
        let hits = self.retrieve(query, top_k)?;
        if hits.is_empty() {
            return Ok(Answer::InsufficientContext);
        }

        let context = build_context(&hits);
        let response = self.generator.generate(&answer_prompt(&context, query))?;

        Ok(Answer::Generated {
            response,
            sources: hits.iter().map(Source::from).collect(),
        })
    }

    /// Assess the legal risk of an indexed document.
    pub fn assess_risk(
        &self,
        document_name: &str,
    ) -> Result<LegalDocumentRiskAssessment, RetrievalError> {
        let chunks = self
            .index
            .current()
            .document_chunks(document_name)
            .ok_or_else(|| RetrievalError::DocumentNotFound(document_name.to_string()))?;

        let full_text = chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = truncate_chars(&full_text, self.config.risk_context_chars);

        crate::log_event!(
            "retrieval",
            "risk assessment",
            "{document_name} ({} chunks)",
            chunks.len()
        );

        let reply = self.generator.generate(&risk_prompt(document_name, text))?;
        Ok(LegalDocumentRiskAssessment::parse(&reply, document_name)?)
    }
}

/// Join hit contents in ranked order.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn answer_prompt(context: &str, query: &str) -> String {
    format!(
        "Context from documents:\n{context}\n\n\
         Question: {query}\n\n\
         Answer from the context above. If it does not contain the answer, say so.\n\
         Mark anything you infer beyond the documents as your own reasoning.\n\n\
         Answer:"
    )
}

fn risk_prompt(document_name: &str, text: &str) -> String {
    format!(
        "Assess the legal risk of the document below.\n\n\
         DOCUMENT: {document_name}\n\
         CONTENT:\n{text}\n\n\
         Identify its key clauses. Rate each one high, medium or low risk with a \
         confidence between 0 and 1, explain the rating and list potential issues. \
         Then give an overall rating, a summary and mitigation recommendations.\n\n\
         Reply with a single JSON object of this shape:\n\
         {{\"document_name\": string, \"overall_risk_level\": \"high|medium|low\", \
         \"high_risk_clauses\": int, \"medium_risk_clauses\": int, \"low_risk_clauses\": int, \
         \"clause_assessments\": [{{\"clause_text\": string, \"risk_level\": \"high|medium|low\", \
         \"confidence_score\": float, \"reasoning\": string, \"potential_issues\": [string]}}], \
         \"summary\": string, \"recommendations\": [string]}}"
    )
}
