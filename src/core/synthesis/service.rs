//! Synthesis Service
//!
//! Binds the dispatcher to a catalog: every request reads a fresh
//! vocabulary snapshot, then dispatches.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::dispatcher::{QueryDispatcher, SynthesisResult};
use super::error::{Result, SynthesisError};
use super::fuzzy::ReferenceVocabulary;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Vocabulary unavailable: {0}")]
pub struct VocabularyError(pub String);

/// Catalog read collaborator supplying the reference vocabulary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn reference_vocabulary(&self) -> std::result::Result<ReferenceVocabulary, VocabularyError>;
}

pub struct SynthesisService {
    source: Arc<dyn VocabularySource>,
    dispatcher: QueryDispatcher,
}

impl SynthesisService {
    pub fn new(source: Arc<dyn VocabularySource>, dispatcher: QueryDispatcher) -> Self {
        Self { source, dispatcher }
    }

    pub fn dispatcher(&self) -> &QueryDispatcher {
        &self.dispatcher
    }

    /// Snapshot the vocabulary, falling back to an empty one on read failure.
    pub async fn vocabulary(&self) -> ReferenceVocabulary {
        match self.source.reference_vocabulary().await {
            Ok(vocabulary) => vocabulary,
            Err(err) => {
                tracing::warn!(error = %err, "Vocabulary read failed, corrections disabled");
                ReferenceVocabulary::empty()
            }
        }
    }

    pub async fn synthesize(&self, query: &str) -> Result<SynthesisResult> {
        let vocabulary = self.vocabulary().await;
        self.dispatcher.dispatch(query, &vocabulary).await
    }

    /// Re-synthesize through the filter path only.
    pub async fn synthesize_filters(
        &self,
        query: &str,
        sql_failure: SynthesisError,
    ) -> Result<SynthesisResult> {
        let vocabulary = self.vocabulary().await;
        self.dispatcher
            .dispatch_filters(query, &vocabulary, sql_failure)
            .await
    }
}
