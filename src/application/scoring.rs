//! Scoring service: Orchestrates one screening end to end.
//!
//! This service coordinates:
//! - Feature encoding
//! - Model prediction
//! - Tier classification
//! - History persistence and trend retrieval

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{
    self, subject_ref, Assessment, HistoryOrder, HistoryRecord, RawAnswers, TrendSeries,
};
use crate::ports::{HistoryStore, TrendRenderer};
use crate::EarlysignError;

/// Service for scoring subjects and reviewing their history.
pub struct ScoringService<S>
where
    S: HistoryStore,
{
    predictor: super::RiskPredictor,
    store: Arc<S>,
    order: HistoryOrder,
}

impl<S> ScoringService<S>
where
    S: HistoryStore,
    S::Error: Into<crate::adapters::StorageError>,
{
    /// Create a new scoring service.
    pub fn new(predictor: super::RiskPredictor, store: Arc<S>) -> Self {
        Self {
            predictor,
            store,
            order: HistoryOrder::default(),
        }
    }

    /// Present history in `order` instead of insertion order.
    #[must_use]
    pub fn with_history_order(mut self, order: HistoryOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn history_order(&self) -> HistoryOrder {
        self.order
    }

    fn require_subject(subject_id: &str) -> Result<(), EarlysignError> {
        if subject_id.trim().is_empty() {
            return Err(EarlysignError::MissingField("child_id".to_string()));
        }
        Ok(())
    }

    /// Score one answer set and append it to the subject's history.
    ///
    /// Performs the full pipeline:
    /// 1. Build the feature vector
    /// 2. Predict the risk score
    /// 3. Classify into a tier
    /// 4. Append to history
    ///
    /// # Errors
    /// Input errors (`MissingField`, `TypeFormat`) before anything is stored;
    /// `ModelUnavailable`/`Inference` from the predictor; `StorageUnavailable`
    /// if the record cannot be written.
    pub fn score(
        &self,
        subject_id: &str,
        raw: &RawAnswers,
        date: NaiveDate,
    ) -> Result<Assessment, EarlysignError> {
        Self::require_subject(subject_id)?;
        let subject = subject_ref(subject_id);

        tracing::debug!(subject_ref = %subject, "Step 1: Building feature vector...");
        let vector = domain::build(raw)?;

        tracing::debug!(subject_ref = %subject, "Step 2: Predicting risk...");
        let score = self.predictor.predict(&vector)?;

        let tier = domain::classify(score);

        tracing::debug!(subject_ref = %subject, "Step 3: Appending to history...");
        let record_id = self
            .store
            .append(subject_id, date, score)
            .map_err(|e| EarlysignError::StorageUnavailable(e.into()))?;

        tracing::info!(
            subject_ref = %subject,
            record_id,
            "Screening scored: risk={:.2}, tier={}",
            score.value(),
            tier
        );

        Ok(Assessment {
            subject_id: subject_id.to_string(),
            date,
            score,
            tier,
            record_id,
        })
    }

    /// Score with today's local date.
    ///
    /// # Errors
    /// See [`Self::score`].
    pub fn score_today(
        &self,
        subject_id: &str,
        raw: &RawAnswers,
    ) -> Result<Assessment, EarlysignError> {
        self.score(subject_id, raw, chrono::Local::now().date_naive())
    }

    /// A subject's records in the configured order. Empty if none exist.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if the store cannot be read.
    pub fn history(&self, subject_id: &str) -> Result<Vec<HistoryRecord>, EarlysignError> {
        let mut records = self
            .store
            .query_by_subject(subject_id)
            .map_err(|e| EarlysignError::StorageUnavailable(e.into()))?;
        self.order.apply(&mut records);
        Ok(records)
    }

    /// The subject's trend series, ready for a renderer.
    ///
    /// # Errors
    /// `NoHistory` when the subject has no records.
    pub fn trend(&self, subject_id: &str) -> Result<TrendSeries, EarlysignError> {
        let records = self.history(subject_id)?;
        TrendSeries::from_records(&records)
            .ok_or_else(|| EarlysignError::NoHistory(subject_id.to_string()))
    }

    /// Render the subject's trend. The renderer is never called without data.
    ///
    /// # Errors
    /// `NoHistory` when the subject has no records, `Render` if the renderer fails.
    pub fn render_trend<R>(
        &self,
        subject_id: &str,
        renderer: &R,
    ) -> Result<R::Output, EarlysignError>
    where
        R: TrendRenderer,
    {
        let series = self.trend(subject_id)?;
        renderer
            .render(subject_id, &series)
            .map_err(EarlysignError::from)
    }

    /// Subjects with at least one record.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if the store cannot be read.
    pub fn subjects(&self) -> Result<Vec<String>, EarlysignError> {
        self.store
            .subjects()
            .map_err(|e| EarlysignError::StorageUnavailable(e.into()))
    }
}
