#![allow(clippy::missing_errors_doc)]

//! Durable assessment history on top of a whole-document key-value store.

use anyhow::{anyhow, Context, Result};
use haven_assessment_core::{
    classify, compute_statistics, AssessmentError, AssessmentResponse, AssessmentResult,
    Classification, Clock, HistoryConfig, HistoryLog, HistoryPeriod, HistoryStatistics, ResultId,
    SystemClock, CRISIS_CONTACTS,
};
use serde_json::Value;

mod kv;

pub use kv::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};

/// Outcome of submitting a completed questionnaire.
///
/// Scoring never fails because of storage: `saved` reports whether the
/// result reached the store.
#[derive(Debug, Clone, serde::Serialize, PartialEq)]
pub struct Submission {
    pub result: AssessmentResult,
    pub classification: Classification,
    pub crisis_contacts: Vec<String>,
    pub saved: bool,
    pub save_error: Option<String>,
}

/// Sole owner of the persisted history list.
pub struct HistoryAggregator<S, C = SystemClock> {
    store: S,
    clock: C,
    config: HistoryConfig,
    log: HistoryLog,
}

impl<S: KeyValueStore, C: Clock> HistoryAggregator<S, C> {
    /// Loads the stored history. Missing, unreadable or malformed data
    /// starts an empty history.
    pub fn open(store: S, clock: C, config: HistoryConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|err| anyhow!("invalid history configuration: {err}"))?;

        let entries = load_entries(&store, &config);
        let log = HistoryLog::from_entries(entries, config.capacity)
            .map_err(|err| anyhow!(err.to_string()))?;

        Ok(Self {
            store,
            clock,
            config,
            log,
        })
    }

    #[must_use]
    pub fn entries(&self) -> &[AssessmentResult] {
        self.log.entries()
    }

    #[must_use]
    pub fn get(&self, id: &ResultId) -> Option<&AssessmentResult> {
        self.log.get(id)
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Prepends `result`, evicting the oldest entries beyond capacity, and
    /// persists. On write failure the in-memory list is left untouched.
    pub fn append(&mut self, result: AssessmentResult) -> Result<Vec<AssessmentResult>> {
        let mut next = self.log.clone();
        let evicted = next.append(result);
        self.persist(next.entries())?;

        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "history capacity reached");
        }
        self.log = next;
        Ok(evicted)
    }

    /// Empties the history and removes the stored document.
    pub fn clear(&mut self) -> Result<()> {
        self.store
            .remove(&self.config.storage_key)
            .with_context(|| format!("failed to clear history at {}", self.config.storage_key))?;
        self.log.clear();
        Ok(())
    }

    /// Removes one entry. Returns `false` without writing when `id` is absent.
    pub fn remove(&mut self, id: &ResultId) -> Result<bool> {
        let mut next = self.log.clone();
        if next.remove(id).is_none() {
            return Ok(false);
        }

        self.persist(next.entries())?;
        self.log = next;
        Ok(true)
    }

    /// Entries within `period` of the clock's "now", newest first.
    #[must_use]
    pub fn filter_by_period(&self, period: HistoryPeriod) -> Vec<AssessmentResult> {
        self.log.filter_by_period(period, self.clock.now())
    }

    #[must_use]
    pub fn statistics(&self, period: HistoryPeriod) -> HistoryStatistics {
        compute_statistics(&self.filter_by_period(period))
    }

    /// Scores, classifies, timestamps and appends a completed response.
    ///
    /// # Errors
    /// Returns [`AssessmentError::Incomplete`] while any answer is missing.
    /// Storage failures are reported through [`Submission::saved`] instead.
    pub fn record_assessment(
        &mut self,
        response: &AssessmentResponse,
    ) -> std::result::Result<Submission, AssessmentError> {
        let result = AssessmentResult::from_response(response, self.clock.now())?;
        let classification = classify(result.score)?;
        let crisis_contacts = if classification.requires_urgent_resources {
            CRISIS_CONTACTS.iter().map(ToString::to_string).collect()
        } else {
            Vec::new()
        };

        let (saved, save_error) = match self.append(result.clone()) {
            Ok(_) => (true, None),
            Err(err) => {
                tracing::warn!(id = %result.id, error = %format!("{err:#}"), "failed to save assessment result");
                (false, Some(format!("{err:#}")))
            }
        };

        Ok(Submission {
            result,
            classification,
            crisis_contacts,
            saved,
            save_error,
        })
    }

    fn persist(&mut self, entries: &[AssessmentResult]) -> Result<()> {
        let payload = serde_json::to_string(entries).context("failed to serialize history")?;
        self.store
            .set(&self.config.storage_key, &payload)
            .with_context(|| format!("failed to persist history at {}", self.config.storage_key))
    }
}

/// Reads and decodes the stored history, degrading to empty on any failure.
/// Individual entries that fail to decode or validate are skipped. Cached
/// labels are always re-derived from the score.
fn load_entries<S: KeyValueStore>(store: &S, config: &HistoryConfig) -> Vec<AssessmentResult> {
    let raw = match store.get(&config.storage_key) {
        Ok(Some(value)) => value,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::warn!(key = %config.storage_key, error = %format!("{err:#}"), "history unreadable; starting empty");
            return Vec::new();
        }
    };

    let items = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            tracing::warn!(key = %config.storage_key, "stored history is not a JSON array; starting empty");
            return Vec::new();
        }
        Err(err) => {
            tracing::warn!(key = %config.storage_key, error = %err, "stored history is not valid JSON; starting empty");
            return Vec::new();
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let decoded = serde_json::from_value::<AssessmentResult>(item)
            .map_err(|err| err.to_string())
            .and_then(|mut entry| {
                if entry.relabel().map_err(|err| err.to_string())? {
                    tracing::warn!(key = %config.storage_key, index, id = %entry.id, "stale severity label re-derived from score");
                }
                entry.validate().map_err(|err| err.to_string())?;
                Ok(entry)
            });
        match decoded {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(key = %config.storage_key, index, error = %err, "skipping malformed history entry");
            }
        }
    }
    entries
}
