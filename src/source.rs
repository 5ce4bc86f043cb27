// Remote status sources: the async seam the aggregator polls.

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::FetchError;
use crate::models::StatusPatch;
use crate::transport::ApiClient;

pub const DEFAULT_STATUS_PATH: &str = "/api/agentic/system-status";

/// Something that can produce a (possibly partial) status snapshot.
///
/// Implementations must not panic; every failure is reported as a
/// [`FetchError`] so the aggregator can keep the last good snapshot.
#[async_trait]
pub trait StatusSource: Send + Sync + Debug {
    async fn fetch_status(&self) -> Result<StatusPatch, FetchError>;

    /// Short name used in logs and source-tracking metadata.
    fn name(&self) -> &str;
}

/// GETs a JSON status document from the console API.
#[derive(Debug)]
pub struct HttpStatusSource {
    client: Arc<ApiClient>,
    name: String,
    path: String,
    /// When set, the whole response body is this one top-level field.
    field: Option<String>,
}

impl HttpStatusSource {
    pub fn new(
        client: Arc<ApiClient>,
        name: impl Into<String>,
        path: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            path: path.into(),
            field,
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self) -> Result<StatusPatch, FetchError> {
        let body = self.client.get_json(&self.path).await?;
        let patch = match &self.field {
            Some(field) => StatusPatch::from_field_value(field, body),
            None if !body.is_object() => {
                return Err(FetchError::Malformed(format!(
                    "{} returned a non-object status payload",
                    self.name
                )));
            }
            None => StatusPatch::from_value(&body),
        };
        if !patch.malformed.is_empty() {
            tracing::warn!(
                source = %self.name,
                fields = ?patch.malformed,
                "status payload partially malformed; merging the valid fields"
            );
        }
        Ok(patch.with_timestamp(Utc::now()).with_origin(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Fetches several independent sources concurrently and joins them once all
/// have settled. One failing source does not discard the others' fields.
#[derive(Debug)]
pub struct CompositeSource {
    name: String,
    sources: Vec<Arc<dyn StatusSource>>,
}

impl CompositeSource {
    pub fn new(sources: Vec<Arc<dyn StatusSource>>) -> Self {
        let name = sources
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join("+");
        Self { name, sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl StatusSource for CompositeSource {
    async fn fetch_status(&self) -> Result<StatusPatch, FetchError> {
        if self.sources.is_empty() {
            return Err(FetchError::Unavailable("no sources configured".into()));
        }
        let results = join_all(self.sources.iter().map(|s| s.fetch_status())).await;

        let mut combined: Option<StatusPatch> = None;
        let mut failures: Vec<(String, FetchError)> = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(patch) => {
                    combined = Some(match combined {
                        Some(acc) => acc.overlay(patch),
                        None => patch,
                    });
                }
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "status source failed");
                    failures.push((source.name().to_string(), e));
                }
            }
        }

        match combined {
            Some(mut patch) => {
                patch
                    .failed_sources
                    .extend(failures.into_iter().map(|(name, _)| name));
                Ok(patch)
            }
            None => {
                // Auth failures take precedence so the session handler hears about them.
                let err = match failures.iter().position(|(_, e)| *e == FetchError::Unauthorized) {
                    Some(i) => failures.swap_remove(i).1,
                    None => failures.swap_remove(0).1,
                };
                Err(err)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
