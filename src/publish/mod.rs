//! Artifact publishing to object storage.
//!
//! Each output target receives two artifacts per run: the raw JSON result
//! (`result.json`) and a self-contained HTML report (`report.html`), written
//! under `{base_path}/{run_timestamp}/`. Publishing is best-effort by design:
//! a failed upload is recorded in the publish report and logged, but never
//! changes the validation verdict.

pub mod report;

use crate::config::{OutputTarget, StoreSpec};
use crate::engine::RunResult;
use crate::error::{Result, SentinelError};
use async_trait::async_trait;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{local::LocalFileSystem, ObjectStore, PutPayload};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Name of the JSON result artifact.
pub const RESULT_ARTIFACT: &str = "result.json";
/// Name of the HTML report artifact.
pub const REPORT_ARTIFACT: &str = "report.html";

/// Narrow write/read surface over a storage backend. Object-safe so tests can
/// substitute failing stores.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Writes bytes at the given path, replacing any existing object.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()>;

    /// Reads an object back. Used by tests and verification tooling.
    async fn get(&self, path: &str) -> Result<Vec<u8>>;
}

/// [`ArtifactStore`] backed by any `object_store` implementation.
pub struct ObjectStoreArtifactStore {
    inner: Arc<dyn ObjectStore>,
    label: String,
}

impl ObjectStoreArtifactStore {
    /// Wraps an object store with a label used in logs.
    pub fn new(inner: Arc<dyn ObjectStore>, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }
}

impl std::fmt::Debug for ObjectStoreArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreArtifactStore")
            .field("label", &self.label)
            .finish()
    }
}

#[async_trait]
impl ArtifactStore for ObjectStoreArtifactStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let location = StorePath::from(path);
        self.inner.put(&location, PutPayload::from(bytes)).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let location = StorePath::from(path);
        let data = self.inner.get(&location).await?.bytes().await?;
        Ok(data.to_vec())
    }
}

/// Builds a store for the given backend specification.
pub fn build_store(spec: &StoreSpec) -> Result<ObjectStoreArtifactStore> {
    match spec {
        StoreSpec::Filesystem { root } => {
            let store = LocalFileSystem::new_with_prefix(root).map_err(|e| {
                SentinelError::storage(format!("cannot open filesystem store at '{root}': {e}"))
            })?;
            Ok(ObjectStoreArtifactStore::new(
                Arc::new(store),
                format!("filesystem:{root}"),
            ))
        }
        StoreSpec::Memory => Ok(ObjectStoreArtifactStore::new(
            Arc::new(InMemory::new()),
            "memory",
        )),
        #[cfg(feature = "azure")]
        StoreSpec::Azure {
            account,
            container,
            access_key,
        } => {
            let store = object_store::azure::MicrosoftAzureBuilder::new()
                .with_account(account)
                .with_container_name(container)
                .with_access_key(access_key.expose())
                .build()
                .map_err(|e| {
                    SentinelError::storage(format!(
                        "cannot build azure store for account '{account}': {e}"
                    ))
                })?;
            Ok(ObjectStoreArtifactStore::new(
                Arc::new(store),
                format!("azure:{account}/{container}"),
            ))
        }
        #[cfg(not(feature = "azure"))]
        StoreSpec::Azure { account, .. } => Err(SentinelError::storage(format!(
            "output targets azure account '{account}' but this build lacks the 'azure' feature"
        ))),
    }
}

/// One successfully published artifact.
#[derive(Debug, Clone)]
pub struct PublishedArtifact {
    /// Output target name
    pub target: String,
    /// Full object path within the store
    pub path: String,
    /// Artifact size in bytes
    pub bytes: usize,
}

/// One artifact that could not be published.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    /// Output target name
    pub target: String,
    /// Full object path within the store
    pub path: String,
    /// Description of what went wrong
    pub error: String,
}

/// Receipt for one publish pass over all output targets.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    /// Artifacts written successfully
    pub published: Vec<PublishedArtifact>,
    /// Artifacts that failed to write
    pub failures: Vec<PublishFailure>,
}

impl PublishReport {
    /// Returns true when every artifact was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Publishes run artifacts to the configured output targets.
#[derive(Debug, Default)]
pub struct ArtifactPublisher;

impl ArtifactPublisher {
    /// Creates a publisher.
    pub fn new() -> Self {
        Self
    }

    /// Renders and uploads both artifacts to every target. Failures are
    /// recorded per artifact; one broken target never blocks the others.
    #[instrument(skip(self, result, targets), fields(run.name = %result.run_name))]
    pub async fn publish(&self, result: &RunResult, targets: &[OutputTarget]) -> PublishReport {
        let artifacts = match Self::render_artifacts(result) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                // Rendering is target-independent; if it fails, every target
                // fails with the same reason.
                error!(error = %e, "Cannot render run artifacts");
                return PublishReport {
                    published: Vec::new(),
                    failures: targets
                        .iter()
                        .map(|t| PublishFailure {
                            target: t.name.clone(),
                            path: String::new(),
                            error: e.to_string(),
                        })
                        .collect(),
                };
            }
        };

        let mut report = PublishReport::default();
        for target in targets {
            match build_store(&target.store) {
                Ok(store) => {
                    self.publish_to_store(result, target, &store, &artifacts, &mut report)
                        .await;
                }
                Err(e) => {
                    error!(target.name = %target.name, error = %e, "Cannot open output store");
                    for (name, _) in &artifacts {
                        report.failures.push(PublishFailure {
                            target: target.name.clone(),
                            path: resolve_path(&target.base_path, &result.run_timestamp, name),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
        report
    }

    /// Publishes to one already-built store. Split out so tests can inject
    /// failing stores.
    pub async fn publish_to_store(
        &self,
        result: &RunResult,
        target: &OutputTarget,
        store: &dyn ArtifactStore,
        artifacts: &[(&'static str, Vec<u8>)],
        report: &mut PublishReport,
    ) {
        for (name, bytes) in artifacts {
            let path = resolve_path(&target.base_path, &result.run_timestamp, name);
            match store.put(&path, bytes.clone()).await {
                Ok(()) => {
                    info!(
                        target.name = %target.name,
                        artifact.path = %path,
                        artifact.bytes = bytes.len(),
                        "Published artifact"
                    );
                    report.published.push(PublishedArtifact {
                        target: target.name.clone(),
                        path,
                        bytes: bytes.len(),
                    });
                }
                Err(e) => {
                    error!(
                        target.name = %target.name,
                        artifact.path = %path,
                        error = %e,
                        "Failed to publish artifact"
                    );
                    report.failures.push(PublishFailure {
                        target: target.name.clone(),
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// Renders both artifacts once, shared across targets.
    pub fn render_artifacts(result: &RunResult) -> Result<Vec<(&'static str, Vec<u8>)>> {
        Ok(vec![
            (RESULT_ARTIFACT, result.to_json_pretty()?),
            (REPORT_ARTIFACT, report::render_html(result).into_bytes()),
        ])
    }
}

/// Resolves the object path for one artifact: the `{timestamp}` placeholder
/// is substituted where present, otherwise the run timestamp is appended as a
/// path segment.
pub fn resolve_path(base_path: &str, run_timestamp: &str, artifact_name: &str) -> String {
    let base = if base_path.contains("{timestamp}") {
        base_path.replace("{timestamp}", run_timestamp)
    } else {
        format!("{}/{}", base_path.trim_end_matches('/'), run_timestamp)
    };
    format!("{}/{}", base.trim_matches('/'), artifact_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path_appends_timestamp() {
        assert_eq!(
            resolve_path("results", "20260828T120000Z", "result.json"),
            "results/20260828T120000Z/result.json"
        );
    }

    #[test]
    fn test_resolve_path_placeholder() {
        assert_eq!(
            resolve_path("runs/{timestamp}/dq", "20260828T120000Z", "report.html"),
            "runs/20260828T120000Z/dq/report.html"
        );
    }

    #[test]
    fn test_resolve_path_trims_slashes() {
        assert_eq!(
            resolve_path("/results/", "ts", "result.json"),
            "results/ts/result.json"
        );
    }

    #[test]
    fn test_memory_store_buildable() {
        let store = build_store(&StoreSpec::Memory).unwrap();
        assert!(format!("{store:?}").contains("memory"));
    }

    #[cfg(not(feature = "azure"))]
    #[test]
    fn test_azure_without_feature_is_storage_error() {
        let spec = StoreSpec::Azure {
            account: "acct".to_string(),
            container: "dq".to_string(),
            access_key: crate::security::SecretString::new("key"),
        };
        let err = build_store(&spec).unwrap_err();
        assert!(matches!(err, SentinelError::Storage { .. }));
    }
}
