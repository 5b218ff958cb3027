//! Model registry
//!
//! Holds the pre-trained artifacts the service serves, keyed by name. Each
//! slot moves through uninitialized → loading → ready (or failed) exactly
//! once per process; after that, readers share the immutable artifact
//! without any locking.

use crate::error::{Result, ServiceError};
use crate::insight::{InsightScorer, RuleBasedScorer};
use crate::predictor::{OnnxClassifier, Predictor, Scaler, StandardScaler};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// Artifact names known to the service
pub mod names {
    pub const PERSONA_MODEL: &str = "persona_model";
    pub const PERSONA_SCALER: &str = "persona_scaler";
    pub const INSIGHT_GENERATOR: &str = "insight_generator";
}

/// Capability family of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    Scorer,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Scorer => "scorer",
        };
        f.write_str(s)
    }
}

/// A loaded artifact, shared read-only between requests
#[derive(Clone)]
pub enum ModelArtifact {
    Classifier(Arc<dyn Predictor>),
    Scaler(Arc<dyn Scaler>),
    Scorer(Arc<dyn InsightScorer>),
}

impl ModelArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ModelArtifact::Classifier(_) => ArtifactKind::Classifier,
            ModelArtifact::Scaler(_) => ArtifactKind::Scaler,
            ModelArtifact::Scorer(_) => ArtifactKind::Scorer,
        }
    }
}

/// Metadata recorded when an artifact becomes ready
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: ArtifactKind,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub size_bytes: usize,
    pub loaded_at: i64,
}

/// Lifecycle of a registry slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Uninitialized,
    Ready,
    Failed,
}

/// Artifact locations for the standard service layout
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub persona_model: PathBuf,
    /// No scaler is applied when unset
    pub persona_scaler: Option<PathBuf>,
    pub insight_generator: PathBuf,
    pub feature_count: usize,
    pub model_version: String,
}

struct Loaded {
    artifact: ModelArtifact,
    info: ModelInfo,
}

struct Slot {
    kind: ArtifactKind,
    path: Option<PathBuf>,
    cell: OnceLock<Option<Loaded>>,
}

/// Load-once cache of named artifacts
pub struct ModelRegistry {
    slots: BTreeMap<String, Slot>,
    feature_count: usize,
    model_version: String,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new(feature_count: usize, model_version: impl Into<String>) -> Self {
        Self {
            slots: BTreeMap::new(),
            feature_count,
            model_version: model_version.into(),
        }
    }

    /// Register the persona classifier, its scaler and the insight generator
    pub fn from_paths(paths: &ModelPaths) -> Self {
        let mut registry = Self::new(paths.feature_count, paths.model_version.clone())
            .with_source(
                names::PERSONA_MODEL,
                ArtifactKind::Classifier,
                &paths.persona_model,
            )
            .with_source(
                names::INSIGHT_GENERATOR,
                ArtifactKind::Scorer,
                &paths.insight_generator,
            );
        if let Some(scaler) = &paths.persona_scaler {
            registry = registry.with_source(names::PERSONA_SCALER, ArtifactKind::Scaler, scaler);
        }
        registry
    }

    /// Register an artifact to be loaded from `path` on first use
    pub fn with_source(mut self, name: &str, kind: ArtifactKind, path: impl AsRef<Path>) -> Self {
        self.slots.insert(
            name.to_string(),
            Slot {
                kind,
                path: Some(path.as_ref().to_path_buf()),
                cell: OnceLock::new(),
            },
        );
        self
    }

    /// Register an already constructed artifact
    pub fn with_artifact(mut self, name: &str, artifact: ModelArtifact) -> Self {
        let kind = artifact.kind();
        let version = match &artifact {
            ModelArtifact::Classifier(p) => p.model_version().to_string(),
            ModelArtifact::Scorer(s) => s.version().to_string(),
            ModelArtifact::Scaler(_) => self.model_version.clone(),
        };
        let info = ModelInfo {
            name: name.to_string(),
            kind,
            version,
            path: None,
            checksum: None,
            size_bytes: 0,
            loaded_at: chrono::Utc::now().timestamp(),
        };
        let cell = OnceLock::new();
        let _ = cell.set(Some(Loaded { artifact, info }));
        self.slots.insert(
            name.to_string(),
            Slot {
                kind,
                path: None,
                cell,
            },
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Look up an artifact, loading it on first use
    pub fn get(&self, name: &str) -> Option<ModelArtifact> {
        let slot = self.slots.get(name)?;
        slot.cell
            .get_or_init(|| self.load(name, slot))
            .as_ref()
            .map(|loaded| loaded.artifact.clone())
    }

    pub fn classifier(&self, name: &str) -> Result<Arc<dyn Predictor>> {
        match self.get(name) {
            Some(ModelArtifact::Classifier(p)) => Ok(p),
            other => Err(unavailable(name, ArtifactKind::Classifier, other)),
        }
    }

    pub fn scaler(&self, name: &str) -> Result<Arc<dyn Scaler>> {
        match self.get(name) {
            Some(ModelArtifact::Scaler(s)) => Ok(s),
            other => Err(unavailable(name, ArtifactKind::Scaler, other)),
        }
    }

    pub fn scorer(&self, name: &str) -> Result<Arc<dyn InsightScorer>> {
        match self.get(name) {
            Some(ModelArtifact::Scorer(s)) => Ok(s),
            other => Err(unavailable(name, ArtifactKind::Scorer, other)),
        }
    }

    /// Current lifecycle state of `name`, `None` if it was never registered
    pub fn state(&self, name: &str) -> Option<ModelState> {
        let slot = self.slots.get(name)?;
        Some(match slot.cell.get() {
            None => ModelState::Uninitialized,
            Some(Some(_)) => ModelState::Ready,
            Some(None) => ModelState::Failed,
        })
    }

    /// Current state of every registered artifact, in name order
    pub fn states(&self) -> Vec<(String, ModelState)> {
        self.slots
            .keys()
            .filter_map(|name| Some((name.clone(), self.state(name)?)))
            .collect()
    }

    /// Load every registered artifact, returning the states in name order
    pub fn preload(&self) -> Vec<(String, ModelState)> {
        for name in self.slots.keys() {
            let _ = self.get(name);
        }
        self.states()
    }

    /// Metadata of every ready artifact
    pub fn model_infos(&self) -> Vec<ModelInfo> {
        self.slots
            .values()
            .filter_map(|slot| slot.cell.get().and_then(Option::as_ref))
            .map(|loaded| loaded.info.clone())
            .collect()
    }

    fn load(&self, name: &str, slot: &Slot) -> Option<Loaded> {
        let Some(path) = slot.path.as_ref() else {
            warn!(model = %name, "No artifact path registered");
            return None;
        };

        info!(model = %name, kind = %slot.kind, path = %path.display(), "Loading artifact");
        match self.load_from_file(name, slot.kind, path) {
            Ok(loaded) => {
                info!(
                    event = "model_loaded",
                    model = %name,
                    version = %loaded.info.version,
                    checksum = ?loaded.info.checksum,
                    size_bytes = loaded.info.size_bytes,
                    "Artifact loaded successfully"
                );
                Some(loaded)
            }
            Err(e) => {
                error!(
                    event = "model_load_failed",
                    model = %name,
                    path = %path.display(),
                    error = %e,
                    "Failed to load artifact"
                );
                None
            }
        }
    }

    fn load_from_file(&self, name: &str, kind: ArtifactKind, path: &Path) -> Result<Loaded> {
        // The file handle is released as soon as the bytes are read
        let bytes = std::fs::read(path).map_err(|e| ServiceError::artifact(name, e))?;
        let checksum = compute_checksum(&bytes);
        let to_err = |e: anyhow::Error| ServiceError::artifact(name, format!("{:#}", e));

        let (artifact, version) = match kind {
            ArtifactKind::Classifier => {
                let model =
                    OnnxClassifier::from_bytes(&bytes, self.feature_count, self.model_version.clone())
                        .map_err(to_err)?;
                if !model.has_probabilities() {
                    warn!(model = %name, "Classifier has no probability output, confidence will default to 1.0");
                }
                (ModelArtifact::Classifier(Arc::new(model)), self.model_version.clone())
            }
            ArtifactKind::Scaler => {
                let scaler = StandardScaler::from_json(&bytes, self.feature_count).map_err(to_err)?;
                (ModelArtifact::Scaler(Arc::new(scaler)), self.model_version.clone())
            }
            ArtifactKind::Scorer => {
                let scorer = RuleBasedScorer::from_json(&bytes).map_err(to_err)?;
                let version = scorer.version().to_string();
                (ModelArtifact::Scorer(Arc::new(scorer)), version)
            }
        };

        Ok(Loaded {
            artifact,
            info: ModelInfo {
                name: name.to_string(),
                kind,
                version,
                path: Some(path.display().to_string()),
                checksum: Some(checksum),
                size_bytes: bytes.len(),
                loaded_at: chrono::Utc::now().timestamp(),
            },
        })
    }
}

fn unavailable(name: &str, wanted: ArtifactKind, found: Option<ModelArtifact>) -> ServiceError {
    if let Some(artifact) = found {
        warn!(model = %name, wanted = %wanted, found = %artifact.kind(), "Artifact has the wrong kind");
    }
    ServiceError::ModelUnavailable(name.to_string())
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
