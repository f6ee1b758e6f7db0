use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::models::{Identity, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied,
    ProjectNotFound,
}

/// Decides whether an identity may open files of a project.
pub trait AccessChecker: Send + Sync {
    fn check(&self, identity: &Identity, project: &str) -> AccessDecision;
}

/// One project record of the manifest
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Directory name under the projects root
    pub path: String,
    #[serde(default)]
    pub name: String,
    pub creator_id: UserId,
    #[serde(default)]
    pub collaborators: Vec<UserId>,
}

impl ProjectRecord {
    fn grants(&self, identity: &Identity) -> bool {
        identity.is_admin || self.creator_id == identity.id || self.collaborators.contains(&identity.id)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    projects: Vec<ProjectRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read project manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse project manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Projects known to the server, keyed by their directory name.
#[derive(Debug, Default)]
pub struct ProjectManifest {
    projects: HashMap<String, ProjectRecord>,
}

impl ProjectManifest {
    pub fn from_records(records: impl IntoIterator<Item = ProjectRecord>) -> Self {
        Self {
            projects: records
                .into_iter()
                .map(|record| (record.path.clone(), record))
                .collect(),
        }
    }

    pub fn parse(json: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = serde_json::from_str(json)?;
        Ok(Self::from_records(file.projects))
    }

    /// Load the manifest; a missing file yields an empty manifest.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Project manifest {} not found, no project will be accessible", path.display());
            return Ok(Self::default());
        }
        let manifest = Self::parse(&std::fs::read_to_string(path)?)?;
        info!("Loaded {} projects from {}", manifest.len(), path.display());
        Ok(manifest)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn get(&self, project: &str) -> Option<&ProjectRecord> {
        self.projects.get(project)
    }
}

impl AccessChecker for ProjectManifest {
    fn check(&self, identity: &Identity, project: &str) -> AccessDecision {
        match self.get(project) {
            None => AccessDecision::ProjectNotFound,
            Some(record) if record.grants(identity) => AccessDecision::Allowed,
            Some(_) => AccessDecision::Denied,
        }
    }
}
