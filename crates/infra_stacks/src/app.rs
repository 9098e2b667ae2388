//! Composition root.
//!
//! [`App::compose`] turns an [`InfraConfig`] into stack declarations, one set
//! per environment as the stack policy dictates. [`App::synth`] writes one
//! Terraform JSON working directory per stack plus a manifest describing them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::InfraConfig;
use crate::error::{InfraError, InfraResult};
use crate::region::Environment;
use crate::stack::{StackDeclaration, StackKind};
use crate::stacks::{CiRoleStack, RegistryStack};
use crate::validator::ConfigValidator;

/// Directory under the output dir holding one folder per stack.
pub const STACKS_DIR: &str = "stacks";

/// Artifact file name inside each stack folder.
pub const STACK_FILE: &str = "cdk.tf.json";

/// Manifest file name at the root of the output dir.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Composed declarations for every environment.
#[derive(Debug, Clone)]
pub struct App {
    stacks: Vec<StackDeclaration>,
    output_dir: PathBuf,
}

impl App {
    /// Validate `config` and declare every stack it names.
    pub fn compose(config: &InfraConfig) -> InfraResult<Self> {
        let mut stacks = Vec::new();
        let mut ids = HashSet::new();
        let mut state_owners: HashMap<(String, String), String> = HashMap::new();

        for (env, kinds) in config.stacks.iter() {
            let params = config
                .parameters(env)
                .ok_or(InfraError::MissingEnvironment(env))?;
            params.ensure_complete()?;

            for kind in kinds {
                let state_key = config.state_key(*kind);
                let stack = match kind {
                    StackKind::Registry => RegistryStack::declare(params, state_key),
                    StackKind::CiRole => {
                        CiRoleStack::declare(params, state_key, &config.registry_state, &config.ci)
                    }
                };

                if !ids.insert(stack.id.clone()) {
                    return Err(InfraError::DuplicateStack(stack.id));
                }

                let owner = (
                    stack.backend.bucket.clone(),
                    stack.state_key().as_str().to_string(),
                );
                if let Some(first) = state_owners.get(&owner) {
                    return Err(InfraError::StateKeyCollision {
                        bucket: owner.0,
                        key: owner.1,
                        first: first.clone(),
                        second: stack.id,
                    });
                }
                state_owners.insert(owner, stack.id.clone());

                stacks.push(stack);
            }
        }

        let report = ConfigValidator::validate(config);
        if !report.valid {
            return Err(InfraError::ValidationFailed(report.errors.join("; ")));
        }

        info!("Composed {} stacks", stacks.len());
        Ok(Self {
            stacks,
            output_dir: config.output_dir.clone(),
        })
    }

    /// Declarations in composition order.
    pub fn stacks(&self) -> &[StackDeclaration] {
        &self.stacks
    }

    pub fn stack(&self, id: &str) -> InfraResult<&StackDeclaration> {
        self.stacks
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| InfraError::StackNotFound(id.to_string()))
    }

    pub fn stacks_for(&self, environment: Environment) -> Vec<&StackDeclaration> {
        self.stacks
            .iter()
            .filter(|s| s.environment() == environment)
            .collect()
    }

    /// Configured output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Ids of declared stacks whose state `stack` reads.
    pub fn dependencies(&self, stack: &StackDeclaration) -> Vec<&str> {
        self.stacks
            .iter()
            .filter(|other| other.id != stack.id)
            .filter(|other| {
                stack
                    .remote_state
                    .iter()
                    .any(|r| r.location.is_backend(&other.backend))
            })
            .map(|other| other.id.as_str())
            .collect()
    }

    /// Apply order: every stack after the stacks whose state it reads,
    /// otherwise composition order.
    pub fn deployment_order(&self) -> Vec<&StackDeclaration> {
        let mut ordered: Vec<&StackDeclaration> = Vec::with_capacity(self.stacks.len());
        let mut placed: HashSet<&str> = HashSet::new();

        while ordered.len() < self.stacks.len() {
            let next = self.stacks.iter().find(|s| {
                !placed.contains(s.id.as_str())
                    && self.dependencies(s).iter().all(|d| placed.contains(d))
            });

            // A cycle cannot be ordered; keep composition order for the rest.
            let next = match next {
                Some(stack) => stack,
                None => match self.stacks.iter().find(|s| !placed.contains(s.id.as_str())) {
                    Some(stack) => stack,
                    None => break,
                },
            };

            placed.insert(next.id.as_str());
            ordered.push(next);
        }

        ordered
    }

    /// Write every stack under `out_dir` and return the manifest.
    ///
    /// Stack folders left over from an earlier run are removed first.
    pub fn synth(&self, out_dir: &Path) -> InfraResult<SynthManifest> {
        info!("Synthesizing {} stacks into {:?}", self.stacks.len(), out_dir);

        let stacks_dir = out_dir.join(STACKS_DIR);
        if stacks_dir.exists() {
            debug!("Removing previous output at {:?}", stacks_dir);
            fs::remove_dir_all(&stacks_dir)?;
        }

        let mut manifest = SynthManifest::new();

        for stack in self.deployment_order() {
            let working_directory = Path::new(STACKS_DIR).join(&stack.id);
            let synthesized_stack_path = working_directory.join(STACK_FILE);

            fs::create_dir_all(out_dir.join(&working_directory))?;
            fs::write(out_dir.join(&synthesized_stack_path), stack.to_json()?)?;
            debug!("Wrote {:?}", synthesized_stack_path);

            manifest.stacks.insert(
                stack.id.clone(),
                ManifestEntry {
                    name: stack.id.clone(),
                    environment: stack.environment(),
                    kind: stack.kind,
                    state_key: stack.state_key().as_str().to_string(),
                    working_directory: path_string(&working_directory),
                    synthesized_stack_path: path_string(&synthesized_stack_path),
                    dependencies: self
                        .dependencies(stack)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                },
            );
        }

        manifest.to_file(&out_dir.join(MANIFEST_FILE))?;
        info!("Synthesized {} stacks", manifest.stacks.len());
        Ok(manifest)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Index of a synthesized output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthManifest {
    pub version: String,
    pub stacks: BTreeMap<String, ManifestEntry>,
}

/// One stack in the manifest. Paths are relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub name: String,
    pub environment: Environment,
    pub kind: StackKind,
    pub state_key: String,
    pub working_directory: String,
    pub synthesized_stack_path: String,
    pub dependencies: Vec<String>,
}

impl SynthManifest {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            stacks: BTreeMap::new(),
        }
    }

    pub fn from_file(path: &Path) -> InfraResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_file(&self, path: &Path) -> InfraResult<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }
}

impl Default for SynthManifest {
    fn default() -> Self {
        Self::new()
    }
}
