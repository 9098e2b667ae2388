//! Composition configuration.
//!
//! [`InfraConfig::default`] reproduces the built-in environment table. A YAML
//! file may override any top-level section; missing sections keep their
//! defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{RemoteStateLocation, StateKey};
use crate::error::{InfraError, InfraResult};
use crate::params::EnvironmentParameters;
use crate::region::{Environment, Region};
use crate::stack::StackKind;
use crate::stacks::CiTrust;

/// Default state key prefix shared by all stacks.
pub const DEFAULT_STATE_KEY_PREFIX: &str = "core";

/// Default synthesis output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "cdktf.out";

/// Which stack kinds each environment instantiates, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackPolicy(BTreeMap<Environment, Vec<StackKind>>);

impl StackPolicy {
    /// dev gets both stacks; staging and production only the CI role.
    pub fn standard() -> Self {
        let mut table = BTreeMap::new();
        table.insert(Environment::Dev, vec![StackKind::CiRole, StackKind::Registry]);
        table.insert(Environment::Staging, vec![StackKind::CiRole]);
        table.insert(Environment::Production, vec![StackKind::CiRole]);
        Self(table)
    }

    pub fn with(mut self, environment: Environment, kinds: Vec<StackKind>) -> Self {
        self.0.insert(environment, kinds);
        self
    }

    pub fn stacks_for(&self, environment: Environment) -> &[StackKind] {
        self.0.get(&environment).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries in environment order.
    pub fn iter(&self) -> impl Iterator<Item = (Environment, &[StackKind])> {
        self.0.iter().map(|(env, kinds)| (*env, kinds.as_slice()))
    }

    pub fn environments(&self) -> Vec<Environment> {
        self.0.keys().copied().collect()
    }
}

impl Default for StackPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Everything the composition root needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InfraConfig {
    pub state_key_prefix: String,
    pub output_dir: PathBuf,
    pub environments: Vec<EnvironmentParameters>,
    pub stacks: StackPolicy,
    /// State every CI role stack reads the registry address from.
    pub registry_state: RemoteStateLocation,
    pub ci: CiTrust,
}

impl Default for InfraConfig {
    fn default() -> Self {
        let dev = EnvironmentParameters::for_environment(Environment::Dev);
        let registry_state = RemoteStateLocation {
            bucket: dev.backend_bucket.clone(),
            key: StateKey::new(DEFAULT_STATE_KEY_PREFIX, StackKind::Registry.state_file()),
            region: Region::EuWest2,
            lock_table: dev.backend_lock_table.clone(),
        };

        Self {
            state_key_prefix: DEFAULT_STATE_KEY_PREFIX.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            environments: Environment::all()
                .into_iter()
                .map(EnvironmentParameters::for_environment)
                .collect(),
            stacks: StackPolicy::standard(),
            registry_state,
            ci: CiTrust::default(),
        }
    }
}

impl InfraConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> InfraResult<Self> {
        debug!("Loading configuration from {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| InfraError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> InfraResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load `path` when given, otherwise use the built-in configuration.
    pub fn load(path: Option<&Path>) -> InfraResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to a YAML file.
    pub fn to_file(&self, path: &Path) -> InfraResult<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn parameters(&self, environment: Environment) -> Option<&EnvironmentParameters> {
        self.environments.iter().find(|p| p.environment == environment)
    }

    /// Replace the parameters of one environment.
    pub fn with_parameters(mut self, params: EnvironmentParameters) -> Self {
        self.environments.retain(|p| p.environment != params.environment);
        self.environments.push(params);
        self.environments.sort_by_key(|p| p.environment);
        self
    }

    pub fn with_stacks(mut self, stacks: StackPolicy) -> Self {
        self.stacks = stacks;
        self
    }

    pub fn state_key(&self, kind: StackKind) -> StateKey {
        StateKey::new(&self.state_key_prefix, kind.state_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_standard_policy() {
        let policy = StackPolicy::standard();
        assert_eq!(
            policy.stacks_for(Environment::Dev),
            &[StackKind::CiRole, StackKind::Registry]
        );
        assert_eq!(policy.stacks_for(Environment::Staging), &[StackKind::CiRole]);
        assert_eq!(policy.stacks_for(Environment::Production), &[StackKind::CiRole]);
    }

    #[test]
    fn test_default_registry_state() {
        let config = InfraConfig::default();
        assert_eq!(config.registry_state.bucket, "grit-coding-terraform-dev");
        assert_eq!(config.registry_state.key.as_str(), "core/ecrStack.tfstate");
        assert_eq!(config.registry_state.region, Region::EuWest2);
        assert_eq!(config.state_key(StackKind::CiRole).as_str(), "core/gitHubActionRole.tfstate");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = InfraConfig::from_yaml(
            r#"
stacks:
  dev: [registry]
  staging: [ci-role, registry]
"#,
        )
        .unwrap();

        assert_eq!(config.environments.len(), 3);
        assert_eq!(config.state_key_prefix, "core");
        assert_eq!(config.stacks.stacks_for(Environment::Staging).len(), 2);
        assert!(config.stacks.stacks_for(Environment::Production).is_empty());
    }

    #[test]
    fn test_unknown_region_in_yaml_names_value() {
        let err = InfraConfig::from_yaml(
            r#"
environments:
  - backend_bucket: b
    backend_lock_table: t
    profile: p
    environment: dev
    region: eu-west-7
    resource_prefix: core-infra
"#,
        )
        .unwrap_err();

        assert!(matches!(err, InfraError::Yaml(_)));
        assert!(err.to_string().contains("eu-west-7"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("infra.yaml");
        let config = InfraConfig::default().with_parameters(
            EnvironmentParameters::for_environment(Environment::Staging).with_region(Region::UsWest2),
        );

        config.to_file(&path).unwrap();
        let loaded = InfraConfig::load(Some(&path)).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.parameters(Environment::Staging).unwrap().region, Region::UsWest2);
    }

    #[test]
    fn test_missing_file_is_a_config_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        match InfraConfig::load(Some(&path)).unwrap_err() {
            InfraError::ConfigRead { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected ConfigRead, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_nested_key_is_rejected() {
        let err = InfraConfig::from_yaml("ci:\n  subjet: \"repo:grit-coding/*\"\n").unwrap_err();
        assert!(matches!(err, InfraError::Yaml(_)));
        assert!(err.to_string().contains("subjet"));
    }
}
