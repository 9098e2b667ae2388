//! Configuration validation.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::InfraConfig;
use crate::params::EnvironmentParameters;
use crate::stack::StackKind;

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validator for [`InfraConfig`].
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run every check and collect all problems.
    pub fn validate(config: &InfraConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.merge(Self::validate_environments(config));
        result.merge(Self::validate_policy(config));
        result.merge(Self::validate_state_keys(config));
        result.merge(Self::validate_registry_state(config));

        if config.ci.subject.trim().is_empty() {
            result.add_error("ci.subject cannot be empty");
        }
        if config.ci.oidc_host.trim().is_empty() {
            result.add_error("ci.oidc_host cannot be empty");
        }

        result
    }

    /// Blank fields and duplicate environment entries.
    pub fn validate_environments(config: &InfraConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut seen = BTreeSet::new();

        if config.state_key_prefix.trim().is_empty() {
            result.add_error("state_key_prefix cannot be empty");
        }

        for params in &config.environments {
            if !seen.insert(params.environment) {
                result.add_error(format!(
                    "Environment {} is configured more than once",
                    params.environment
                ));
            }
            if let Err(e) = params.ensure_complete() {
                result.add_error(e.to_string());
            }
        }

        result
    }

    /// Every environment named by the policy needs parameters.
    pub fn validate_policy(config: &InfraConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (env, kinds) in config.stacks.iter() {
            if config.parameters(env).is_none() {
                result.add_error(format!("No parameters configured for environment {}", env));
            }
            if kinds.is_empty() {
                result.add_warning(format!("Environment {} declares no stacks", env));
            }

            let unique: BTreeSet<_> = kinds.iter().collect();
            if unique.len() != kinds.len() {
                result.add_error(format!("Environment {} lists a stack kind twice", env));
            }
        }

        for params in &config.environments {
            if config.stacks.stacks_for(params.environment).is_empty() {
                result.add_warning(format!(
                    "Environment {} has parameters but no stacks",
                    params.environment
                ));
            }
        }

        result
    }

    /// State keys must be unique per backend bucket.
    pub fn validate_state_keys(config: &InfraConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut owners: BTreeMap<(String, String), String> = BTreeMap::new();

        for (params, kind) in Self::planned(config) {
            let key = (
                params.backend_bucket.clone(),
                config.state_key(kind).as_str().to_string(),
            );
            let id = kind.stack_id(params);

            if let Some(first) = owners.get(&key) {
                result.add_error(format!(
                    "State key {} in bucket {} is used by both {} and {}",
                    key.1, key.0, first, id
                ));
            } else {
                owners.insert(key, id);
            }
        }

        result
    }

    /// Check the shared registry state reference.
    pub fn validate_registry_state(config: &InfraConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        let location = &config.registry_state;

        if location.bucket.trim().is_empty() {
            result.add_error("registry_state.bucket cannot be empty");
        }
        if location.lock_table.trim().is_empty() {
            result.add_error("registry_state.lock_table cannot be empty");
        }
        if location.key.as_str().trim().is_empty() {
            result.add_error("registry_state.key cannot be empty");
        }

        let planned = Self::planned(config);
        let publisher = planned.iter().find(|(params, kind)| {
            *kind == StackKind::Registry
                && params.backend_bucket == location.bucket
                && config.state_key(*kind) == location.key
        });

        match publisher {
            None => result.add_warning(format!(
                "No declared registry stack publishes {} in bucket {}; CI role stacks will fail at apply time unless it exists",
                location.key, location.bucket
            )),
            Some((source, _)) => {
                if source.region != location.region {
                    result.add_warning(format!(
                        "registry_state.region is {} but {} keeps its state in {}",
                        location.region,
                        StackKind::Registry.stack_id(source),
                        source.region
                    ));
                }
                for (params, kind) in &planned {
                    if *kind == StackKind::CiRole && params.environment != source.environment {
                        result.add_warning(format!(
                            "{} reads the registry state of environment {}",
                            kind.stack_id(params),
                            source.environment
                        ));
                    }
                }
            }
        }

        result
    }

    /// (parameters, kind) pairs the policy would declare, skipping environments without parameters.
    fn planned(config: &InfraConfig) -> Vec<(&EnvironmentParameters, StackKind)> {
        config
            .stacks
            .iter()
            .filter_map(|(env, kinds)| config.parameters(env).map(|params| (params, kinds)))
            .flat_map(|(params, kinds)| kinds.iter().map(move |kind| (params, *kind)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackPolicy;
    use crate::region::{Environment, Region};

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::validate(&InfraConfig::default());
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_shared_registry_state_is_flagged() {
        let result = ConfigValidator::validate(&InfraConfig::default());
        assert_eq!(result.warnings.len(), 2);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("core-infra-staging-github-action-stack")));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("core-infra-production-github-action-stack")));
    }

    #[test]
    fn test_blank_bucket_is_an_error() {
        let config = InfraConfig::default().with_parameters(
            EnvironmentParameters::for_environment(Environment::Production).with_backend("", "lock"),
        );
        let result = ConfigValidator::validate(&config);

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("backend_bucket")));
    }

    #[test]
    fn test_shared_bucket_collision() {
        let shared = |env| {
            EnvironmentParameters::for_environment(env).with_backend("one-bucket", "one-table")
        };
        let config = InfraConfig::default()
            .with_parameters(shared(Environment::Dev))
            .with_parameters(shared(Environment::Staging));
        let result = ConfigValidator::validate(&config);

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("core/gitHubActionRole.tfstate")));
    }

    #[test]
    fn test_policy_without_parameters() {
        let mut config = InfraConfig::default();
        config.environments.retain(|p| p.environment != Environment::Staging);
        let result = ConfigValidator::validate(&config);

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("staging")));
    }

    #[test]
    fn test_missing_registry_publisher_warns() {
        let config = InfraConfig::default().with_stacks(
            StackPolicy::standard().with(Environment::Dev, vec![StackKind::CiRole]),
        );
        let result = ConfigValidator::validate(&config);

        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("No declared registry stack")));
    }

    #[test]
    fn test_registry_state_region_drift_warns() {
        let config = InfraConfig::default().with_parameters(
            EnvironmentParameters::for_environment(Environment::Dev).with_region(Region::UsEast1),
        );
        let result = ConfigValidator::validate(&config);

        assert!(result.valid);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("registry_state.region is eu-west-2") && w.contains("us-east-1")));
    }
}
