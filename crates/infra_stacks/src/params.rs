//! Per-environment backend, location and ownership parameters.

use serde::{Deserialize, Serialize};

use crate::error::{InfraError, InfraResult};
use crate::region::{Environment, Region};

/// Parameters shared by every stack deployed to one environment.
///
/// The backend bucket and lock table are created out-of-band in each AWS
/// account; nothing here creates or destroys them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentParameters {
    pub backend_bucket: String,
    pub backend_lock_table: String,
    pub profile: String,
    pub environment: Environment,
    pub region: Region,
    pub resource_prefix: String,
}

impl EnvironmentParameters {
    /// Built-in parameters for an environment.
    pub fn for_environment(environment: Environment) -> Self {
        let (bucket, profile) = match environment {
            Environment::Dev => ("grit-coding-terraform-dev", "core-infra-dev-devops"),
            Environment::Staging => (
                "grit-coding-terraform-staging",
                "core-infra-staging-devops-demo",
            ),
            Environment::Production => (
                "grit-coding-terraform-production",
                "core-infra-production-devops-demo",
            ),
        };

        Self {
            backend_bucket: bucket.to_string(),
            backend_lock_table: bucket.to_string(),
            profile: profile.to_string(),
            environment,
            region: Region::EuWest2,
            resource_prefix: "core-infra".to_string(),
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_backend(mut self, bucket: impl Into<String>, lock_table: impl Into<String>) -> Self {
        self.backend_bucket = bucket.into();
        self.backend_lock_table = lock_table.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_resource_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource_prefix = prefix.into();
        self
    }

    /// Fail on the first blank required field.
    pub fn ensure_complete(&self) -> InfraResult<()> {
        let fields = [
            ("backend_bucket", &self.backend_bucket),
            ("backend_lock_table", &self.backend_lock_table),
            ("profile", &self.profile),
            ("resource_prefix", &self.resource_prefix),
        ];

        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(InfraError::MissingParameter {
                    environment: self.environment,
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parameters_are_complete() {
        for env in Environment::all() {
            let params = EnvironmentParameters::for_environment(env);
            assert_eq!(params.environment, env);
            assert!(params.ensure_complete().is_ok());
            assert!(Region::all().contains(&params.region));
        }
    }

    #[test]
    fn test_dev_parameters() {
        let params = EnvironmentParameters::for_environment(Environment::Dev);
        assert_eq!(params.backend_bucket, "grit-coding-terraform-dev");
        assert_eq!(params.backend_lock_table, "grit-coding-terraform-dev");
        assert_eq!(params.profile, "core-infra-dev-devops");
        assert_eq!(params.region, Region::EuWest2);
        assert_eq!(params.resource_prefix, "core-infra");
    }

    #[test]
    fn test_blank_field_is_reported_by_name() {
        let params = EnvironmentParameters::for_environment(Environment::Staging).with_profile("  ");
        match params.ensure_complete() {
            Err(InfraError::MissingParameter { environment, field }) => {
                assert_eq!(environment, Environment::Staging);
                assert_eq!(field, "profile");
            }
            other => panic!("expected MissingParameter, got {:?}", other),
        }
    }
}
