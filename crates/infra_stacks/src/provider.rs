//! AWS provider configuration.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::params::EnvironmentParameters;
use crate::region::Region;

/// Provider name used in `provider` and `required_providers` blocks.
pub const PROVIDER_NAME: &str = "aws";

/// Registry source of the AWS provider.
pub const PROVIDER_SOURCE: &str = "hashicorp/aws";

/// Accepted AWS provider versions.
pub const PROVIDER_VERSION: &str = "~> 5.0";

/// Value of the `DeployedBy` tag on every resource.
pub const DEPLOYED_BY: &str = "Terraform";

/// An AWS provider scoped to one region and credential profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsProvider {
    pub region: Region,
    pub profile: String,
    pub default_tags: BTreeMap<String, String>,
}

impl AwsProvider {
    /// Provider for an environment, carrying the default tag policy.
    pub fn for_environment(params: &EnvironmentParameters) -> Self {
        Self {
            region: params.region,
            profile: params.profile.clone(),
            default_tags: default_tags(&params.resource_prefix),
        }
    }

    /// Construct identifier, e.g. `eu-west-2-provider`.
    pub fn id(&self) -> String {
        format!("{}-provider", self.region)
    }

    pub fn to_block(&self) -> Value {
        json!({
            "region": self.region,
            "profile": self.profile,
            "default_tags": [
                { "tags": self.default_tags }
            ],
        })
    }

    pub fn requirement(&self) -> Value {
        json!({
            "source": PROVIDER_SOURCE,
            "version": PROVIDER_VERSION,
        })
    }
}

/// Tags applied to every resource a stack creates.
pub fn default_tags(owner: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert("Owner".to_string(), owner.to_string());
    tags.insert("DeployedBy".to_string(), DEPLOYED_BY.to_string());
    tags
}
