//! Remote state backend binding.
//!
//! Every stack persists its state in an S3 bucket guarded by a DynamoDB lock
//! table. This module only renders the configuration that tells Terraform
//! where to find them; locking itself happens inside Terraform at apply time.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::params::EnvironmentParameters;
use crate::region::Region;

/// Path of one stack's state file inside a backend bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    /// Build `<prefix>/<stack_file>.tfstate`.
    pub fn new(prefix: &str, stack_file: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            Self(format!("{}.tfstate", stack_file))
        } else {
            Self(format!("{}/{}.tfstate", prefix, stack_file))
        }
    }

    /// Use a key verbatim.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `terraform { backend "s3" { ... } }` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct S3Backend {
    pub bucket: String,
    pub key: StateKey,
    pub region: Region,
    pub dynamodb_table: String,
}

impl S3Backend {
    /// Bind a stack's state to the environment's bucket and lock table.
    pub fn bind(params: &EnvironmentParameters, key: StateKey) -> Self {
        Self {
            bucket: params.backend_bucket.clone(),
            key,
            region: params.region,
            dynamodb_table: params.backend_lock_table.clone(),
        }
    }
}

/// Coordinates of a persisted state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteStateLocation {
    pub bucket: String,
    pub key: StateKey,
    pub region: Region,
    pub lock_table: String,
}

impl RemoteStateLocation {
    /// Location of a stack's state as bound by [`S3Backend::bind`].
    pub fn of(backend: &S3Backend) -> Self {
        Self {
            bucket: backend.bucket.clone(),
            key: backend.key.clone(),
            region: backend.region,
            lock_table: backend.dynamodb_table.clone(),
        }
    }

    /// True when `backend` persists to this location.
    pub fn is_backend(&self, backend: &S3Backend) -> bool {
        self.bucket == backend.bucket && self.key == backend.key
    }
}

/// Read-only handle on a named output of another stack's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteStateReference {
    /// Data source name inside the reading stack.
    pub name: String,
    pub location: RemoteStateLocation,
    pub output_name: String,
}

impl RemoteStateReference {
    pub fn new(
        name: impl Into<String>,
        location: RemoteStateLocation,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            output_name: output_name.into(),
        }
    }

    /// Body of the `terraform_remote_state` data source.
    pub fn data_source_body(&self) -> Value {
        json!({
            "backend": "s3",
            "config": {
                "bucket": self.location.bucket,
                "key": self.location.key,
                "region": self.location.region,
                "dynamodb_table": self.location.lock_table,
            }
        })
    }

    /// Bare traversal of the referenced output, for use inside larger expressions.
    pub fn traversal(&self) -> String {
        format!(
            "data.terraform_remote_state.{}.outputs.{}",
            self.name, self.output_name
        )
    }

    /// Interpolation that resolves the referenced output at apply time.
    pub fn expression(&self) -> String {
        format!("${{{}}}", self.traversal())
    }
}
