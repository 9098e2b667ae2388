//! Terraform JSON configuration documents.
//!
//! A document is the `cdk.tf.json` artifact consumed by `terraform init/plan/apply`.
//! All maps are ordered so the same declaration always serializes to the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InfraResult;

/// Blocks keyed by type, then by name (`resource.<type>.<name>`).
pub type BlockMap = BTreeMap<String, BTreeMap<String, Value>>;

/// One stack's Terraform JSON configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformDocument {
    #[serde(rename = "//")]
    pub metadata: Value,
    pub terraform: Value,
    pub provider: BTreeMap<String, Vec<Value>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locals: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BlockMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource: BlockMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output: BTreeMap<String, Value>,
}

impl TerraformDocument {
    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> InfraResult<String> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        Ok(content)
    }

    pub fn from_json(content: &str) -> InfraResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// All resources of one type, by name.
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&String, &Value)> {
        self.resource
            .get(resource_type)
            .map(|blocks| blocks.iter().collect())
            .unwrap_or_default()
    }

    pub fn data_source(&self, data_type: &str, name: &str) -> Option<&Value> {
        self.data.get(data_type).and_then(|blocks| blocks.get(name))
    }

    /// The `terraform.backend.s3` block, if any.
    pub fn s3_backend(&self) -> Option<&Value> {
        self.terraform.get("backend").and_then(|b| b.get("s3"))
    }

    pub fn resource_count(&self) -> usize {
        self.resource.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TerraformDocument {
        let mut resource = BlockMap::new();
        resource
            .entry("aws_ecr_repository".to_string())
            .or_default()
            .insert("ecr-repo".to_string(), json!({ "name": "core-infra" }));

        TerraformDocument {
            metadata: json!({ "metadata": { "stackName": "sample" } }),
            terraform: json!({ "backend": { "s3": { "bucket": "b", "key": "k" } } }),
            provider: BTreeMap::from([("aws".to_string(), vec![json!({ "region": "eu-west-2" })])]),
            locals: BTreeMap::new(),
            data: BlockMap::new(),
            resource,
            output: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let content = sample().to_json().unwrap();
        assert!(content.contains("\"//\""));
        assert!(!content.contains("\"data\""));
        assert!(!content.contains("\"locals\""));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_lookup_helpers() {
        let doc = TerraformDocument::from_json(&sample().to_json().unwrap()).unwrap();
        assert_eq!(doc.resource_count(), 1);
        assert_eq!(doc.resources_of_type("aws_ecr_repository").len(), 1);
        assert!(doc.resources_of_type("aws_iam_role").is_empty());
        assert_eq!(doc.s3_backend().unwrap()["bucket"], "b");
        assert!(doc.data_source("terraform_remote_state", "x").is_none());
    }
}
