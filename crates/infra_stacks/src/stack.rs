//! Stack declarations.
//!
//! A [`StackDeclaration`] is an immutable value: backend, provider, and the
//! resources, data sources and outputs one Terraform working directory owns.
//! Concrete stacks live in [`crate::stacks`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::backend::{RemoteStateReference, S3Backend, StateKey};
use crate::document::{BlockMap, TerraformDocument};
use crate::error::{InfraError, InfraResult};
use crate::params::EnvironmentParameters;
use crate::provider::{AwsProvider, PROVIDER_NAME};
use crate::region::Environment;

/// Kinds of stack the composition root can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackKind {
    /// Role assumable by GitHub Actions.
    CiRole,
    /// ECR image registry.
    Registry,
}

impl StackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackKind::CiRole => "ci-role",
            StackKind::Registry => "registry",
        }
    }

    /// Suffix of the stack id.
    pub fn id_suffix(&self) -> &'static str {
        match self {
            StackKind::CiRole => "github-action-stack",
            StackKind::Registry => "ecr-stack",
        }
    }

    /// File name (without extension) of the stack's state inside the bucket.
    pub fn state_file(&self) -> &'static str {
        match self {
            StackKind::CiRole => "gitHubActionRole",
            StackKind::Registry => "ecrStack",
        }
    }

    /// `<prefix>-<env>-<suffix>`, e.g. `core-infra-dev-ecr-stack`.
    pub fn stack_id(&self, params: &EnvironmentParameters) -> String {
        format!(
            "{}-{}-{}",
            params.resource_prefix,
            params.environment,
            self.id_suffix()
        )
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StackKind {
    type Err = InfraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ci-role" => Ok(StackKind::CiRole),
            "registry" => Ok(StackKind::Registry),
            _ => Err(InfraError::InvalidStackKind(s.to_string())),
        }
    }
}

/// A typed, named block such as a resource or a data source.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub block_type: String,
    pub name: String,
    pub body: Value,
}

impl Block {
    pub fn new(block_type: impl Into<String>, name: impl Into<String>, body: Value) -> Self {
        Self {
            block_type: block_type.into(),
            name: name.into(),
            body,
        }
    }

    /// Interpolation of one of this block's attributes as a resource.
    pub fn attribute(&self, attribute: &str) -> String {
        format!("${{{}.{}.{}}}", self.block_type, self.name, attribute)
    }

    /// Interpolation of one of this block's attributes as a data source.
    pub fn data_attribute(&self, attribute: &str) -> String {
        format!("${{data.{}.{}.{}}}", self.block_type, self.name, attribute)
    }
}

/// A named value exposed from a stack's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub name: String,
    pub value: String,
    pub description: Option<String>,
}

impl Output {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_block(&self) -> Value {
        match &self.description {
            Some(description) => json!({ "value": self.value, "description": description }),
            None => json!({ "value": self.value }),
        }
    }
}

/// One provisionable unit with its own backend and provider.
#[derive(Debug, Clone, PartialEq)]
pub struct StackDeclaration {
    pub id: String,
    pub kind: StackKind,
    pub parameters: EnvironmentParameters,
    pub backend: S3Backend,
    pub provider: AwsProvider,
    pub locals: BTreeMap<String, Value>,
    pub remote_state: Vec<RemoteStateReference>,
    pub data_sources: Vec<Block>,
    pub resources: Vec<Block>,
    pub outputs: Vec<Output>,
}

impl StackDeclaration {
    /// An empty stack bound to the environment's backend and provider.
    pub fn new(kind: StackKind, parameters: &EnvironmentParameters, state_key: StateKey) -> Self {
        Self {
            id: kind.stack_id(parameters),
            kind,
            parameters: parameters.clone(),
            backend: S3Backend::bind(parameters, state_key),
            provider: AwsProvider::for_environment(parameters),
            locals: BTreeMap::new(),
            remote_state: Vec::new(),
            data_sources: Vec::new(),
            resources: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_local(mut self, name: impl Into<String>, value: Value) -> Self {
        self.locals.insert(name.into(), value);
        self
    }

    pub fn with_remote_state(mut self, reference: RemoteStateReference) -> Self {
        self.remote_state.push(reference);
        self
    }

    pub fn with_data_source(mut self, block: Block) -> Self {
        self.data_sources.push(block);
        self
    }

    pub fn with_resource(mut self, block: Block) -> Self {
        self.resources.push(block);
        self
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn environment(&self) -> Environment {
        self.parameters.environment
    }

    pub fn state_key(&self) -> &StateKey {
        &self.backend.key
    }

    /// Render the Terraform JSON document for this stack.
    pub fn to_document(&self) -> TerraformDocument {
        let mut data = BlockMap::new();
        for reference in &self.remote_state {
            data.entry("terraform_remote_state".to_string())
                .or_default()
                .insert(reference.name.clone(), reference.data_source_body());
        }
        insert_blocks(&mut data, &self.data_sources);

        let mut resource = BlockMap::new();
        insert_blocks(&mut resource, &self.resources);

        TerraformDocument {
            metadata: json!({
                "metadata": {
                    "backend": "s3",
                    "stackName": self.id,
                    "environment": self.environment(),
                    "kind": self.kind,
                    "generator": concat!("core-infra/", env!("CARGO_PKG_VERSION")),
                }
            }),
            terraform: json!({
                "backend": { "s3": self.backend },
                "required_providers": { PROVIDER_NAME: self.provider.requirement() },
            }),
            provider: BTreeMap::from([(PROVIDER_NAME.to_string(), vec![self.provider.to_block()])]),
            locals: self.locals.clone(),
            data,
            resource,
            output: self
                .outputs
                .iter()
                .map(|o| (o.name.clone(), o.to_block()))
                .collect(),
        }
    }

    pub fn to_json(&self) -> InfraResult<String> {
        self.to_document().to_json()
    }
}

fn insert_blocks(map: &mut BlockMap, blocks: &[Block]) {
    for block in blocks {
        map.entry(block.block_type.clone())
            .or_default()
            .insert(block.name.clone(), block.body.clone());
    }
}
