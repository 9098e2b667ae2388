//! ECR image registry stack.

use serde_json::json;
use tracing::debug;

use crate::backend::StateKey;
use crate::params::EnvironmentParameters;
use crate::stack::{Block, Output, StackDeclaration, StackKind};

/// Resource type of the registry.
pub const REPOSITORY_TYPE: &str = "aws_ecr_repository";

/// Resource name of the registry inside the stack.
pub const REPOSITORY_NAME: &str = "ecr-repo";

/// Output other stacks read the registry address from.
pub const REPOSITORY_URL_OUTPUT: &str = "ecr-repo-url";

/// Tag mutability policy: pushing an existing tag overwrites it.
pub const TAG_MUTABILITY: &str = "MUTABLE";

/// Declares one scanned, mutable-tag ECR repository named after the resource prefix.
pub struct RegistryStack;

impl RegistryStack {
    pub fn declare(params: &EnvironmentParameters, state_key: StateKey) -> StackDeclaration {
        let repository = Block::new(
            REPOSITORY_TYPE,
            REPOSITORY_NAME,
            json!({
                "name": params.resource_prefix,
                "image_scanning_configuration": {
                    "scan_on_push": true,
                },
                "image_tag_mutability": TAG_MUTABILITY,
            }),
        );
        let url = repository.attribute("repository_url");

        let stack = StackDeclaration::new(StackKind::Registry, params, state_key)
            .with_resource(repository)
            .with_output(Output::new(REPOSITORY_URL_OUTPUT, url));

        debug!("Declared registry stack {}", stack.id);
        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Environment;

    fn dev_stack() -> StackDeclaration {
        let params = EnvironmentParameters::for_environment(Environment::Dev);
        RegistryStack::declare(&params, StateKey::new("core", "ecrStack"))
    }

    #[test]
    fn test_registry_declares_one_repository() {
        let doc = dev_stack().to_document();
        let repos = doc.resources_of_type(REPOSITORY_TYPE);

        assert_eq!(doc.resource_count(), 1);
        assert_eq!(repos.len(), 1);

        let (name, body) = repos[0];
        assert_eq!(name, "ecr-repo");
        assert_eq!(body["name"], "core-infra");
        assert_eq!(body["image_scanning_configuration"]["scan_on_push"], true);
        assert_eq!(body["image_tag_mutability"], "MUTABLE");
    }

    #[test]
    fn test_registry_exposes_url_output() {
        let doc = dev_stack().to_document();
        assert_eq!(doc.output.len(), 1);
        assert_eq!(
            doc.output["ecr-repo-url"]["value"],
            "${aws_ecr_repository.ecr-repo.repository_url}"
        );
    }

    #[test]
    fn test_registry_has_no_remote_state() {
        let stack = dev_stack();
        assert!(stack.remote_state.is_empty());
        assert!(stack.to_document().data.is_empty());
    }
}
