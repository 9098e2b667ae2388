//! GitHub Actions role stack.
//!
//! The role trusts the GitHub OIDC provider and may push to the registry
//! published by the registry stack. The registry address is read from that
//! stack's persisted state, so the registry stack has to be applied first;
//! otherwise Terraform fails at apply time because the output does not exist.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::backend::{RemoteStateLocation, RemoteStateReference, StateKey};
use crate::params::EnvironmentParameters;
use crate::stack::{Block, Output, StackDeclaration, StackKind};
use crate::stacks::registry::REPOSITORY_URL_OUTPUT;

/// Data source name of the registry state import.
pub const REGISTRY_STATE_NAME: &str = "ecr-state";

/// Resource name of the role inside the stack.
pub const ROLE_NAME: &str = "github-action-role";

/// Local holding the registry ARN derived from its URL.
pub const REPOSITORY_ARN_LOCAL: &str = "ecr_repository_arn";

const PUSH_ACTIONS: [&str; 7] = [
    "ecr:BatchCheckLayerAvailability",
    "ecr:BatchGetImage",
    "ecr:CompleteLayerUpload",
    "ecr:GetDownloadUrlForLayer",
    "ecr:InitiateLayerUpload",
    "ecr:PutImage",
    "ecr:UploadLayerPart",
];

/// Which CI identities may assume the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CiTrust {
    /// Host of the OIDC identity provider registered in the account.
    pub oidc_host: String,
    pub audience: String,
    /// `sub` claim pattern, e.g. `repo:<org>/<repo>:*`.
    pub subject: String,
}

impl Default for CiTrust {
    fn default() -> Self {
        Self {
            oidc_host: "token.actions.githubusercontent.com".to_string(),
            audience: "sts.amazonaws.com".to_string(),
            subject: "repo:grit-coding/*".to_string(),
        }
    }
}

/// Declares the CI role and its read of the registry state.
pub struct CiRoleStack;

impl CiRoleStack {
    pub fn declare(
        params: &EnvironmentParameters,
        state_key: StateKey,
        registry_state: &RemoteStateLocation,
        trust: &CiTrust,
    ) -> StackDeclaration {
        let registry = RemoteStateReference::new(
            REGISTRY_STATE_NAME,
            registry_state.clone(),
            REPOSITORY_URL_OUTPUT,
        );

        // <account>.dkr.ecr.<region>.amazonaws.com/<name> -> arn:aws:ecr:<region>:<account>:repository/<name>
        let url = registry.traversal();
        let repository_arn = format!(
            "arn:aws:ecr:${{element(split(\".\", {url}), 3)}}:${{element(split(\".\", {url}), 0)}}:repository/${{join(\"/\", slice(split(\"/\", {url}), 1, length(split(\"/\", {url}))))}}",
            url = url
        );

        let caller = Block::new("aws_caller_identity", "current", json!({}));
        let federated = format!(
            "arn:aws:iam::{}:oidc-provider/{}",
            caller.data_attribute("account_id"),
            trust.oidc_host
        );

        let assume_role_policy = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Federated": federated },
                "Action": "sts:AssumeRoleWithWebIdentity",
                "Condition": {
                    "StringEquals": { format!("{}:aud", trust.oidc_host): trust.audience },
                    "StringLike": { format!("{}:sub", trust.oidc_host): trust.subject },
                },
            }],
        });

        let role = Block::new(
            "aws_iam_role",
            ROLE_NAME,
            json!({
                "name": format!("{}-{}-github-action-role", params.resource_prefix, params.environment),
                "description": format!("Assumed by GitHub Actions in {}", params.environment),
                "assume_role_policy": assume_role_policy.to_string(),
            }),
        );

        let push_policy = json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Action": "ecr:GetAuthorizationToken",
                    "Resource": "*",
                },
                {
                    "Effect": "Allow",
                    "Action": PUSH_ACTIONS,
                    "Resource": format!("${{local.{}}}", REPOSITORY_ARN_LOCAL),
                },
            ],
        });

        let role_policy = Block::new(
            "aws_iam_role_policy",
            "ecr-push",
            json!({
                "name": format!("{}-{}-ecr-push", params.resource_prefix, params.environment),
                "role": role.attribute("id"),
                "policy": push_policy.to_string(),
            }),
        );

        let role_arn = role.attribute("arn");
        let registry_url = registry.expression();

        let stack = StackDeclaration::new(StackKind::CiRole, params, state_key)
            .with_remote_state(registry)
            .with_data_source(caller)
            .with_local(REPOSITORY_ARN_LOCAL, json!(repository_arn))
            .with_resource(role)
            .with_resource(role_policy)
            .with_output(
                Output::new("github-action-role-arn", role_arn)
                    .with_description("Role ARN for aws-actions/configure-aws-credentials"),
            )
            .with_output(Output::new(REPOSITORY_URL_OUTPUT, registry_url));

        debug!(
            "Declared CI role stack {} reading {}",
            stack.id, registry_state.key
        );
        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::S3Backend;
    use crate::region::{Environment, Region};
    use serde_json::Value;

    fn dev_registry_state() -> RemoteStateLocation {
        let dev = EnvironmentParameters::for_environment(Environment::Dev);
        RemoteStateLocation::of(&S3Backend::bind(&dev, StateKey::new("core", "ecrStack")))
    }

    fn stack_for(env: Environment) -> StackDeclaration {
        let params = EnvironmentParameters::for_environment(env);
        CiRoleStack::declare(
            &params,
            StateKey::new("core", "gitHubActionRole"),
            &dev_registry_state(),
            &CiTrust::default(),
        )
    }

    #[test]
    fn test_reads_registry_state() {
        let doc = stack_for(Environment::Staging).to_document();
        let state = doc.data_source("terraform_remote_state", "ecr-state").unwrap();

        assert_eq!(state["backend"], "s3");
        assert_eq!(state["config"]["bucket"], "grit-coding-terraform-dev");
        assert_eq!(state["config"]["key"], "core/ecrStack.tfstate");
        assert_eq!(state["config"]["region"], "eu-west-2");
    }

    #[test]
    fn test_role_trusts_github_oidc() {
        let doc = stack_for(Environment::Dev).to_document();
        let roles = doc.resources_of_type("aws_iam_role");
        assert_eq!(roles.len(), 1);

        let (_, role) = roles[0];
        assert_eq!(role["name"], "core-infra-dev-github-action-role");

        let policy: Value = serde_json::from_str(role["assume_role_policy"].as_str().unwrap()).unwrap();
        let statement = &policy["Statement"][0];
        assert_eq!(statement["Action"], "sts:AssumeRoleWithWebIdentity");
        assert_eq!(
            statement["Principal"]["Federated"],
            "arn:aws:iam::${data.aws_caller_identity.current.account_id}:oidc-provider/token.actions.githubusercontent.com"
        );
        assert_eq!(
            statement["Condition"]["StringLike"]["token.actions.githubusercontent.com:sub"],
            "repo:grit-coding/*"
        );
    }

    #[test]
    fn test_push_policy_scoped_to_registry() {
        let stack = stack_for(Environment::Production);
        let doc = stack.to_document();

        let arn = doc.locals["ecr_repository_arn"].as_str().unwrap();
        assert!(arn.starts_with("arn:aws:ecr:${element(split("));
        assert!(arn.contains("data.terraform_remote_state.ecr-state.outputs.ecr-repo-url"));

        let (_, role_policy) = doc.resources_of_type("aws_iam_role_policy")[0];
        assert_eq!(role_policy["role"], "${aws_iam_role.github-action-role.id}");
        let policy: Value = serde_json::from_str(role_policy["policy"].as_str().unwrap()).unwrap();
        assert_eq!(policy["Statement"][1]["Resource"], "${local.ecr_repository_arn}");
    }

    #[test]
    fn test_registry_arn_is_derived_from_url() {
        let params = EnvironmentParameters::for_environment(Environment::Staging).with_region(Region::UsEast1);
        let stack = CiRoleStack::declare(
            &params,
            StateKey::new("core", "gitHubActionRole"),
            &dev_registry_state(),
            &CiTrust::default(),
        );
        let arn = stack.locals["ecr_repository_arn"].as_str().unwrap().to_string();
        let url = "data.terraform_remote_state.ecr-state.outputs.ecr-repo-url";

        assert!(arn.starts_with(&format!("arn:aws:ecr:${{element(split(\".\", {}), 3)}}:", url)));
        assert!(!arn.contains("eu-west-2"));
        assert!(!arn.contains("us-east-1"));
        assert_eq!(stack.provider.region, Region::UsEast1);
    }

    #[test]
    fn test_registry_arn_keeps_namespaced_repository_name() {
        let arn = stack_for(Environment::Dev).locals["ecr_repository_arn"]
            .as_str()
            .unwrap()
            .to_string();
        let url = "data.terraform_remote_state.ecr-state.outputs.ecr-repo-url";

        assert!(arn.ends_with(&format!(
            ":repository/${{join(\"/\", slice(split(\"/\", {url}), 1, length(split(\"/\", {url}))))}}",
            url = url
        )));
        assert!(!arn.contains(&format!("element(split(\"/\", {}), 1)", url)));
    }

    #[test]
    fn test_outputs() {
        let doc = stack_for(Environment::Dev).to_document();
        assert_eq!(doc.output["github-action-role-arn"]["value"], "${aws_iam_role.github-action-role.arn}");
        assert_eq!(
            doc.output["ecr-repo-url"]["value"],
            "${data.terraform_remote_state.ecr-state.outputs.ecr-repo-url}"
        );
    }
}
