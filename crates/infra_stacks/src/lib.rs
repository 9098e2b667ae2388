//! # infra_stacks
//!
//! Terraform stack declarations for the core-infra AWS accounts.
//!
//! Per-environment parameters are merged into two stack kinds, an ECR
//! registry and a GitHub Actions role, and rendered as Terraform JSON
//! working directories. Planning and applying them is left to Terraform.
//!
//! ## Example
//!
//! ```rust,no_run
//! use infra_stacks::{App, InfraConfig};
//! use std::path::Path;
//!
//! let config = InfraConfig::default();
//! let app = App::compose(&config).unwrap();
//! app.synth(Path::new("cdktf.out")).unwrap();
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod params;
pub mod provider;
pub mod region;
pub mod stack;
pub mod stacks;
pub mod validator;

pub use app::{App, ManifestEntry, SynthManifest};
pub use backend::{RemoteStateLocation, RemoteStateReference, S3Backend, StateKey};
pub use config::{InfraConfig, StackPolicy};
pub use document::TerraformDocument;
pub use error::{InfraError, InfraResult};
pub use params::EnvironmentParameters;
pub use provider::AwsProvider;
pub use region::{Environment, Region};
pub use stack::{Block, Output, StackDeclaration, StackKind};
pub use stacks::{CiRoleStack, CiTrust, RegistryStack};
pub use validator::{ConfigValidator, ValidationResult};
