//! Concrete stack definitions.

pub mod ci_role;
pub mod registry;

pub use ci_role::{CiRoleStack, CiTrust};
pub use registry::RegistryStack;
