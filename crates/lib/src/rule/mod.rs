//! Rule templates and the registry built from them.
//!
//! A rule is a command template plus the tools it runs and the parameters
//! it accepts. Rules are registered once per process, against a
//! [`Toolchain`](crate::toolchain::Toolchain), and never change afterwards.
//! Every pipeline stage declares invocations of exactly one rule.

mod args;
mod registry;
pub mod templates;
mod types;

pub use args::{DesugarArgs, DxArgs, JarArgs, JavacArgs, JarjarArgs, RuleArgs};
pub use registry::{RegistryBuilder, RuleRegistry};
pub use templates::RuleTemplate;
pub use types::{Param, RuleDef, RuleError, Stage};
