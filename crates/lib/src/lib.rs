//! dexrule-lib: Core types and logic for dexrule
//!
//! This crate declares the rules that turn Java sources into installable,
//! optionally dexed and repackaged archives:
//! - `Classpath`: ordered classpath entries and their tool-specific renderings
//! - `BuildFlags`: the immutable per-module option bundle fed to every stage
//! - `RuleRegistry`: the command templates for each invocable build step
//! - `Pipeline`: one declaration per stage, submitted to a `BuildEngine`

pub mod classpath;
pub mod consts;
pub mod engine;
pub mod flags;
pub mod module;
pub mod pipeline;
pub mod placeholder;
pub mod rule;
pub mod toolchain;
pub mod util;
