//! decor: pick programming-language toolchains, check what is installed and
//! install or update the rest while watching live progress.

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod orchestrator;
pub mod platform;
pub mod probe;
pub mod runner;
pub mod toolchain;
pub mod tracker;

pub use error::{ConfigError, InstallError};
pub use orchestrator::{Backend, Decision, Orchestrator, Outcome, Phase, PromptInput};
pub use tracker::ProgressTracker;
