//! Configuration for shipwright
//!
//! Everything lives in one `shipwright.toml` with an `[agent]`, `[workspace]`,
//! `[image]`, `[workflow]` and `[debug]` section. Every field has a default,
//! so a missing file is equivalent to an empty one. `SHIPWRIGHT_*` variables
//! (see [`constants::env::ShipwrightEnvKey`]) are applied on top of the file.

pub mod agent;
pub mod constants;
pub mod debug;
pub mod image;
pub mod loader;
pub mod workflow;
pub mod workspace;

pub use agent::AgentProcessConfig;
pub use constants::env::ShipwrightEnvKey;
pub use debug::{DebugConfig, TraceLevel};
pub use image::ImageConfig;
pub use loader::{ConfigManager, ShipwrightConfig, parse_bool};
pub use workflow::WorkflowConfig;
pub use workspace::WorkspaceConfig;
