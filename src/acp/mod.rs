//! Client-side callbacks served to the ACP agent

pub mod client;
pub mod filesystem;
pub mod permissions;

pub use client::WorkflowClient;
pub use filesystem::{FileAccessPolicy, FsAccessError};
pub use permissions::{AutoApprovePolicy, PermissionPolicy, auto_approve, first_allow_option};
