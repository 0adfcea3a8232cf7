//! Small contracts shared by the shipwright crates: error reporting and
//! workspace path handling. Kept free of configuration and protocol types so
//! every other crate can depend on it.

pub mod errors;
pub mod paths;

pub use errors::{
    ChainErrorFormatter, ErrorFormatter, ErrorReporter, MemoryErrorReporter, TracingErrorReporter,
};
pub use paths::{ProjectDir, SubpathError, normalize_path, resolve_project_dir, validate_subpath};
