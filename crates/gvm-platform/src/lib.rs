mod paths;
mod platform;

pub use paths::{GvmPaths, PathsError, ROOT_ENV_VAR};
pub use platform::Platform;
