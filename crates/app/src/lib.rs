pub mod config;
pub mod runtime;

pub use config::AppConfig;
pub use runtime::{start_runtime, AppHandle, AppRuntimeOptions};
