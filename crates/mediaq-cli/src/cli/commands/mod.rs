//! CLI command handlers, one per file.

mod cancel;
mod config;
mod fetch;
mod run;
mod status;

pub use cancel::run_cancel;
pub use config::run_config;
pub use fetch::run_fetch;
pub use run::run_bot;
pub use status::run_status;
