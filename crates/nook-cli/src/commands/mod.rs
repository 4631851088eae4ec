pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod generate;
pub mod status;
pub mod sync;
pub mod watch;
