pub mod auth_cmd;
pub mod category;
pub mod common;
pub mod completions;
pub mod config;
pub mod stats;
pub mod sync;
pub mod transfer;
pub mod word;
