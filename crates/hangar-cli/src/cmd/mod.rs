pub mod completions;
pub mod config;
pub mod info;
pub mod install;
pub mod list;
pub mod remove;
pub mod status;
pub mod update;
