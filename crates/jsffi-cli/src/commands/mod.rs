//! CLI subcommand implementations.

pub mod call;
pub mod init_config;
pub mod modules;
pub mod run;
