pub mod borg;
pub mod cli;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod logging;
pub mod notify;
pub mod settings;
pub mod signal_handler;
pub mod types;
pub mod util;
