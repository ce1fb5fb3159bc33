pub mod cli;
pub mod command;
#[cfg(unix)]
pub mod interface;
pub mod signal_handler;
pub mod tracing;
