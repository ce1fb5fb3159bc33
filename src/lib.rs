pub mod config;
pub mod constants;
pub mod error;
pub mod health;
pub mod network;
pub mod utils;
