//! Error types

mod config;
mod controller;

pub use config::*;
pub use controller::*;
