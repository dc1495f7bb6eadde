pub mod archive;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod entry;
mod error;
pub mod logging;
pub mod orchestrator;
pub mod planner;
pub mod probe;
pub mod remote;
pub mod template;
pub mod tools;

pub use error::{Result, YtAudioError};
