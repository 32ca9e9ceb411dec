pub mod aggregate;
pub mod batch_plan;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod progress;
pub mod recognizer;
pub mod report;
pub mod source;
pub mod util;
