pub mod config;
pub mod diagnose;
pub mod document;
pub mod error;
pub mod history;
pub mod io;
pub mod metrics;
pub mod paths;
pub mod pipeline;
pub mod plan;
pub mod recommend;
pub mod roster;
pub mod score;
pub mod synthetic;
pub mod team;
pub mod types;

pub use error::{HealthError, Result};
