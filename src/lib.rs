pub mod checkpoint;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod modules;
pub mod training;
pub mod utils;

pub use error::{ForecastError, Result};
