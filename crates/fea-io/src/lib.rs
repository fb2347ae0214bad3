//! File I/O for portable structural analysis models.
//!
//! This crate provides:
//! - **JSON persistence** of portable records and whole models
//! - **Settings files** in the dotenv format read by the environment
//!   bootstrap

pub mod error;
mod persist;
mod settings;

pub use error::{IoError, Result};
pub use persist::{load_model, load_model_in, read_record, save_model, write_record};
pub use settings::{load_settings, parse_settings};
