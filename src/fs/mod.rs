//! Filesystem utilities.
//!
//! # Logging
//!
//! The `logger` submodule provides a logger that writes every line to the
//! console and to a log file (`log.txt` by default). This is useful for
//! debugging issues that only show up on the field.
//!
//! # Example
//!
//! ```ignore
//! use oceanus::fs::logger;
//! use log::{info, LevelFilter};
//!
//! // Initialize the logger at program start
//! logger::init(LevelFilter::Debug).expect("Failed to initialize logger");
//!
//! // Now you can use standard logging macros
//! info!("Robot initialized successfully");
//! ```

/// Console and file logging.
///
/// Provides a logger implementation that writes to both the console
/// and a file.
pub mod logger;
