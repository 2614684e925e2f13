//! # hookwalk-engine
//!
//! The interpreter: classifies document nodes, walks them in declaration
//! order against a [`ContextStore`](hookwalk_core::ContextStore), and
//! wraps runs with record / replay / rerun.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hookwalk_core::Settings;
//! use hookwalk_engine::{run, RunOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     let mut options = RunOptions::new(settings);
//!     options.source = Some("hookwalk.yaml".into());
//!     options.no_input = true;
//!     let public = run(options)?;
//!     println!("{}", serde_yaml::to_string(&public)?);
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod error;
pub mod replay;
pub mod run;
pub mod source;
pub mod walker;

pub use classify::{Entry, Node};
pub use error::EngineError;
pub use run::{load, run, run_with, Loaded, Overwrite, Recording, RunOptions};
pub use walker::Walker;
