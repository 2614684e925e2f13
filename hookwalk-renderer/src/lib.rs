//! # hookwalk-renderer
//!
//! The render gateway: every `{{ }}` expression in a document is resolved
//! through the [`Renderer`] trait. [`TeraRenderer`] is the stock
//! implementation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hookwalk_core::{ContextStore, Tier, Value};
//! use hookwalk_renderer::{Renderer, TeraRenderer};
//!
//! fn greet(store: &mut ContextStore) {
//!     let _ = store.set(Tier::Public, "name", Value::from("world"));
//!     let renderer = TeraRenderer::new();
//!     if let Ok(v) = renderer.render_str("hello {{ name }}", store) {
//!         println!("{v:?}");
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod gateway;

pub use engine::TeraRenderer;
pub use error::RenderError;
pub use gateway::{is_template, single_expression, truthy, Renderer};
