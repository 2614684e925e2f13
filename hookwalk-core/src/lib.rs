//! hookwalk core library: document types, the context store, settings, errors.
//!
//! Public API surface:
//! - [`types`]: key paths, visibility, the canonical [`HookCall`]
//! - [`context`]: the tiered [`ContextStore`]
//! - [`settings`]: user configuration (`~/.hookwalk/config.yaml`)
//! - [`error`]: [`CoreError`]

pub mod context;
pub mod error;
pub mod settings;
pub mod types;

pub use context::{ContextStore, FrameKind, Lookup, Tier};
pub use error::CoreError;
pub use settings::Settings;
pub use types::{Control, HookCall, KeyPath, Mapping, Segment, Value, Visibility};
