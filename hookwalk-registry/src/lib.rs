//! hookwalk registry: the hook contract, type resolution, and providers.
//!
//! - [`hook`]: [`Hook`] trait, schemas, descriptors
//! - [`declarative`]: hooks defined in YAML files
//! - [`registry`]: [`HookRegistry`] with local / global / built-in scopes
//! - [`provider`]: provider references (`gh:owner/repo@v1`, paths, URLs)
//! - [`cache`]: on-disk provider cache with per-entry locking
//! - [`fetch`]: [`ProviderFetcher`] and the git implementation

pub mod cache;
pub mod declarative;
pub mod error;
pub mod fetch;
pub mod hook;
pub mod provider;
pub mod registry;

pub use cache::{ProviderCache, ProviderMetadata};
pub use declarative::DeclarativeHook;
pub use error::{HookError, RegistryError};
pub use fetch::{GitFetcher, ProviderFetcher};
pub use hook::{
    native, ExecEnv, FieldKind, FieldSpec, Hook, HookCtor, HookDescriptor, HookImpl,
    HookOutcome, HookSchema, HookSource,
};
pub use provider::{ProviderLocation, ProviderRef};
pub use registry::{HookRegistry, Scope};
