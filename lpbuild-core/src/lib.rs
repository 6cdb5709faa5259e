//! lpbuild core library: declared build targets, config loading, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes, project/branch entries and normalized specs
//! - [`channels`]: grouping of store channels by track
//! - [`template`]: recipe-name templates
//! - [`loader`]: project-group YAML loading
//! - [`registry`]: [`ProjectRegistry`]
//! - [`error`]: [`ConfigError`]

pub mod channels;
pub mod error;
pub mod loader;
pub mod registry;
pub mod template;
pub mod types;

pub use channels::{group_channels, ChannelGroup};
pub use error::ConfigError;
pub use registry::ProjectRegistry;
pub use types::{
    BranchEntry, BranchRef, BranchSpec, ChannelList, ProjectEntry, ProjectName, ProjectSpec,
};
