//! # lpbuild-sync
//!
//! Reconciliation of declared projects against a remote build system.
//!
//! Call [`reconcile`] to compute a [`ReconciliationResult`] for one project,
//! then [`apply`] it (with confirmation) to create and update recipes.
//! [`InMemoryGateway`] with [`state_store`] provides a file-backed remote.

pub mod error;
pub mod executor;
pub mod gateway;
pub mod memory;
pub mod reconcile;
pub mod state_store;

pub use error::{GatewayError, SyncError};
pub use executor::{apply, ApplyReport, AppliedRecipe, FailedRecipe, RecipeAction};
pub use gateway::{
    NewRecipe, RecipeAttrs, RecipeChanges, RecipeField, RemoteGateway, RemoteProject,
    RemoteRecipe, Repository, Team, GIT_VCS,
};
pub use memory::{InMemoryGateway, RemoteState, RepositoryRecord};
pub use reconcile::{reconcile, RecipePlan, ReconciliationResult, RemoteTarget, RepositoryPolicy};
