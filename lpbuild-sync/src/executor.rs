//! Applies a [`ReconciliationResult`] through a [`RemoteGateway`].
//!
//! Only recipes that must be created or updated are touched. Orphan recipes
//! and missing branches are reported elsewhere and never acted upon.

use serde::Serialize;

use crate::error::{GatewayError, SyncError};
use crate::gateway::{RecipeField, RemoteGateway};
use crate::reconcile::ReconciliationResult;

/// What was done to one recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecipeAction {
    Created,
    Updated { fields: Vec<RecipeField> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRecipe {
    pub name: String,
    #[serde(flatten)]
    pub action: RecipeAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecipe {
    pub name: String,
    pub error: String,
}

/// Outcome of [`apply`] for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<AppliedRecipe>,
    pub failed: Vec<FailedRecipe>,
    pub unchanged: Vec<String>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Create missing recipes and update changed ones.
///
/// Returns [`SyncError::NotConfirmed`] without calling the gateway when
/// `confirmed` is false. Once confirmed, a failing recipe is recorded in
/// [`ApplyReport::failed`] and the remaining recipes are still attempted.
pub fn apply<G: RemoteGateway + ?Sized>(
    result: &ReconciliationResult,
    gateway: &mut G,
    confirmed: bool,
) -> Result<ApplyReport, SyncError> {
    if !confirmed {
        return Err(SyncError::NotConfirmed);
    }

    let mut report = ApplyReport::default();
    for plan in result.recipes.values() {
        let outcome: Result<Option<RecipeAction>, GatewayError> = if !plan.exists {
            tracing::info!("creating recipe {}", plan.name);
            gateway
                .create_recipe(&result.new_recipe(plan))
                .map(|_| Some(RecipeAction::Created))
        } else if let (Some(remote), Some(changes)) = (&plan.remote, plan.changes()) {
            let fields: Vec<RecipeField> = changes.fields.iter().copied().collect();
            tracing::info!(
                "updating recipe {}: {}",
                plan.name,
                fields.iter().map(RecipeField::as_str).collect::<Vec<_>>().join(", ")
            );
            gateway
                .update_recipe(remote, &changes)
                .map(|()| Some(RecipeAction::Updated { fields }))
        } else {
            tracing::debug!("no changes needed for recipe {}", plan.name);
            Ok(None)
        };

        match outcome {
            Ok(Some(action)) => report.applied.push(AppliedRecipe {
                name: plan.name.clone(),
                action,
            }),
            Ok(None) => report.unchanged.push(plan.name.clone()),
            Err(e) => {
                tracing::error!("recipe {} failed: {e}", plan.name);
                report.failed.push(FailedRecipe {
                    name: plan.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "{}: {} applied, {} failed, {} unchanged",
        result.project,
        report.applied.len(),
        report.failed.len(),
        report.unchanged.len()
    );
    Ok(report)
}
