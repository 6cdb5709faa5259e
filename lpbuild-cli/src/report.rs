//! Read-only renderings of declared config and reconciliation results.
//!
//! Every function returns a `String`; printing is left to the commands.

use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use lpbuild_core::ProjectSpec;
use lpbuild_sync::{ApplyReport, RecipeAction, ReconciliationResult};

const NAME_WIDTH: usize = 35;

fn clip(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

// ---------------------------------------------------------------------------
// list / config
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "team")]
    team: String,
    #[tabled(rename = "charmhub")]
    charmhub: String,
    #[tabled(rename = "launchpad")]
    launchpad: String,
    #[tabled(rename = "branches")]
    branches: usize,
    #[tabled(rename = "repository")]
    repository: String,
}

pub fn render_list(projects: &[&ProjectSpec]) -> String {
    if projects.is_empty() {
        return "No projects declared.".to_owned();
    }
    let rows: Vec<ProjectRow> = projects
        .iter()
        .map(|p| ProjectRow {
            name: p.name.to_string(),
            team: p.team.clone(),
            charmhub: p.charmhub.clone().unwrap_or_default(),
            launchpad: p.remote_project.clone(),
            branches: p.branches.len(),
            repository: p.repository.clone().unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

#[derive(Serialize)]
struct ConfigDocument<'a> {
    projects: &'a [&'a ProjectSpec],
}

/// The declared config, with every default applied, as YAML.
pub fn render_config(projects: &[&ProjectSpec]) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&ConfigDocument { projects })
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

/// One line per project: whether changes are needed, then the counts of
/// creates, updates, orphans and missing branches.
pub fn diff_summary_line(result: &ReconciliationResult) -> String {
    let status = if result.needs_changes() {
        format!("{:20}", "Changes required").yellow().to_string()
    } else {
        format!("{:20}", "No changes needed").green().to_string()
    };
    format!(
        "{:width$} {status} create: {}, update: {}, orphans: {}, missing branches: {}",
        clip(&result.project.0, NAME_WIDTH),
        result.creates().count(),
        result.updates().count(),
        result.non_config_recipes.len(),
        result.missing_branches_in_repo.len(),
        width = NAME_WIDTH
    )
}

pub fn render_diff(result: &ReconciliationResult, detail: bool) -> String {
    let mut lines = vec![diff_summary_line(result)];
    if !detail {
        return lines.join("\n");
    }

    if !result.non_config_recipes.is_empty() {
        lines.push(" * Recipes that have no corresponding config:".to_owned());
        for name in &result.non_config_recipes {
            lines.push(format!("   - {name}"));
        }
    }

    let pending: Vec<String> = result
        .recipes
        .values()
        .filter_map(|plan| {
            if !plan.exists {
                Some(format!("    - {:w$} : Needs creating.", plan.name, w = NAME_WIDTH))
            } else if plan.changed {
                let changes: Vec<String> = plan
                    .changed_fields
                    .iter()
                    .map(|f| format!("recipe.{f} = {}", plan.desired.describe(*f)))
                    .collect();
                Some(format!("    - {:w$} : {}", plan.name, changes.join(", "), w = NAME_WIDTH))
            } else {
                None
            }
        })
        .collect();
    if !pending.is_empty() {
        lines.push(" * Recipes that require changes:".to_owned());
        lines.extend(pending);
    }

    if !result.missing_branches_in_repo.is_empty() {
        lines.push(" * Branches in config but missing from the repo:".to_owned());
        for branch in &result.missing_branches_in_repo {
            lines.push(format!("    - {}", branch.short_name()));
        }
    }
    lines.join("\n")
}

/// Machine-readable form of one project's `diff`.
#[derive(Debug, Serialize)]
pub struct DiffJson {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub changes_required: bool,
    pub create: Vec<String>,
    pub update: Vec<UpdateJson>,
    pub unchanged: usize,
    pub orphans: Vec<String>,
    pub missing_branches: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateJson {
    pub name: String,
    pub fields: Vec<String>,
}

impl DiffJson {
    pub fn from_result(result: &ReconciliationResult) -> Self {
        Self {
            project: result.project.to_string(),
            error: None,
            changes_required: result.needs_changes(),
            create: result.creates().map(|p| p.name.clone()).collect(),
            update: result
                .updates()
                .map(|p| UpdateJson {
                    name: p.name.clone(),
                    fields: p.changed_fields.iter().map(|f| f.to_string()).collect(),
                })
                .collect(),
            unchanged: result.unchanged().count(),
            orphans: result.non_config_recipes.clone(),
            missing_branches: result
                .missing_branches_in_repo
                .iter()
                .map(|b| b.short_name().to_owned())
                .collect(),
        }
    }

    pub fn from_error(project: &str, error: &impl std::fmt::Display) -> Self {
        Self {
            project: project.to_owned(),
            error: Some(error.to_string()),
            changes_required: false,
            create: Vec::new(),
            update: Vec::new(),
            unchanged: 0,
            orphans: Vec::new(),
            missing_branches: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct RecipeRow {
    #[tabled(rename = "recipe")]
    recipe: String,
    #[tabled(rename = "git branch")]
    branch: String,
    #[tabled(rename = "channels")]
    channels: String,
}

/// The remote recipe → branch → channels mapping for configured recipes.
pub fn render_show(result: &ReconciliationResult) -> String {
    let mut lines = vec![
        format!("{}:", result.project.to_string().bold()),
        format!(" * launchpad project: {}", result.remote_project),
        format!(" * repo: {}", result.repository),
    ];

    let rows: Vec<RecipeRow> = result
        .recipes
        .values()
        .filter_map(|plan| plan.remote.as_ref())
        .map(|remote| RecipeRow {
            recipe: remote.name.clone(),
            branch: remote.git_ref.short_name().to_owned(),
            channels: remote.attrs.store_channels.join(", "),
        })
        .collect();
    if rows.is_empty() {
        lines.push(" * No recipes configured in launchpad matching channels.".to_owned());
    } else {
        lines.push(" * Recipes configured in launchpad matching channels:".to_owned());
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        lines.push(table.to_string());
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// errors / sync
// ---------------------------------------------------------------------------

/// A per-project failure line for commands that carry on to the next project.
pub fn error_line(project: &str, error: &impl std::fmt::Display) -> String {
    format!(
        "{:width$} -- {}",
        clip(project, NAME_WIDTH),
        error.to_string().red(),
        width = NAME_WIDTH
    )
}

pub fn render_apply(result: &ReconciliationResult, report: &ApplyReport) -> String {
    let project = &result.project;
    if report.applied.is_empty() && report.failed.is_empty() {
        return format!("{} '{project}' — no changes needed", "✓".green());
    }

    let mark = if report.is_success() {
        "✓".green()
    } else {
        "✗".red()
    };
    let mut lines = vec![format!(
        "{mark} '{project}' synced ({} applied, {} failed, {} unchanged)",
        report.applied.len(),
        report.failed.len(),
        report.unchanged.len()
    )];
    for applied in &report.applied {
        match &applied.action {
            RecipeAction::Created => lines.push(format!("  +  {}", applied.name)),
            RecipeAction::Updated { fields } => {
                let fields: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
                lines.push(format!("  ✎  {} ({})", applied.name, fields.join(", ")))
            }
        }
    }
    for failed in &report.failed {
        lines.push(format!("  {}  {}: {}", "✗".red(), failed.name, failed.error));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    use lpbuild_core::{BranchRef, ProjectName};
    use lpbuild_sync::{AppliedRecipe, FailedRecipe, RecipeAttrs, RecipeField, RecipePlan};

    fn plan(name: &str, exists: bool, changed: &[RecipeField]) -> RecipePlan {
        let desired = RecipeAttrs {
            auto_build: true,
            store_channels: vec!["latest/edge".to_owned()],
            store_upload: true,
            ..RecipeAttrs::default()
        };
        RecipePlan {
            name: name.to_owned(),
            source_branch: BranchRef::from_name("master"),
            track: "latest".to_owned(),
            source_channels: desired.store_channels.clone(),
            exists,
            changed: !changed.is_empty(),
            remote: None,
            desired,
            changed_fields: changed.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn result(plans: Vec<RecipePlan>) -> ReconciliationResult {
        ReconciliationResult {
            project: ProjectName::from("OpenStack Keystone"),
            team: "openstack-charmers".to_owned(),
            remote_project: "charm-keystone".to_owned(),
            repository: "~openstack-charmers/charm-keystone/+git/charm-keystone".to_owned(),
            store_name: Some("keystone".to_owned()),
            recipes: plans.into_iter().map(|p| (p.name.clone(), p)).collect::<BTreeMap<_, _>>(),
            missing_branches_in_repo: Vec::new(),
            non_config_recipes: Vec::new(),
            no_recipe_branches: Vec::new(),
        }
    }

    #[test]
    fn clean_project_needs_no_changes() {
        let r = result(vec![plan("charm-keystone.master.latest", true, &[])]);
        let line = diff_summary_line(&r);
        assert!(line.starts_with("OpenStack Keystone"));
        assert!(line.contains("No changes needed"));
        assert!(line.ends_with("create: 0, update: 0, orphans: 0, missing branches: 0"));
    }

    #[test]
    fn detail_itemizes_creates_updates_orphans_and_missing_branches() {
        let mut r = result(vec![
            plan("charm-keystone.master.latest", false, &[]),
            plan("charm-keystone.master.yoga", true, &[RecipeField::StoreChannels]),
        ]);
        r.non_config_recipes = vec!["foo.legacy.latest".to_owned()];
        r.missing_branches_in_repo = vec![BranchRef::from_name("stable/wallaby")];

        let out = render_diff(&r, true);
        assert!(out.contains("Changes required"));
        assert!(out.contains("create: 1, update: 1, orphans: 1, missing branches: 1"));
        assert!(out.contains("   - foo.legacy.latest"));
        assert!(out.contains("charm-keystone.master.latest"));
        assert!(out.contains("Needs creating."));
        assert!(out.contains("recipe.store_channels = [latest/edge]"));
        assert!(out.contains("    - stable/wallaby"));

        let summary = render_diff(&r, false);
        assert_eq!(summary.lines().count(), 1);
        assert!(summary.contains("create: 1, update: 1, orphans: 1, missing branches: 1"));
    }

    #[test]
    fn json_lists_creates_and_updates() {
        let r = result(vec![
            plan("charm-keystone.master.latest", false, &[]),
            plan("charm-keystone.master.yoga", true, &[RecipeField::AutoBuild]),
        ]);
        let json = serde_json::to_value(DiffJson::from_result(&r)).unwrap();
        assert_eq!(json["changes_required"], true);
        assert_eq!(json["create"][0], "charm-keystone.master.latest");
        assert_eq!(json["update"][0]["fields"][0], "auto_build");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn show_without_remote_recipes_says_so() {
        let r = result(vec![plan("charm-keystone.master.latest", false, &[])]);
        let out = render_show(&r);
        assert!(out.contains(" * launchpad project: charm-keystone"));
        assert!(out.contains("No recipes configured"));
    }

    #[test]
    fn apply_report_lists_each_recipe() {
        let r = result(vec![]);
        let report = ApplyReport {
            applied: vec![
                AppliedRecipe {
                    name: "charm-keystone.master.latest".to_owned(),
                    action: RecipeAction::Created,
                },
                AppliedRecipe {
                    name: "charm-keystone.master.yoga".to_owned(),
                    action: RecipeAction::Updated {
                        fields: vec![RecipeField::BuildPath],
                    },
                },
            ],
            failed: vec![FailedRecipe {
                name: "charm-keystone.stable-xena.xena".to_owned(),
                error: "remote rejected request: boom".to_owned(),
            }],
            unchanged: vec![],
        };
        let out = render_apply(&r, &report);
        assert!(out.contains("(2 applied, 1 failed, 0 unchanged)"));
        assert!(out.contains("+  charm-keystone.master.latest"));
        assert!(out.contains("charm-keystone.master.yoga (build_path)"));
        assert!(out.contains("charm-keystone.stable-xena.xena: remote rejected request: boom"));
    }

    #[test]
    fn list_of_nothing_is_a_message() {
        assert_eq!(render_list(&[]), "No projects declared.");
    }
}
