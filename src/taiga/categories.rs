//! Fixed category table mapping each harvestable category to its query
//! template, required fields, and result shape.
//!
//! The table replaces ad hoc per-call field lists: every category is declared
//! once, and both the fetch path and the classification path read from it.

use super::error::{Result, TaigaError};

/// Shape of the JSON document an endpoint returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
  /// A single JSON object (project basics, stats).
  Dict,
  /// A JSON array of records, possibly paginated.
  List,
}

/// One entry of the category table.
#[derive(Debug)]
pub struct CategorySpec {
  /// Category name as requested by callers.
  pub name: &'static str,
  /// Query template relative to the API base URL; `{}` is the project id.
  pub template: &'static str,
  /// Fields every item of this category is required to carry. These sets are
  /// also used to classify items back into categories, so they must be
  /// distinctive per category.
  pub fields: &'static [&'static str],
  /// Whether the endpoint returns a single object or an array.
  pub shape: Shape,
}

impl CategorySpec {
  /// Render the query for a concrete project id.
  pub fn query(&self, project: &str) -> String {
    self.template.replacen("{}", project, 1)
  }
}

/// The fixed set of categories the backend knows how to harvest.
pub const CATEGORY_MAP: &[CategorySpec] = &[
  CategorySpec {
    name: "basics",
    template: "projects/{}",
    fields: &["members", "videoconferences"],
    shape: Shape::Dict,
  },
  CategorySpec {
    name: "stats",
    template: "projects/{}/stats",
    fields: &[
      "total_milestones",
      "total_points",
      "closed_points",
      "defined_points",
      "assigned_points",
    ],
    shape: Shape::Dict,
  },
  CategorySpec {
    name: "issues_stats",
    template: "projects/{}/issues_stats",
    fields: &[
      "total_issues",
      "opened_issues",
      "closed_issues",
      "issues_per_priority",
      "issues_per_severity",
      "issues_per_status",
    ],
    shape: Shape::Dict,
  },
  CategorySpec {
    name: "epics",
    template: "epics?project={}",
    fields: &["epics_order"],
    shape: Shape::List,
  },
  CategorySpec {
    name: "userstories",
    template: "userstories?project={}",
    fields: &["backlog_order", "sprint_order"],
    shape: Shape::List,
  },
  CategorySpec {
    name: "tasks",
    template: "tasks?project={}",
    fields: &["user_story", "milestone"],
    shape: Shape::List,
  },
  CategorySpec {
    name: "wiki",
    template: "wiki?project={}",
    fields: &["content"],
    shape: Shape::List,
  },
];

/// Names of all known categories, in table order.
pub fn category_names() -> Vec<&'static str> {
  CATEGORY_MAP.iter().map(|spec| spec.name).collect()
}

/// Look up a category by name. Names are matched case-insensitively after
/// trimming surrounding whitespace.
pub fn lookup(name: &str) -> Result<&'static CategorySpec> {
  let normalized = name.trim().to_lowercase();
  CATEGORY_MAP
    .iter()
    .find(|spec| spec.name == normalized)
    .ok_or_else(|| TaigaError::UnknownCategory(name.to_string()))
}

/// Validate the table invariants: unique names, a project placeholder in
/// every template, and a non-empty required-field set per category.
///
/// Called once at startup by the CLI; a failure here is a programming error,
/// not a runtime condition.
pub fn validate_table() -> Result<()> {
  let mut seen = Vec::with_capacity(CATEGORY_MAP.len());
  for spec in CATEGORY_MAP {
    if seen.contains(&spec.name) {
      return Err(TaigaError::Canary(format!("duplicate category name: {}", spec.name)));
    }
    seen.push(spec.name);

    if !spec.template.contains("{}") {
      return Err(TaigaError::Canary(format!(
        "category {} template has no project placeholder",
        spec.name
      )));
    }
    if spec.fields.is_empty() {
      return Err(TaigaError::Canary(format!("category {} declares no fields", spec.name)));
    }
  }
  Ok(())
}
