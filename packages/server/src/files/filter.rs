//! Composable list filters.
//!
//! Each filter is a small predicate object: `is_applicable` decides from the
//! criteria whether the filter participates, `apply` narrows the sequence.
//! The applicable subset is folded over the input in registry order.

use crate::entity::resource;
use crate::models::resource::{ResourceStatus, ResourceType};

/// Caller-supplied filter criteria for resource listings.
#[derive(Debug, Default)]
pub struct ResourceFilterCriteria {
    /// Case-insensitive substring match on the resource name.
    pub name: Option<String>,
    /// Lifecycle status to show. `None` means active resources only.
    pub status: Option<ResourceStatus>,
    pub resource_type: Option<ResourceType>,
}

trait ResourceFilter: Sync {
    fn is_applicable(&self, criteria: &ResourceFilterCriteria) -> bool;
    fn apply(
        &self,
        resources: Vec<resource::Model>,
        criteria: &ResourceFilterCriteria,
    ) -> Vec<resource::Model>;
}

struct NameFilter;

impl ResourceFilter for NameFilter {
    fn is_applicable(&self, criteria: &ResourceFilterCriteria) -> bool {
        criteria.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    fn apply(
        &self,
        resources: Vec<resource::Model>,
        criteria: &ResourceFilterCriteria,
    ) -> Vec<resource::Model> {
        let needle = criteria
            .name
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        resources
            .into_iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Always applicable: with no explicit status, listings show active
/// resources and hide soft-deleted rows.
struct StatusFilter;

impl ResourceFilter for StatusFilter {
    fn is_applicable(&self, _criteria: &ResourceFilterCriteria) -> bool {
        true
    }

    fn apply(
        &self,
        resources: Vec<resource::Model>,
        criteria: &ResourceFilterCriteria,
    ) -> Vec<resource::Model> {
        let wanted = criteria.status.unwrap_or(ResourceStatus::Active);
        resources
            .into_iter()
            .filter(|r| r.status == wanted.as_str())
            .collect()
    }
}

struct TypeFilter;

impl ResourceFilter for TypeFilter {
    fn is_applicable(&self, criteria: &ResourceFilterCriteria) -> bool {
        criteria.resource_type.is_some()
    }

    fn apply(
        &self,
        resources: Vec<resource::Model>,
        criteria: &ResourceFilterCriteria,
    ) -> Vec<resource::Model> {
        let wanted = criteria.resource_type.expect("checked by is_applicable");
        resources
            .into_iter()
            .filter(|r| r.resource_type == wanted.as_str())
            .collect()
    }
}

fn registry() -> [&'static dyn ResourceFilter; 3] {
    [&NameFilter, &StatusFilter, &TypeFilter]
}

/// Fold every applicable filter over the resource sequence.
pub fn apply_filters(
    resources: Vec<resource::Model>,
    criteria: &ResourceFilterCriteria,
) -> Vec<resource::Model> {
    registry()
        .into_iter()
        .filter(|f| f.is_applicable(criteria))
        .fold(resources, |acc, f| f.apply(acc, criteria))
}
