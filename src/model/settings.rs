use indexmap::IndexMap;

use super::status::{Status, StatusCategory};

/// The externally supplied status configuration: the ordered eligible-status
/// set per category, plus category metadata for custom statuses.
///
/// This is an explicit value passed into every engine operation that needs
/// status sets — never ambient global state.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    first_level: Vec<Status>,
    intermediate: Vec<Status>,
    task: Vec<Status>,
    /// Category metadata for custom statuses, keyed by raw value, in the
    /// order the user defined them
    custom_categories: IndexMap<String, StatusCategory>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig {
            first_level: vec![Status::proj()],
            intermediate: vec![Status::sub_proj()],
            task: vec![
                Status::todo(),
                Status::doing(),
                Status::done(),
                Status::someday(),
                Status::maybe(),
                Status::future(),
            ],
            custom_categories: IndexMap::new(),
        }
    }
}

impl StatusConfig {
    /// The ordered eligible statuses for a category, in display order.
    /// This drives status cycling and the defaults for new items.
    pub fn statuses_for(&self, category: StatusCategory) -> &[Status] {
        match category {
            StatusCategory::FirstLevel => &self.first_level,
            StatusCategory::Intermediate => &self.intermediate,
            StatusCategory::Task => &self.task,
        }
    }

    /// The default status assigned to newly created items and to containers
    /// promoted/demoted into a category: the first of the category's set.
    pub fn default_status(&self, category: StatusCategory) -> Status {
        self.statuses_for(category)
            .first()
            .cloned()
            .unwrap_or_else(|| match category {
                StatusCategory::FirstLevel => Status::proj(),
                StatusCategory::Intermediate => Status::sub_proj(),
                StatusCategory::Task => Status::todo(),
            })
    }

    /// Resolve the category of any status. Built-ins map to fixed
    /// categories; customs use the registered metadata and default to Task
    /// when unknown.
    pub fn category_of(&self, status: &Status) -> StatusCategory {
        if let Some(cat) = status.builtin_category() {
            return cat;
        }
        self.custom_categories
            .get(&status.raw_value)
            .copied()
            .unwrap_or(StatusCategory::Task)
    }

    /// Look up a custom status by raw value across all category sets
    pub fn custom_by_raw(&self, raw: &str) -> Option<&Status> {
        self.first_level
            .iter()
            .chain(&self.intermediate)
            .chain(&self.task)
            .find(|s| s.is_custom && s.raw_value == raw)
    }

    /// Install a custom status into a category's set and register its
    /// metadata. Uniqueness of the raw value is the caller's concern.
    pub fn register_custom(&mut self, status: Status, category: StatusCategory) {
        self.custom_categories
            .insert(status.raw_value.clone(), category);
        match category {
            StatusCategory::FirstLevel => self.first_level.push(status),
            StatusCategory::Intermediate => self.intermediate.push(status),
            StatusCategory::Task => self.task.push(status),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
