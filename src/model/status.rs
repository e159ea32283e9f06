use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Which tier of the hierarchy a status belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    /// Statuses for top-level containers (projects)
    FirstLevel,
    /// Statuses for nested containers (sub-projects)
    Intermediate,
    /// Statuses for leaf tasks
    Task,
}

/// An item's state: a unique display code plus an optional color override
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    /// Display code, e.g. `TODO`
    pub raw_value: String,
    /// Whether this is a user-defined status (vs. built-in)
    pub is_custom: bool,
    /// Optional override color, e.g. `#FF8800`
    pub color_hex: Option<String>,
}

/// Raw value of the built-in done status
pub const DONE_RAW: &str = "DONE";

static BUILTINS: Lazy<Vec<Status>> = Lazy::new(|| {
    [
        "TODO", "DOING", DONE_RAW, "SOMEDAY", "MAYBE", "FUTURE", "PROJ", "SUB-PROJ",
    ]
    .iter()
    .map(|raw| Status {
        raw_value: raw.to_string(),
        is_custom: false,
        color_hex: None,
    })
    .collect()
});

impl Status {
    /// Construct a user-defined status. Uniqueness of `raw_value` is not
    /// checked here; the settings layer owns that.
    pub fn custom(raw_value: impl Into<String>, color_hex: Option<String>) -> Status {
        Status {
            raw_value: raw_value.into(),
            is_custom: true,
            color_hex,
        }
    }

    pub fn todo() -> Status {
        Self::builtin("TODO")
    }

    pub fn doing() -> Status {
        Self::builtin("DOING")
    }

    pub fn done() -> Status {
        Self::builtin(DONE_RAW)
    }

    pub fn someday() -> Status {
        Self::builtin("SOMEDAY")
    }

    pub fn maybe() -> Status {
        Self::builtin("MAYBE")
    }

    pub fn future() -> Status {
        Self::builtin("FUTURE")
    }

    pub fn proj() -> Status {
        Self::builtin("PROJ")
    }

    pub fn sub_proj() -> Status {
        Self::builtin("SUB-PROJ")
    }

    /// All built-in statuses, in canonical display order
    pub fn all_builtin() -> &'static [Status] {
        &BUILTINS
    }

    /// Look up a built-in status by its raw value
    pub fn builtin_by_raw(raw: &str) -> Option<&'static Status> {
        BUILTINS.iter().find(|s| s.raw_value == raw)
    }

    /// Whether this is the built-in done status
    pub fn is_done(&self) -> bool {
        !self.is_custom && self.raw_value == DONE_RAW
    }

    /// Category for built-in statuses. Custom statuses have no inherent
    /// category; `StatusConfig::category_of` resolves those.
    pub fn builtin_category(&self) -> Option<StatusCategory> {
        if self.is_custom {
            return None;
        }
        match self.raw_value.as_str() {
            "PROJ" => Some(StatusCategory::FirstLevel),
            "SUB-PROJ" => Some(StatusCategory::Intermediate),
            _ => Some(StatusCategory::Task),
        }
    }

    fn builtin(raw: &str) -> Status {
        Status {
            raw_value: raw.to_string(),
            is_custom: false,
            color_hex: None,
        }
    }
}

// Equality is structural on (raw_value, is_custom); color overrides never
// distinguish two statuses.
impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.raw_value == other.raw_value && self.is_custom == other.is_custom
    }
}

impl Eq for Status {}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw_value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
