//! Course data model
//!
//! Drafts are the validated, in-memory shape of a course before it is
//! written. Persisted projections are what the store returns after a
//! commit, carrying generated ids, timestamps and order indexes.

use chrono::{DateTime, Utc};
use notebook_common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum modules a persisted course carries
pub const MIN_MODULES: usize = 3;

/// Minimum key takeaways a persisted module carries
pub const MIN_KEY_TAKEAWAYS: usize = 3;

/// Validated course content ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub modules: Vec<ModuleDraft>,
}

/// One module of a draft; takeaway order is list order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDraft {
    pub heading: String,
    pub summary: String,
    pub key_takeaways: Vec<String>,
}

impl CourseDraft {
    /// Check the structural invariants enforced before any write
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("missing required fields".to_string()));
        }
        validate_modules(&self.modules)
    }
}

/// Module-set invariants shared by creation and full replacement
pub fn validate_modules(modules: &[ModuleDraft]) -> Result<()> {
    if modules.len() < MIN_MODULES {
        return Err(Error::Validation("insufficient modules".to_string()));
    }

    for (index, module) in modules.iter().enumerate() {
        if module.heading.trim().is_empty() || module.summary.trim().is_empty() {
            return Err(Error::Validation(format!(
                "module {} must have a heading and summary",
                index + 1
            )));
        }
        if module.key_takeaways.len() < MIN_KEY_TAKEAWAYS {
            return Err(Error::Validation(format!(
                "module {} must have at least {} key takeaways",
                index + 1,
                MIN_KEY_TAKEAWAYS
            )));
        }
    }

    Ok(())
}

/// Partial update. Absent fields are left untouched; `modules`, when
/// present, replaces the whole module subtree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub modules: Option<Vec<ModuleDraft>>,
}

impl CoursePatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("title must not be empty".to_string()));
            }
        }
        if let Some(modules) = &self.modules {
            validate_modules(modules)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.modules.is_none()
    }
}

/// Inbound takeaway: either a bare string or a `{content}` record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TakeawayInput {
    Text(String),
    Record { content: String },
}

impl TakeawayInput {
    pub fn into_content(self) -> String {
        match self {
            TakeawayInput::Text(text) => text,
            TakeawayInput::Record { content } => content,
        }
    }
}

/// Inbound module edit as sent by clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleInput {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_takeaways: Vec<TakeawayInput>,
}

impl From<ModuleInput> for ModuleDraft {
    fn from(input: ModuleInput) -> Self {
        ModuleDraft {
            heading: input.heading,
            summary: input.summary,
            key_takeaways: input
                .key_takeaways
                .into_iter()
                .map(TakeawayInput::into_content)
                .collect(),
        }
    }
}

/// Course row without its module tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully materialized course tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedCourse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_ids: Vec<Uuid>,
    pub modules: Vec<PersistedModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedModule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub heading: String,
    pub summary: String,
    pub order_index: i64,
    pub key_takeaways: Vec<PersistedTakeaway>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedTakeaway {
    pub id: Uuid,
    pub module_id: Uuid,
    pub content: String,
    pub order_index: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(n: usize) -> ModuleDraft {
        ModuleDraft {
            heading: "H".to_string(),
            summary: "S".to_string(),
            key_takeaways: (0..n).map(|i| format!("k{}", i)).collect(),
        }
    }

    fn draft(modules: Vec<ModuleDraft>) -> CourseDraft {
        CourseDraft {
            title: "T".to_string(),
            description: String::new(),
            modules,
        }
    }

    #[test]
    fn test_valid_draft_with_empty_description() {
        assert!(draft(vec![module(3), module(3), module(5)]).validate().is_ok());
    }

    #[test]
    fn test_two_modules_rejected() {
        let err = draft(vec![module(3), module(3)]).validate().unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "insufficient modules"));
    }

    #[test]
    fn test_short_module_rejected_not_repaired() {
        let err = draft(vec![module(3), module(2), module(3)]).validate().unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("module 2")));
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut d = draft(vec![module(3), module(3), module(3)]);
        d.title = "  ".to_string();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_blank_heading_rejected() {
        let mut m = module(3);
        m.heading = String::new();
        assert!(validate_modules(&[module(3), m, module(3)]).is_err());
    }

    #[test]
    fn test_patch_validation() {
        assert!(CoursePatch::default().validate().is_ok());
        assert!(CoursePatch::default().is_empty());

        let empty_title = CoursePatch {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_title.validate().is_err());

        let too_few = CoursePatch {
            modules: Some(vec![module(3)]),
            ..Default::default()
        };
        assert!(too_few.validate().is_err());
    }

    #[test]
    fn test_module_input_accepts_both_takeaway_shapes() {
        let input: ModuleInput = serde_json::from_value(serde_json::json!({
            "heading": "H",
            "summary": "S",
            "key_takeaways": ["a", {"content": "b"}, "c"]
        }))
        .unwrap();

        let draft: ModuleDraft = input.into();
        assert_eq!(draft.key_takeaways, vec!["a", "b", "c"]);
    }
}
