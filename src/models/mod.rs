use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ─── Target categories ──────────────────────────────────────────────────────

/// Who a drop is aimed at. The serde names are the server's `type` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetCategory {
    General,
    Division,
    YearGroup,
    Class,
    Student,
}

impl TargetCategory {
    pub const ALL: [TargetCategory; 5] = [
        TargetCategory::General,
        TargetCategory::Division,
        TargetCategory::YearGroup,
        TargetCategory::Class,
        TargetCategory::Student,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Division => "Division",
            Self::YearGroup => "Year Group",
            Self::Class => "Class",
            Self::Student => "Student",
        }
    }

    /// Lookup endpoint for the name list. `General` has none.
    pub fn lookup_path(self) -> Option<&'static str> {
        match self {
            Self::General => None,
            Self::Division => Some("/divisions"),
            Self::YearGroup => Some("/yeargroups"),
            Self::Class => Some("/classes"),
            Self::Student => Some("/pupils"),
        }
    }

    /// Label projection for one lookup item. Returns `None` when the item is
    /// missing the fields this category labels by.
    pub fn project_label(self, item: &serde_json::Value) -> Option<String> {
        let field = |key: &str| {
            item.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        match self {
            Self::General => None,
            Self::Division => field("division_name").map(String::from),
            Self::YearGroup => field("year_group_name").map(String::from),
            Self::Class => field("class_name").map(String::from),
            Self::Student => match (field("surname"), field("first_name")) {
                (Some(surname), Some(first)) => Some(format!("{surname}, {first}")),
                (Some(surname), None) => Some(surname.to_string()),
                (None, Some(first)) => Some(first.to_string()),
                (None, None) => None,
            },
        }
    }
}

// ─── Targets ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub category: TargetCategory,
    /// Zero for `General`; the server may send it as null.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A target as sent in create/update bodies: identity only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadTarget {
    #[serde(rename = "type")]
    pub category: TargetCategory,
    pub id: u64,
}

/// One selectable entry in the target name selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOption {
    pub id: u64,
    pub label: String,
}

// ─── Drops ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropRecord {
    pub id: String,
    /// Author's user id.
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub post_date: Option<DateTime<Utc>>,
    pub expire_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub targets: Vec<Target>,
    pub author_name: Option<String>,
    pub editor_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for `POST /drops` and `PUT /drops/{id}`. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropPayload {
    pub title: String,
    pub content: String,
    pub targets: Vec<PayloadTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_date: Option<String>,
}

// ─── Users / Session ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

impl UserInfo {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }

    /// Whether edit/delete controls are offered for `drop`. The server
    /// repeats this check; this only decides what is drawn.
    pub fn can_manage(&self, drop: &DropRecord) -> bool {
        self.is_admin() || (!self.id.is_empty() && self.id == drop.user_id)
    }
}

/// Returned by `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserNameUpdate {
    pub title: String,
    pub first_name: String,
    pub surname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRoleUpdate {
    pub role: String,
}

// ─── Serde helpers ──────────────────────────────────────────────────────────

fn null_as_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(Option::<u64>::deserialize(d)?.unwrap_or(0))
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drop_with_null_targets_and_general_target_deserializes() {
        let raw = json!({
            "id": "3f1c",
            "user_id": "u-1",
            "title": "Fire drill",
            "content": "",
            "post_date": "0001-01-01T00:00:00Z",
            "expire_date": null,
            "targets": null,
            "author_name": "Ann Smith"
        });
        let drop: DropRecord = serde_json::from_value(raw).unwrap();
        assert!(drop.targets.is_empty());
        assert!(drop.expire_date.is_none());
        assert!(drop.editor_name.is_none());

        let target: Target =
            serde_json::from_value(json!({"type": "General", "id": null})).unwrap();
        assert_eq!(target.category, TargetCategory::General);
        assert_eq!(target.id, 0);
        assert!(target.name.is_none());
    }

    #[test]
    fn unknown_target_type_is_rejected() {
        let res = serde_json::from_value::<Target>(json!({"type": "Custom", "id": 4}));
        assert!(res.is_err());
    }

    #[test]
    fn payload_omits_empty_dates_and_uses_type_tag() {
        let payload = DropPayload {
            title: "Trip".into(),
            content: String::new(),
            targets: vec![PayloadTarget { category: TargetCategory::YearGroup, id: 7 }],
            post_date: Some("2026-10-20".into()),
            expire_date: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["targets"][0]["type"], "YearGroup");
        assert_eq!(value["post_date"], "2026-10-20");
        assert!(value.get("expire_date").is_none());
    }

    #[test]
    fn label_projection_per_category() {
        let pupil = json!({"id": 4, "first_name": "Ada", "surname": "Lovelace"});
        assert_eq!(
            TargetCategory::Student.project_label(&pupil).as_deref(),
            Some("Lovelace, Ada")
        );
        let class = json!({"id": 2, "class_name": "3B"});
        assert_eq!(TargetCategory::Class.project_label(&class).as_deref(), Some("3B"));
        let bare = json!({"id": 9});
        assert_eq!(TargetCategory::Division.project_label(&bare), None);
    }

    #[test]
    fn admin_or_author_can_manage() {
        let drop: DropRecord =
            serde_json::from_value(json!({"id": "d1", "user_id": "author"})).unwrap();
        let author = UserInfo { id: "author".into(), email: String::new(), role: "user".into() };
        let admin = UserInfo { id: "x".into(), email: String::new(), role: "Admin".into() };
        let other = UserInfo { id: "y".into(), email: String::new(), role: "user".into() };
        assert!(author.can_manage(&drop));
        assert!(admin.can_manage(&drop));
        assert!(!other.can_manage(&drop));
    }
}
