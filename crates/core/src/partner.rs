//! Partners, partner groups, growers and the scope of a shipment table.
//!
//! Drafts (`CreatePartner`, `CreateGrower`, `CreateGroup`) are validated
//! here before the caller hands them to the backend.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Colour used for a new group when none is picked.
pub const DEFAULT_GROUP_COLOR: &str = "#3B82F6";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Group reference embedded in a partner row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    /// Filled by the backend for list views; never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<i64>,
    #[serde(default)]
    pub group: Option<GroupSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerLocation {
    pub id: DbId,
    pub partner_id: DbId,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
}

/// A named, coloured set of partners treated as one unit for statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerGroup {
    pub id: DbId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub partner_ids: Vec<DbId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grower {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub partners: Vec<crate::shipment::PartnerSummary>,
}

impl Grower {
    /// Name with the city in parentheses, as shown in sidebar headers.
    pub fn display_name(&self) -> String {
        match self.city.as_deref().map(str::trim) {
            Some(city) if !city.is_empty() => format!("{} ({city})", self.name),
            _ => self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// DTO for creating or updating a partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePartner {
    #[serde(default)]
    pub id: Option<DbId>,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
}

impl CreatePartner {
    /// Trim text fields and require a name. Blank city/county become `None`.
    pub fn normalized(self) -> Result<Self, CoreError> {
        Ok(Self {
            id: self.id,
            name: required_name(&self.name, "Partner")?,
            city: trimmed(self.city),
            county: trimmed(self.county),
        })
    }
}

/// DTO for creating or updating a grower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateGrower {
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
}

impl CreateGrower {
    pub fn normalized(self) -> Result<Self, CoreError> {
        Ok(Self {
            name: required_name(&self.name, "Grower")?,
            city: trimmed(self.city),
        })
    }
}

/// DTO for creating a partner group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroup {
    pub name: String,
    pub color: String,
    pub partner_ids: Vec<DbId>,
}

impl CreateGroup {
    /// Build a group draft from the selected partners.
    ///
    /// Fails when the name is blank, when nothing is selected, or when a
    /// selected partner already belongs to a group (a partner can be in
    /// at most one).
    pub fn build(name: &str, color: Option<&str>, members: &[Partner]) -> Result<Self, CoreError> {
        let name = required_name(name, "Group")?;
        if members.is_empty() {
            return Err(CoreError::Validation(
                "Select at least one partner for the group".to_string(),
            ));
        }
        if let Some(taken) = members.iter().find(|p| p.group.is_some()) {
            let group = taken.group.as_ref().map(|g| g.name.as_str()).unwrap_or_default();
            return Err(CoreError::Conflict(format!(
                "{} is already a member of group \"{group}\"; a partner can belong to one group only",
                taken.name
            )));
        }

        let mut seen = HashSet::new();
        let partner_ids = members
            .iter()
            .map(|p| p.id)
            .filter(|id| seen.insert(*id))
            .collect();

        Ok(Self {
            name,
            color: normalize_color(color),
            partner_ids,
        })
    }
}

/// Normalise a colour picker value to `#RRGGBB`.
///
/// Picker values arrive with or without the leading `#`; blank values fall
/// back to [`DEFAULT_GROUP_COLOR`].
pub fn normalize_color(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") | Some("#") => DEFAULT_GROUP_COLOR.to_string(),
        Some(c) if c.starts_with('#') => c.to_string(),
        Some(c) => format!("#{c}"),
    }
}

fn required_name(raw: &str, entity: &str) -> Result<String, CoreError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CoreError::Validation(format!("{entity} name must not be empty")));
    }
    Ok(name.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// What a shipment table is showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsScope {
    /// One persisted partner. New rows belong to it.
    Partner { id: DbId, name: String },
    /// An unsaved multi-partner selection viewed as one virtual group.
    /// Read-mostly: rows can be edited and deleted but not added.
    Selection { partner_ids: Vec<DbId> },
}

impl StatsScope {
    pub fn partner(partner: &Partner) -> Self {
        Self::Partner {
            id: partner.id,
            name: partner.name.clone(),
        }
    }

    /// Scope over the selected partners, or `None` for an empty selection.
    pub fn selection(partners: &[Partner]) -> Option<Self> {
        if partners.is_empty() {
            return None;
        }
        Some(Self::Selection {
            partner_ids: partners.iter().map(|p| p.id).collect(),
        })
    }

    /// Heading for the detail view.
    pub fn label(&self) -> String {
        match self {
            Self::Partner { name, .. } => name.clone(),
            Self::Selection { partner_ids } => {
                format!("{} partners combined", partner_ids.len())
            }
        }
    }

    /// The partner that owns new rows, if any.
    pub fn owner(&self) -> Option<DbId> {
        match self {
            Self::Partner { id, .. } => Some(*id),
            Self::Selection { .. } => None,
        }
    }

    pub fn allows_new_rows(&self) -> bool {
        matches!(self, Self::Partner { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn partner(id: DbId, name: &str, group: Option<&str>) -> Partner {
        Partner {
            id,
            name: name.into(),
            city: None,
            county: None,
            total_quantity: None,
            group: group.map(|g| GroupSummary {
                id: 100,
                name: g.into(),
                color: None,
            }),
        }
    }

    #[test]
    fn group_build_trims_and_normalises() {
        let members = vec![partner(1, "A", None), partner(2, "B", None)];
        let group = CreateGroup::build("  North  ", Some("10b981"), &members).unwrap();
        assert_eq!(group.name, "North");
        assert_eq!(group.color, "#10b981");
        assert_eq!(group.partner_ids, vec![1, 2]);
    }

    #[test]
    fn group_build_defaults_color() {
        let members = vec![partner(1, "A", None)];
        let group = CreateGroup::build("G", None, &members).unwrap();
        assert_eq!(group.color, DEFAULT_GROUP_COLOR);
    }

    #[test]
    fn group_build_rejects_blank_name() {
        let members = vec![partner(1, "A", None)];
        assert_matches!(
            CreateGroup::build("   ", None, &members),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn group_build_rejects_empty_selection() {
        assert_matches!(CreateGroup::build("G", None, &[]), Err(CoreError::Validation(_)));
    }

    #[test]
    fn group_build_rejects_partner_already_grouped() {
        let members = vec![partner(1, "A", None), partner(2, "Béta Kft.", Some("South"))];
        let err = CreateGroup::build("G", None, &members).unwrap_err();
        assert_matches!(&err, CoreError::Conflict(msg) if msg.contains("Béta Kft.") && msg.contains("South"));
    }

    #[test]
    fn group_build_deduplicates_members() {
        let members = vec![partner(1, "A", None), partner(1, "A", None)];
        let group = CreateGroup::build("G", None, &members).unwrap();
        assert_eq!(group.partner_ids, vec![1]);
    }

    #[test]
    fn group_dto_serializes_camel_case() {
        let members = vec![partner(4, "A", None)];
        let json = serde_json::to_value(CreateGroup::build("G", Some("#fff000"), &members).unwrap())
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "G", "color": "#fff000", "partnerIds": [4] })
        );
    }

    #[test]
    fn color_normalisation_cases() {
        assert_eq!(normalize_color(Some("#abcdef")), "#abcdef");
        assert_eq!(normalize_color(Some("abcdef")), "#abcdef");
        assert_eq!(normalize_color(Some(" ")), DEFAULT_GROUP_COLOR);
        assert_eq!(normalize_color(Some("#")), DEFAULT_GROUP_COLOR);
    }

    #[test]
    fn partner_draft_requires_name() {
        let draft = CreatePartner {
            id: None,
            name: " ".into(),
            city: None,
            county: None,
        };
        assert_matches!(draft.normalized(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn partner_draft_drops_blank_location() {
        let draft = CreatePartner {
            id: Some(5),
            name: " Gamma ".into(),
            city: Some("  ".into()),
            county: Some(" Csongrád ".into()),
        }
        .normalized()
        .unwrap();
        assert_eq!(draft.name, "Gamma");
        assert_eq!(draft.city, None);
        assert_eq!(draft.county.as_deref(), Some("Csongrád"));
    }

    #[test]
    fn grower_draft_requires_name() {
        let draft = CreateGrower {
            name: "".into(),
            city: None,
        };
        assert_matches!(draft.normalized(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn grower_display_name_includes_city() {
        let grower = Grower {
            id: 1,
            name: "Kiss Farm".into(),
            city: Some("Baja".into()),
            partners: vec![],
        };
        assert_eq!(grower.display_name(), "Kiss Farm (Baja)");

        let grower = Grower { city: None, ..grower };
        assert_eq!(grower.display_name(), "Kiss Farm");
    }

    #[test]
    fn selection_scope_requires_partners() {
        assert_eq!(StatsScope::selection(&[]), None);

        let scope = StatsScope::selection(&[partner(1, "A", None), partner(2, "B", None)]).unwrap();
        assert_eq!(scope.label(), "2 partners combined");
        assert_eq!(scope.owner(), None);
        assert!(!scope.allows_new_rows());
    }

    #[test]
    fn partner_scope_owns_new_rows() {
        let scope = StatsScope::partner(&partner(9, "Delta", None));
        assert_eq!(scope.owner(), Some(9));
        assert_eq!(scope.label(), "Delta");
        assert!(scope.allows_new_rows());
    }
}
