//! Client access grants: which client may be assigned accounts from which vendor.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adportal_core::{Entity, PermissionId, UserId, VendorId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub vendor_id: VendorId,
    pub user_id: UserId,
    pub created_by: Option<UserId>,
    /// Why this user is allowed.
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionDraft {
    pub vendor_id: VendorId,
    pub user_id: UserId,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Permission {
    pub fn create(id: PermissionId, draft: PermissionDraft, created_by: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            vendor_id: draft.vendor_id,
            user_id: draft.user_id,
            created_by,
            notes: normalize_notes(draft.notes),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> (VendorId, UserId) {
        (self.vendor_id, self.user_id)
    }
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> PermissionId {
        self.id
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.trim().is_empty())
}

/// Whether a grant exists for `(vendor, user)`. Either side missing means no.
pub fn is_granted<'a>(
    permissions: impl IntoIterator<Item = &'a Permission>,
    vendor: Option<VendorId>,
    user: Option<UserId>,
) -> bool {
    match (vendor, user) {
        (Some(vendor), Some(user)) => permissions
            .into_iter()
            .any(|p| p.vendor_id == vendor && p.user_id == user),
        _ => false,
    }
}

/// Compress ids into ranges: `[1, 2, 3, 5, 6, 11]` → `"1-3, 5-6, 11"`.
///
/// Input order and duplicates don't matter.
pub fn format_ranges(ids: &[i64]) -> String {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let (mut start, mut end) = (first, first);
    for id in iter {
        if id == end + 1 {
            end = id;
            continue;
        }
        parts.push(range_text(start, end));
        start = id;
        end = id;
    }
    parts.push(range_text(start, end));
    parts.join(", ")
}

fn range_text(start: i64, end: i64) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

/// The `clients_allowed` text of an account whose vendor is `vendor`.
pub fn clients_allowed<'a>(
    vendor: Option<VendorId>,
    permissions: impl IntoIterator<Item = &'a Permission>,
) -> String {
    let Some(vendor) = vendor else {
        return "Vendor is empty.".to_string();
    };
    let users: Vec<i64> = permissions
        .into_iter()
        .filter(|p| p.vendor_id == vendor)
        .map(|p| p.user_id.get())
        .collect();
    if users.is_empty() {
        "Vendor permissions not defined.".to_string()
    } else {
        format_ranges(&users)
    }
}

/// Changes needed to bring one batch scope (a vendor's or a user's grants)
/// in line with the checked pairs submitted for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPlan {
    pub create: Vec<PermissionDraft>,
    pub update_notes: Vec<(PermissionId, Option<String>)>,
    pub delete: Vec<PermissionId>,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update_notes.is_empty() && self.delete.is_empty()
    }
}

/// Diff `existing` grants of a scope against the `checked` pairs.
///
/// Unchecked pairs that exist are deleted, checked pairs that don't exist are
/// created, and existing checked pairs only change when their notes differ.
pub fn plan_batch<'a>(
    existing: impl IntoIterator<Item = &'a Permission>,
    checked: &BTreeMap<(VendorId, UserId), Option<String>>,
) -> BatchPlan {
    let mut plan = BatchPlan::default();
    let mut seen = Vec::new();
    for permission in existing {
        match checked.get(&permission.key()) {
            Some(notes) => {
                seen.push(permission.key());
                let notes = normalize_notes(notes.clone());
                if notes != permission.notes {
                    plan.update_notes.push((permission.id, notes));
                }
            }
            None => plan.delete.push(permission.id),
        }
    }
    for ((vendor_id, user_id), notes) in checked {
        if !seen.contains(&(*vendor_id, *user_id)) {
            plan.create.push(PermissionDraft {
                vendor_id: *vendor_id,
                user_id: *user_id,
                notes: normalize_notes(notes.clone()),
            });
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grant(id: i64, vendor: i64, user: i64) -> Permission {
        Permission::create(
            PermissionId::new(id),
            PermissionDraft {
                vendor_id: VendorId::new(vendor),
                user_id: UserId::new(user),
                notes: None,
            },
            None,
            Utc::now(),
        )
    }

    #[test]
    fn ranges_compress_consecutive_ids() {
        assert_eq!(format_ranges(&[1, 2, 3, 5, 6, 11]), "1-3, 5-6, 11");
        assert_eq!(format_ranges(&[11, 5, 6, 2, 1, 3, 3]), "1-3, 5-6, 11");
        assert_eq!(format_ranges(&[7]), "7");
        assert_eq!(format_ranges(&[]), "");
    }

    #[test]
    fn clients_allowed_messages() {
        let grants = vec![grant(1, 1, 888), grant(2, 1, 889), grant(3, 2, 900)];
        assert_eq!(clients_allowed(None, &grants), "Vendor is empty.");
        assert_eq!(clients_allowed(Some(VendorId::new(3)), &grants), "Vendor permissions not defined.");
        assert_eq!(clients_allowed(Some(VendorId::new(1)), &grants), "888-889");
    }

    #[test]
    fn granted_requires_both_sides() {
        let grants = vec![grant(1, 1, 888)];
        assert!(is_granted(&grants, Some(VendorId::new(1)), Some(UserId::new(888))));
        assert!(!is_granted(&grants, Some(VendorId::new(1)), Some(UserId::new(889))));
        assert!(!is_granted(&grants, None, Some(UserId::new(888))));
        assert!(!is_granted(&grants, Some(VendorId::new(1)), None));
    }

    #[test]
    fn batch_plan_creates_updates_and_deletes() {
        let mut noted = grant(2, 1, 889);
        noted.notes = Some("old".into());
        let existing = vec![grant(1, 1, 888), noted, grant(3, 1, 890)];

        let mut checked = BTreeMap::new();
        checked.insert((VendorId::new(1), UserId::new(888)), None);
        checked.insert((VendorId::new(1), UserId::new(889)), Some("new".into()));
        checked.insert((VendorId::new(1), UserId::new(891)), Some(" ".into()));

        let plan = plan_batch(&existing, &checked);
        assert_eq!(plan.delete, vec![PermissionId::new(3)]);
        assert_eq!(plan.update_notes, vec![(PermissionId::new(2), Some("new".into()))]);
        assert_eq!(
            plan.create,
            vec![PermissionDraft {
                vendor_id: VendorId::new(1),
                user_id: UserId::new(891),
                notes: None,
            }]
        );
    }

    #[test]
    fn unchanged_batch_is_empty() {
        let existing = vec![grant(1, 1, 888)];
        let mut checked = BTreeMap::new();
        checked.insert((VendorId::new(1), UserId::new(888)), None);
        assert!(plan_batch(&existing, &checked).is_empty());
    }

    proptest! {
        #[test]
        fn ranges_cover_exactly_the_input(ids in proptest::collection::vec(1i64..200, 0..40)) {
            let text = format_ranges(&ids);
            let mut expanded = Vec::new();
            for part in text.split(", ").filter(|p| !p.is_empty()) {
                match part.split_once('-') {
                    Some((a, b)) => {
                        let (a, b): (i64, i64) = (a.parse().unwrap(), b.parse().unwrap());
                        prop_assert!(a < b);
                        expanded.extend(a..=b);
                    }
                    None => expanded.push(part.parse().unwrap()),
                }
            }
            let mut expected = ids.clone();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(expanded, expected);
        }
    }
}
