//! Retention policy
//!
//! Exactly one record of each duplicate group survives: the earliest by
//! the scanner's total order (created_at ascending, id ascending).
//! Keep-oldest favors referential stability - the earliest record is
//! the one most likely to already have bookings attached - and applies
//! uniformly to technicians, customers, and profiles.

use fieldbook_core::{DuplicateGroup, IdentityRecord};

/// Resolution of one duplicate group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub keep: IdentityRecord,
    pub remove: Vec<IdentityRecord>,
}

impl Resolution {
    /// Ids of the records to remove, in member order.
    pub fn remove_ids(&self) -> Vec<i64> {
        self.remove.iter().map(|r| r.id).collect()
    }
}

/// Select the survivor of a group. Fully deterministic: `keep` is the
/// first member of the group's total order, `remove` the remainder.
/// Returns `None` for an empty group (the scanner never emits one).
pub fn resolve(group: &DuplicateGroup) -> Option<Resolution> {
    let (keep, rest) = group.members.split_first()?;
    Some(Resolution {
        keep: keep.clone(),
        remove: rest.to_vec(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use chrono::{TimeZone, Utc};
    use fieldbook_core::{KeySource, NormalizedKey};

    fn record_at(id: i64, user_ref: &str, secs: i64) -> IdentityRecord {
        IdentityRecord {
            id,
            user_ref: Some(user_ref.to_string()),
            display_name: format!("tech {id}"),
            email: None,
            created_at: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
        }
    }

    fn group_of(members: Vec<IdentityRecord>) -> DuplicateGroup {
        DuplicateGroup {
            key: NormalizedKey {
                source: KeySource::UserRef,
                value: "u1".to_string(),
            },
            members,
        }
    }

    #[test]
    fn test_keep_is_earliest_member() {
        let group = group_of(vec![
            record_at(1, "u1", 10),
            record_at(2, "u1", 20),
            record_at(3, "u1", 30),
        ]);
        let resolution = resolve(&group).unwrap();
        assert_eq!(resolution.keep.id, 1);
        assert_eq!(resolution.remove_ids(), vec![2, 3]);
    }

    #[test]
    fn test_remove_is_exactly_members_minus_keep() {
        let group = group_of(vec![record_at(4, "u1", 10), record_at(9, "u1", 20)]);
        let resolution = resolve(&group).unwrap();
        let mut all = vec![resolution.keep.id];
        all.extend(resolution.remove_ids());
        assert_eq!(all, group.member_ids());
    }

    #[test]
    fn test_empty_group_resolves_to_none() {
        assert_eq!(resolve(&group_of(vec![])), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            /// For scanner-produced groups, keep is the member with the
            /// earliest (created_at, id) and remove holds everything else.
            #[test]
            fn prop_keep_earliest(
                ids in proptest::collection::btree_set(1i64..500, 2..10),
                secs in proptest::collection::vec(0i64..30, 10),
            ) {
                let records: Vec<IdentityRecord> = ids
                    .iter()
                    .zip(secs.iter().cycle())
                    .map(|(&id, &s)| record_at(id, "u1", s))
                    .collect();
                let outcome = scan(&records);
                prop_assert_eq!(outcome.groups.len(), 1);
                let group = &outcome.groups[0];
                let resolution = resolve(group).expect("non-empty group");

                let earliest = records
                    .iter()
                    .min_by_key(|r| (r.created_at, r.id))
                    .expect("non-empty input");
                prop_assert_eq!(resolution.keep.id, earliest.id);
                prop_assert_eq!(resolution.remove.len(), records.len() - 1);
                prop_assert!(!resolution.remove_ids().contains(&resolution.keep.id));
            }
        }
    }
}
