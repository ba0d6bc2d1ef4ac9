//! Duplicate scanning
//!
//! Read-only: partitions identity records into groups sharing a
//! normalized key and reports every group of size >= 2. Safe to re-run
//! any number of times, which is what makes it usable as the standalone
//! audit query for external duplicate-checking tooling.

use fieldbook_core::{
    DuplicateGroup, FieldbookResult, IdentityRecord, IdentityTable, KeyStrategy, NormalizedKey,
};
use fieldbook_store::IdentityStore;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;

/// Result of one scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Groups of size >= 2, in first-seen key order. Members are
    /// ordered by `created_at` ascending, then `id` ascending.
    pub groups: Vec<DuplicateGroup>,
    /// Records with no usable key field. Skipped, never grouped.
    pub skipped: usize,
}

/// Group records by their preferred normalized key.
///
/// Single pass plus group materialization, O(n) in record count.
/// Group order is the first appearance of each key in the input;
/// member order is the deterministic total order the retention policy
/// relies on (creation time, ties broken by lowest id).
pub fn scan(records: &[IdentityRecord]) -> ScanOutcome {
    let mut order: Vec<NormalizedKey> = Vec::new();
    let mut buckets: HashMap<NormalizedKey, Vec<IdentityRecord>> = HashMap::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(key) = record.matching_key(KeyStrategy::Preferred) else {
            skipped += 1;
            continue;
        };
        let bucket = match buckets.entry(key) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                order.push(vacant.key().clone());
                vacant.insert(Vec::new())
            }
        };
        bucket.push(record.clone());
    }

    let mut groups = Vec::new();
    for key in order {
        let Some(mut members) = buckets.remove(&key) else {
            continue;
        };
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        groups.push(DuplicateGroup { key, members });
    }

    ScanOutcome { groups, skipped }
}

/// Audit entry point: scan one identity table through the store.
/// Read-only; usable outside any migration run.
pub fn scan_table<S: IdentityStore + ?Sized>(
    store: &S,
    table: IdentityTable,
) -> FieldbookResult<ScanOutcome> {
    let records = store.list(table)?;
    let outcome = scan(&records);
    debug!(
        table = %table,
        records = records.len(),
        groups = outcome.groups.len(),
        skipped = outcome.skipped,
        "scan complete"
    );
    Ok(outcome)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fieldbook_core::KeySource;

    fn record_at(
        id: i64,
        user_ref: Option<&str>,
        name: &str,
        email: Option<&str>,
        secs: i64,
    ) -> IdentityRecord {
        IdentityRecord {
            id,
            user_ref: user_ref.map(String::from),
            display_name: name.to_string(),
            email: email.map(String::from),
            created_at: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
        }
    }

    #[test]
    fn test_scan_finds_case_insensitive_email_group() {
        let records = vec![
            record_at(1, None, "A", Some("a@x.com"), 10),
            record_at(2, None, "B", Some("A@X.com"), 20),
            record_at(3, None, "C", Some("c@x.com"), 30),
        ];
        let outcome = scan(&records);
        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].key.source, KeySource::Email);
        assert_eq!(outcome.groups[0].member_ids(), vec![1, 2]);
    }

    #[test]
    fn test_members_ordered_by_created_at_then_id() {
        let records = vec![
            record_at(9, Some("u1"), "A", None, 50),
            record_at(3, Some("u1"), "B", None, 10),
            record_at(7, Some("u1"), "C", None, 10),
        ];
        let outcome = scan(&records);
        // Equal timestamps fall back to lowest id first.
        assert_eq!(outcome.groups[0].member_ids(), vec![3, 7, 9]);
    }

    #[test]
    fn test_group_order_is_first_seen() {
        let records = vec![
            record_at(1, Some("b"), "A", None, 10),
            record_at(2, Some("a"), "B", None, 10),
            record_at(3, Some("b"), "C", None, 20),
            record_at(4, Some("a"), "D", None, 20),
        ];
        let outcome = scan(&records);
        assert_eq!(outcome.groups[0].key.value, "b");
        assert_eq!(outcome.groups[1].key.value, "a");
    }

    #[test]
    fn test_unkeyable_records_are_skipped_not_grouped() {
        let records = vec![
            record_at(1, Some("  "), "  ", None, 10),
            record_at(2, None, "   ", Some(" "), 20),
        ];
        let outcome = scan(&records);
        // Two records with no usable key are not duplicates of each other.
        assert!(outcome.groups.is_empty());
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn test_user_ref_and_email_keys_do_not_mix() {
        // One record keys on user_ref "x", another on email "x".
        let records = vec![
            record_at(1, Some("x"), "A", None, 10),
            record_at(2, None, "B", Some("x"), 20),
        ];
        let outcome = scan(&records);
        assert!(outcome.groups.is_empty());
    }

    #[test]
    fn test_scan_is_deterministic() {
        let records = vec![
            record_at(1, Some("u1"), "A", None, 10),
            record_at(2, Some("u1"), "B", None, 20),
            record_at(3, None, "C", Some("c@x.com"), 30),
            record_at(4, None, "D", Some("C@x.com"), 40),
        ];
        assert_eq!(scan(&records), scan(&records));
    }

    mod properties {
        use super::*;
        use fieldbook_test_utils::arb_records;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            /// Scanning twice over the same input produces identical groupings.
            #[test]
            fn prop_scan_deterministic(records in arb_records(40)) {
                prop_assert_eq!(scan(&records), scan(&records));
            }

            /// Every returned group has >= 2 members sharing the group key,
            /// and members are in (created_at, id) order.
            #[test]
            fn prop_groups_well_formed(records in arb_records(40)) {
                for group in scan(&records).groups {
                    prop_assert!(group.members.len() >= 2);
                    for member in &group.members {
                        let key = member.matching_key(KeyStrategy::Preferred);
                        prop_assert_eq!(
                            key.as_ref(),
                            Some(&group.key)
                        );
                    }
                    for pair in group.members.windows(2) {
                        let ordered = (pair[0].created_at, pair[0].id)
                            <= (pair[1].created_at, pair[1].id);
                        prop_assert!(ordered);
                    }
                }
            }
        }
    }
}
