//! Fieldbook Test Utilities
//!
//! Centralized test infrastructure for the workspace:
//! - Record and booking fixture builders
//! - Pre-seeded dirty stores for migration scenarios
//! - Proptest generators for identity records

// Re-export the in-memory store and the types fixtures hand out
pub use fieldbook_core::{
    DependentRow, DuplicateGroup, IdentityRecord, IdentityTable, KeySource, KeyStrategy,
    NormalizedKey, RecordId, Timestamp,
};
pub use fieldbook_store::MemoryStore;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// FIXTURE BUILDERS
// ============================================================================

/// A fully-populated identity record created `secs` seconds after the
/// epoch. Timestamps this coarse make tie-break tests explicit.
pub fn record(
    id: RecordId,
    user_ref: Option<&str>,
    display_name: &str,
    email: Option<&str>,
    secs: i64,
) -> IdentityRecord {
    IdentityRecord {
        id,
        user_ref: user_ref.map(String::from),
        display_name: display_name.to_string(),
        email: email.map(String::from),
        created_at: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
    }
}

/// Technician keyed on `user_ref` only.
pub fn tech(id: RecordId, user_ref: &str, secs: i64) -> IdentityRecord {
    record(id, Some(user_ref), &format!("tech {id}"), None, secs)
}

/// A store holding the canonical merge scenario: duplicated
/// technicians with a booking attached to a loser row.
///
/// - technicians: id 1 and id 2 share `user_ref` "u1" (1 is older)
/// - bookings: id 100 references technician 2
pub fn store_with_duplicate_technicians() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .seed(IdentityTable::Technicians, tech(1, "u1", 10))
        .expect("seed");
    store
        .seed(IdentityTable::Technicians, tech(2, "u1", 20))
        .expect("seed");
    store
        .seed_booking(100, IdentityTable::Technicians, 2)
        .expect("seed booking");
    store
}

/// A store with three duplicate groups in the technicians table:
/// one keyed on `user_ref`, one on `email` (case variants), one on
/// `display_name` (whitespace variants).
pub fn store_with_three_duplicate_groups() -> MemoryStore {
    let store = MemoryStore::new();
    let rows = [
        tech(1, "u1", 10),
        tech(2, "u1", 20),
        record(3, None, "Ada", Some("ada@x.com"), 30),
        record(4, None, "Ada L", Some("ADA@X.com"), 40),
        record(5, None, "Grace Hopper", None, 50),
        record(6, None, "  grace hopper ", None, 60),
    ];
    for row in rows {
        store.seed(IdentityTable::Technicians, row).expect("seed");
    }
    store
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Identity record over a small value alphabet, so generated sets
/// actually contain duplicate keys.
pub fn arb_identity_record() -> impl Strategy<Value = IdentityRecord> {
    (
        1i64..1000,
        proptest::option::of("[a-d]{1,3}"),
        "[ a-d]{0,4}",
        proptest::option::of("[a-d]{1,3}"),
        0i64..100,
    )
        .prop_map(|(id, user_ref, display_name, email, secs)| {
            record(id, user_ref.as_deref(), &display_name, email.as_deref(), secs)
        })
}

/// A batch of identity records with distinct ids.
pub fn arb_records(max: usize) -> impl Strategy<Value = Vec<IdentityRecord>> {
    proptest::collection::vec(arb_identity_record(), 0..max).prop_map(|mut records| {
        records.sort_by_key(|r| r.id);
        records.dedup_by_key(|r| r.id);
        records
    })
}

// =============================================================================
// TESTS
// =============================================================================
