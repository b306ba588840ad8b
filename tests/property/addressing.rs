// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property Tests: Addressing
//!
//! Subnet allocation never hands out overlapping blocks, and logical IDs
//! derived from construct paths are always valid and stable.

use cache_cluster_infrastructure::domain::{CidrAllocator, ConstructPath, Ipv4Cidr, LogicalId};
use proptest::prelude::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Requested prefix lengths inside a /16
fn prefix_lengths() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(17u8..=28, 1..16)
}

/// Construct ids, including the hidden ones and punctuation
fn construct_id() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[A-Za-z][A-Za-z0-9_.-]{0,20}",
        1 => Just("Resource".to_string()),
        1 => Just("Default".to_string()),
    ]
}

fn construct_path() -> impl Strategy<Value = ConstructPath> {
    prop::collection::vec(construct_id(), 1..6).prop_map(|ids| {
        ids.into_iter().fold(
            ConstructPath::root("Stack").expect("valid root"),
            |path, id| path.child(id).expect("valid id"),
        )
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Allocations are disjoint and inside the parent block
    #[test]
    fn prop_allocations_never_overlap(prefixes in prefix_lengths()) {
        let parent = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        let mut allocator = CidrAllocator::new(parent);

        let allocated: Vec<Ipv4Cidr> = prefixes
            .into_iter()
            .map_while(|prefix| allocator.allocate(prefix).ok())
            .collect();

        for (i, a) in allocated.iter().enumerate() {
            prop_assert!(parent.contains(a));
            for b in &allocated[i + 1..] {
                prop_assert!(!a.overlaps(b), "{} overlaps {}", a, b);
            }
        }
    }

    /// Property: An even split fits every block
    #[test]
    fn prop_even_split_fits_count(count in 1usize..=64) {
        let parent = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        let prefix = CidrAllocator::even_split_prefix(&parent, 0, count).unwrap();
        let mut allocator = CidrAllocator::new(parent);

        for _ in 0..count {
            prop_assert!(allocator.allocate(prefix).is_ok());
        }
    }

    /// Property: Derived logical IDs are valid template IDs
    #[test]
    fn prop_logical_ids_are_valid(path in construct_path()) {
        if let Ok(id) = path.logical_id() {
            prop_assert!(LogicalId::new(id.as_str()).is_ok());
            prop_assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
            prop_assert!(id.as_str().len() <= 255);
        }
    }

    /// Property: Logical ID derivation is stable
    #[test]
    fn prop_logical_ids_are_stable(path in construct_path()) {
        let copy = path.clone();
        prop_assert_eq!(path.logical_id().ok(), copy.logical_id().ok());
    }

    /// Property: Sibling paths never share a logical ID
    #[test]
    fn prop_distinct_siblings_get_distinct_ids(
        parent in construct_path(),
        first in "[A-Za-z][A-Za-z0-9]{0,10}",
        second in "[A-Za-z][A-Za-z0-9]{0,10}",
    ) {
        prop_assume!(first != second);
        let a = parent.child(first).unwrap().logical_id();
        let b = parent.child(second).unwrap().logical_id();

        if let (Ok(a), Ok(b)) = (a, b) {
            prop_assert_ne!(a, b);
        }
    }
}
