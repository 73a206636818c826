// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Ownership tests for `HashRing`.

use std::collections::HashMap;

use peercache_ring::HashRing;
use pretty_assertions::assert_eq;

/// Treats the bytes as a decimal number, which makes ring positions easy to reason about.
fn decimal(data: &[u8]) -> u32 {
    std::str::from_utf8(data).unwrap().parse().unwrap()
}

#[test]
fn keys_go_to_the_next_virtual_node_clockwise() {
    let mut ring = HashRing::with_hasher(3, decimal);

    // Virtual nodes: 2, 4, 12, 14, 22, 24.
    ring.add_peers(["2", "4"]);

    let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")];
    for (key, owner) in cases {
        assert_eq!(ring.get_peer(key), Some(owner), "key {key}");
    }

    // Adds 8, 18, 28. Only 27 changes hands.
    ring.add_peers(["8"]);

    let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "8")];
    for (key, owner) in cases {
        assert_eq!(ring.get_peer(key), Some(owner), "key {key}");
    }
}

#[test]
fn ownership_is_deterministic_across_rings() {
    let peers = ["http://a:1", "http://b:1", "http://c:1"];
    let mut first = HashRing::new(50);
    let mut second = HashRing::new(50);
    first.add_peers(peers);
    second.add_peers(peers);

    for i in 0..1000 {
        let key = format!("key-{i}");
        let owner = first.get_peer(&key);
        assert!(owner.is_some());
        assert_eq!(owner, first.get_peer(&key));
        assert_eq!(owner, second.get_peer(&key));
    }
}

#[test]
fn every_peer_receives_keys() {
    let peers: Vec<String> = (0..5).map(|i| format!("http://node{i}:8001")).collect();
    let mut ring = HashRing::new(50);
    ring.add_peers(&peers);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for i in 0..10_000 {
        let owner = ring.get_peer(&format!("key-{i}")).unwrap();
        *counts.entry(owner.to_string()).or_default() += 1;
    }

    assert_eq!(counts.len(), peers.len());
    assert!(counts.values().all(|&count| count > 0));
}

#[test]
fn adding_a_peer_moves_a_bounded_share_of_keys_to_it() {
    let peers: Vec<String> = (0..10).map(|i| format!("http://node{i}:8001")).collect();
    let mut ring = HashRing::new(50);
    ring.add_peers(&peers);

    let keys: Vec<String> = (0..10_000).map(|i| format!("key-{i}")).collect();
    let before: Vec<String> = keys.iter().map(|k| ring.get_peer(k).unwrap().to_string()).collect();

    let newcomer = "http://node10:8001";
    ring.add_peers([newcomer]);

    let mut moved = 0;
    for (key, old_owner) in keys.iter().zip(&before) {
        let new_owner = ring.get_peer(key).unwrap();
        if new_owner != old_owner {
            // Keys only ever move onto the new peer.
            assert_eq!(new_owner, newcomer);
            moved += 1;
        }
    }

    assert!(moved > 0, "the new peer should take over some keys");
    assert!(moved < keys.len() / 5, "{moved} of {} keys moved", keys.len());
}
