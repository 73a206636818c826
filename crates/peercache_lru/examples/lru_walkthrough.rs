// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Walks through LRU eviction with a cache sized to hold exactly three entries.

use peercache_lru::LruCache;

fn main() {
    let entries = [("name", "PsyDuck"), ("age", "21"), ("hobby", "Program")];
    let budget: usize = entries.iter().map(|(key, value)| key.len() + value.len()).sum();

    let mut cache = LruCache::with_eviction_callback(budget, |key: &str, value: &String| {
        println!("evicted {key} = {value}");
    });

    for (key, value) in entries {
        cache.add(key, value.to_string());
    }
    println!("cache holds {} entries in {budget} bytes", cache.len());

    // Reading marks an entry as recently used.
    println!("name = {:?}", cache.get("name"));
    println!("hobby = {:?}", cache.get("hobby"));
    println!("location = {:?}", cache.get("location"));

    // No room left, so the least recently used entry ("age") goes.
    cache.add("*", "*".to_string());

    let order: Vec<&str> = cache.keys().collect();
    println!("least to most recently used: {order:?}");
}
