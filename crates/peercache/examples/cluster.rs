// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Three cache nodes in one process, talking to each other over HTTP.
//!
//! Each node serves a `scores` group backed by the same slow "database". Every key is
//! owned by exactly one node: the owner loads and caches it, and the others fetch it from
//! the owner. Run with `RUST_LOG=peercache=debug` to watch the routing decisions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use peercache::http::HttpPool;
use peercache::{Error, Getter, Group, Registry, Result};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// A shared table that takes a while to answer.
#[derive(Clone)]
struct SlowDatabase {
    rows: Arc<HashMap<&'static str, &'static str>>,
    queries: Arc<AtomicUsize>,
}

impl Getter for SlowDatabase {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.rows
            .get(key)
            .map(|value| Bytes::from_static(value.as_bytes()))
            .ok_or_else(|| Error::source_failed(format!("{key} not exist")))
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database = SlowDatabase {
        rows: Arc::new(HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")])),
        queries: Arc::default(),
    };

    let mut listeners = Vec::new();
    for _ in 0..3 {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        listeners.push((listener, url));
    }
    let urls: Vec<String> = listeners.iter().map(|(_, url)| url.clone()).collect();

    let mut groups: Vec<(String, Arc<Group>)> = Vec::new();
    for (listener, url) in listeners {
        let registry = Arc::new(Registry::new());
        let scores = registry.make_group("scores", 2 << 10, database.clone());

        let pool = Arc::new(HttpPool::builder(url.clone(), registry).build());
        pool.set_peers(urls.iter().cloned());
        scores.register_peers(Arc::clone(&pool));
        tokio::spawn(pool.serve(listener));

        groups.push((url, scores));
    }

    for key in ["Tom", "Jack", "Sam", "Kate"] {
        for (url, scores) in &groups {
            match scores.get(key).await {
                Ok(value) => println!("{url} {key} = {value}"),
                Err(error) => println!("{url} {key} failed: {}", error.kind()),
            }
        }
    }
    println!("database queries after the first pass: {}", database.queries.load(Ordering::Relaxed));

    // Once its owner has cached a key, lookups from any node stop reaching the database.
    let before = database.queries.load(Ordering::Relaxed);
    let burst = join_all(groups.iter().flat_map(|(_, scores)| (0..10).map(|_| scores.get("Sam")))).await;
    println!(
        "{} lookups for a cached key, {} new database queries",
        burst.len(),
        database.queries.load(Ordering::Relaxed) - before
    );

    Ok(())
}
