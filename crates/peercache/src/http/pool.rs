// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use peercache_ring::HashRing;
use tokio::net::{TcpListener, TcpStream};

use super::getter::{HttpClient, http_client};
use super::{DEFAULT_BASE_PATH, DEFAULT_REPLICAS, HttpGetter, unescape};
use crate::{Peer, PeerPicker, Registry};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Builder for [`HttpPool`].
#[derive(Debug)]
pub struct HttpPoolBuilder {
    self_url: String,
    registry: Arc<Registry>,
    base_path: String,
    replicas: usize,
}

impl HttpPoolBuilder {
    /// Sets the path prefix peer requests are served under. It must start and end with
    /// `/` and be the same on every node.
    ///
    /// Defaults to [`DEFAULT_BASE_PATH`].
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Sets the number of virtual nodes per peer. It must be the same on every node.
    ///
    /// Defaults to [`DEFAULT_REPLICAS`].
    #[must_use]
    pub fn replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Builds the pool with an empty peer set.
    ///
    /// # Panics
    ///
    /// Panics if the replica count is 0.
    #[must_use]
    pub fn build(self) -> HttpPool {
        HttpPool {
            peers: Mutex::new(PeerSet {
                ring: HashRing::new(self.replicas),
                getters: HashMap::new(),
            }),
            client: http_client(),
            self_url: self.self_url,
            registry: self.registry,
            base_path: self.base_path,
            replicas: self.replicas,
        }
    }
}

struct PeerSet {
    ring: HashRing,
    getters: HashMap<String, Peer>,
}

/// One node's view of the cluster, and the server that answers its peers.
///
/// The pool knows its own URL and the URLs of all nodes. As a [`PeerPicker`] it maps each
/// key to its owner on a consistent-hash ring and hands out an [`HttpGetter`] for remote
/// owners. As a server it answers other nodes' fetches from the groups in its registry.
///
/// See the [module documentation](super) for a wiring example.
pub struct HttpPool {
    self_url: String,
    base_path: String,
    replicas: usize,
    registry: Arc<Registry>,
    client: HttpClient,
    peers: Mutex<PeerSet>,
}

impl HttpPool {
    /// Starts building a pool for the node reachable at `self_url` (e.g.
    /// `http://10.0.0.1:8001`) that serves the groups in `registry`.
    #[must_use]
    pub fn builder(self_url: impl Into<String>, registry: Arc<Registry>) -> HttpPoolBuilder {
        HttpPoolBuilder {
            self_url: self_url.into(),
            registry,
            base_path: DEFAULT_BASE_PATH.to_owned(),
            replicas: DEFAULT_REPLICAS,
        }
    }

    /// This node's URL.
    #[must_use]
    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// The path prefix peer requests are served under.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Replaces the peer set.
    ///
    /// `peers` lists every node in the cluster by URL, normally including this one. Keys
    /// that land on this node's URL are loaded locally. Repeated URLs count once.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut urls: Vec<String> = peers.into_iter().map(Into::into).collect();
        urls.sort_unstable();
        urls.dedup();

        let mut ring = HashRing::new(self.replicas);
        ring.add_peers(&urls);

        let getters = urls
            .iter()
            .map(|url| {
                let getter = HttpGetter::with_client(format!("{url}{}", self.base_path), self.client.clone());
                (url.clone(), Peer::new(url.as_str(), getter))
            })
            .collect();

        *self.peers.lock() = PeerSet { ring, getters };
        tracing::info!(server = %self.self_url, peers = ?urls, "peer set installed");
    }

    /// Serves peer requests from `listener`. Never returns.
    ///
    /// Each connection is handled on its own task. Failures to accept a connection are
    /// logged and retried after a short pause.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        tracing::info!(server = %self.self_url, addr = ?listener.local_addr().ok(), "serving peer requests");

        let listener = Arc::new(listener);
        self.accept_loop(move || {
            let listener = Arc::clone(&listener);
            async move { listener.accept().await }
        })
        .await;
    }

    async fn accept_loop<A, F>(self: Arc<Self>, mut accept: A)
    where
        A: FnMut() -> F,
        F: Future<Output = io::Result<(TcpStream, SocketAddr)>>,
    {
        loop {
            match accept().await {
                Ok((stream, remote)) => Arc::clone(&self).spawn_connection(stream, remote),
                Err(error) => {
                    tracing::warn!(server = %self.self_url, %error, "accepting a peer connection failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }

    fn spawn_connection(self: Arc<Self>, stream: TcpStream, remote: SocketAddr) {
        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let pool = Arc::clone(&self);
                async move { Ok::<_, Infallible>(pool.handle(request).await) }
            });

            if let Err(error) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                tracing::debug!(%remote, %error, "peer connection closed with error");
            }
        });
    }

    async fn handle(&self, request: Request<Incoming>) -> Response<Full<Bytes>> {
        let path = request.uri().path();
        tracing::debug!(
            server = %self.self_url,
            http.method = %request.method(),
            http.path = path,
            "peer request"
        );

        let Some(rest) = path.strip_prefix(self.base_path.as_str()) else {
            return text(StatusCode::BAD_REQUEST, format!("unexpected path: {path}"));
        };

        let Some((group_name, key)) = rest
            .split_once('/')
            .and_then(|(group, key)| Some((unescape(group)?, unescape(key)?)))
        else {
            return text(StatusCode::BAD_REQUEST, "bad request".to_owned());
        };

        let Some(group) = self.registry.group(&group_name) else {
            return text(StatusCode::NOT_FOUND, format!("no such group: {group_name}"));
        };

        match group.get(&key).await {
            Ok(value) => respond(StatusCode::OK, "application/octet-stream", value.into()),
            Err(error) => text(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
        }
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Peer> {
        let peers = self.peers.lock();
        let owner = peers.ring.get_peer(key)?;
        if owner == self.self_url {
            return None;
        }

        tracing::debug!(server = %self.self_url, cache.key = key, peer = owner, "picked peer");
        peers.getters.get(owner).cloned()
    }
}

impl fmt::Debug for HttpPool {
    #[cfg_attr(test, mutants::skip)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_url", &self.self_url)
            .field("base_path", &self.base_path)
            .field("replicas", &self.replicas)
            .field("peers", &self.peers.lock().ring.peers())
            .finish_non_exhaustive()
    }
}

fn text(status: StatusCode, message: String) -> Response<Full<Bytes>> {
    respond(status, "text/plain; charset=utf-8", Bytes::from(message))
}

fn respond(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing_test::traced_test;

    use super::*;
    use crate::{GetterFn, PeerGetter};

    fn pool(self_url: &str) -> HttpPool {
        HttpPool::builder(self_url, Arc::new(Registry::new())).build()
    }

    #[test]
    fn defaults() {
        let pool = pool("http://10.0.0.1:8001");
        assert_eq!(pool.self_url(), "http://10.0.0.1:8001");
        assert_eq!(pool.base_path(), "/_peercache/");
        assert_eq!(pool.replicas, 50);
    }

    #[test]
    fn no_peers_means_everything_is_local() {
        let pool = pool("http://10.0.0.1:8001");
        assert!(pool.pick_peer("Tom").is_none());
    }

    #[test]
    fn alone_on_the_ring_never_picks_a_peer() {
        let pool = pool("http://10.0.0.1:8001");
        pool.set_peers(["http://10.0.0.1:8001"]);
        for i in 0..100 {
            assert!(pool.pick_peer(&format!("key-{i}")).is_none());
        }
    }

    #[test]
    fn remote_owners_are_picked_and_self_is_not() {
        let urls = ["http://10.0.0.1:8001", "http://10.0.0.2:8001", "http://10.0.0.3:8001"];
        let pool = pool(urls[0]);
        pool.set_peers(urls);

        let mut ring = HashRing::new(DEFAULT_REPLICAS);
        ring.add_peers(urls);

        let mut remote = 0;
        for i in 0..300 {
            let key = format!("key-{i}");
            let owner = ring.get_peer(&key).unwrap();
            match pool.pick_peer(&key) {
                Some(peer) => {
                    assert_eq!(peer.name(), owner);
                    remote += 1;
                }
                None => assert_eq!(owner, urls[0]),
            }
        }
        assert!(remote > 0);
    }

    #[test]
    fn set_peers_replaces_the_ring() {
        let pool = pool("http://10.0.0.1:8001");
        pool.set_peers(["http://10.0.0.1:8001", "http://10.0.0.2:8001"]);
        pool.set_peers(["http://10.0.0.1:8001"]);

        assert!((0..100).all(|i| pool.pick_peer(&format!("key-{i}")).is_none()));
    }

    #[test]
    #[should_panic(expected = "at least one replica")]
    fn zero_replicas_is_rejected() {
        let _ = HttpPool::builder("http://10.0.0.1:8001", Arc::new(Registry::new()))
            .replicas(0)
            .build();
    }

    #[test]
    fn repeated_urls_count_once() {
        let pool = pool("http://10.0.0.1:8001");
        pool.set_peers(["http://10.0.0.2:8001", "http://10.0.0.1:8001", "http://10.0.0.2:8001"]);

        let peers = pool.peers.lock();
        assert_eq!(peers.ring.len(), 2 * DEFAULT_REPLICAS);
        assert_eq!(peers.ring.peers(), vec!["http://10.0.0.1:8001", "http://10.0.0.2:8001"]);
        assert_eq!(peers.getters.len(), 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn accept_failures_do_not_stop_the_server() {
        let listener = Arc::new(TcpListener::bind("127.0.0.1:0").await.unwrap());
        let url = format!("http://{}", listener.local_addr().unwrap());

        let registry = Arc::new(Registry::new());
        registry.make_group(
            "scores",
            0,
            GetterFn::new(|key: String| async move { Ok(Bytes::from(key)) }),
        );
        let pool = Arc::new(HttpPool::builder(url.clone(), registry).build());

        let attempts = Arc::new(AtomicUsize::new(0));
        tokio::spawn(Arc::clone(&pool).accept_loop(move || {
            let listener = Arc::clone(&listener);
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(io::Error::other("too many open files"));
                }
                listener.accept().await
            }
        }));

        let getter = HttpGetter::new(format!("{url}{DEFAULT_BASE_PATH}"));
        assert_eq!(getter.get("scores", "Tom").await.unwrap(), Bytes::from("Tom"));
        assert!(logs_contain("accepting a peer connection failed"));
        assert!(logs_contain("too many open files"));
    }
}
