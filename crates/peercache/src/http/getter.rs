// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bytes::Bytes;
use http::{StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use super::escape;
use crate::{Error, PeerGetter, Result};

pub(crate) type HttpClient = Client<HttpConnector, Empty<Bytes>>;

pub(crate) fn http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build_http()
}

/// Fetches values from one remote node over HTTP.
///
/// Requests go to `<base_url><group>/<key>` with both segments percent-encoded. The base
/// URL includes the remote node's base path, e.g. `http://10.0.0.2:8001/_peercache/`.
#[derive(Debug, Clone)]
pub struct HttpGetter {
    base_url: String,
    client: HttpClient,
}

impl HttpGetter {
    /// Creates a getter for the node reachable at `base_url`, with its own connection pool.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, http_client())
    }

    pub(crate) fn with_client(base_url: impl Into<String>, client: HttpClient) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, group: &str, key: &str) -> String {
        format!("{}{}/{}", self.base_url, escape(group), escape(key))
    }
}

impl PeerGetter for HttpGetter {
    async fn get(&self, group: &str, key: &str) -> Result<Bytes> {
        let url = self.url(group, key);
        let uri: Uri = url.parse().map_err(Error::peer_failed)?;

        let response = self.client.get(uri).await.map_err(Error::peer_failed)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::peer_failed(format!("{url} returned {status}")));
        }

        let body = response.into_body().collect().await.map_err(Error::peer_failed)?;
        Ok(body.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_escapes_both_segments() {
        let getter = HttpGetter::new("http://10.0.0.2:8001/_peercache/");
        assert_eq!(
            getter.url("my group", "a/b"),
            "http://10.0.0.2:8001/_peercache/my%20group/a%2Fb"
        );
    }

    #[tokio::test]
    async fn unreachable_node_is_a_peer_error() {
        // Nothing listens on the discard port.
        let getter = HttpGetter::new("http://127.0.0.1:9/_peercache/");
        let error = getter.get("scores", "Tom").await.unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Peer);
    }
}
