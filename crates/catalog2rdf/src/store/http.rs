//! Graph store protocol + SPARQL update client.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use super::sparql::{self, graph_url, DatasetAdmin};
use super::{check_iri, GraphStore};
use crate::config::StoreConfig;
use crate::error::StoreError;

const TURTLE: &str = "text/turtle";
const SPARQL_UPDATE: &str = "application/sparql-update";
const FORM: &str = "application/x-www-form-urlencoded";

/// `GET $/datasets` response, reduced to the dataset names.
#[derive(Debug, Deserialize)]
struct DatasetList {
    #[serde(default)]
    datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Deserialize)]
struct DatasetEntry {
    #[serde(rename = "ds.name", default)]
    name: String,
}

/// Talks to a store exposing the SPARQL 1.1 graph store protocol on
/// `data_url` and SPARQL update on `update_url` (Fuseki layout).
#[derive(Debug, Clone)]
pub struct HttpGraphStore {
    data_url: String,
    update_url: String,
    catalog_iri: String,
    username: Option<String>,
    password: Option<String>,
    http: reqwest::Client,
}

impl HttpGraphStore {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: &StoreConfig, catalog_iri: impl Into<String>) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;
        Ok(Self {
            data_url: config.data_url.clone(),
            update_url: config.update_url.clone(),
            catalog_iri: catalog_iri.into(),
            username: config.username.clone(),
            password: config.password.clone(),
            http,
        })
    }

    pub fn catalog_iri(&self) -> &str {
        &self.catalog_iri
    }

    fn add_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_deref()),
            None => req,
        }
    }

    /// Send `req` and accept 200/201/204, plus 404 when `absent_ok`.
    async fn send(
        &self,
        operation: &str,
        url: &str,
        req: RequestBuilder,
        absent_ok: bool,
    ) -> Result<(), StoreError> {
        debug!(url = %url, operation, "triple store request");
        let resp = self
            .add_auth(req)
            .send()
            .await
            .map_err(|e| Self::transport_error(url, e))?;

        match resp.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND if absent_ok => {
                debug!(url = %url, operation, "already absent");
                Ok(())
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(StoreError::Status {
                    operation: operation.to_string(),
                    status: status.as_u16(),
                    body: body.trim().to_string(),
                })
            }
        }
    }

    async fn update(&self, operation: &str, request: String) -> Result<(), StoreError> {
        let req = self
            .http
            .post(&self.update_url)
            .header(CONTENT_TYPE, SPARQL_UPDATE)
            .body(request);
        self.send(operation, &self.update_url, req, false).await
    }

    fn transport_error(url: &str, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout {
                url: url.to_string(),
            }
        } else {
            StoreError::Transport {
                url: url.to_string(),
                source: e,
            }
        }
    }

    /// Whether the Fuseki admin API lists `admin.name`.
    async fn dataset_exists(&self, admin: &DatasetAdmin) -> Result<bool, StoreError> {
        let url = &admin.datasets_url;
        debug!(url = %url, "listing datasets");
        let resp = self
            .add_auth(self.http.get(url).header(ACCEPT, "application/json"))
            .send()
            .await
            .map_err(|e| Self::transport_error(url, e))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StoreError::Status {
                operation: "list datasets".to_string(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        let list: DatasetList = serde_json::from_str(&body).map_err(|e| StoreError::Rejected {
            operation: "list datasets".to_string(),
            reason: e.to_string(),
        })?;
        Ok(list
            .datasets
            .iter()
            .any(|d| d.name.trim_matches('/') == admin.name))
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn publish(&self, graph_iri: &str, turtle: &str) -> Result<(), StoreError> {
        check_iri(graph_iri)?;
        let url = graph_url(&self.data_url, graph_iri);
        let req = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, TURTLE)
            .body(turtle.to_string());
        self.send("publish", &url, req, false).await
    }

    async fn retract(&self, graph_iri: &str) -> Result<(), StoreError> {
        check_iri(graph_iri)?;
        let url = graph_url(&self.data_url, graph_iri);
        let req = self.http.delete(&url);
        self.send("retract", &url, req, true).await
    }

    async fn add_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        check_iri(dataset_iri)?;
        self.update(
            "add membership",
            sparql::insert_membership(&self.catalog_iri, dataset_iri),
        )
        .await
    }

    async fn remove_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        check_iri(dataset_iri)?;
        self.update(
            "remove membership",
            sparql::delete_membership(&self.catalog_iri, dataset_iri),
        )
        .await
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        self.update("clear named graphs", sparql::CLEAR_NAMED_GRAPHS.to_string())
            .await?;
        self.update("clear default graph", sparql::CLEAR_DEFAULT_GRAPH.to_string())
            .await
    }

    /// Create the Fuseki dataset named in the data URL if the server does
    /// not list it yet.
    async fn ensure_dataset(&self) -> Result<(), StoreError> {
        let admin = sparql::dataset_admin(&self.data_url).ok_or_else(|| {
            StoreError::Client(format!(
                "cannot derive a dataset name from {}",
                self.data_url
            ))
        })?;
        if self.dataset_exists(&admin).await? {
            debug!(dataset = %admin.name, "dataset already exists");
            return Ok(());
        }

        let url = &admin.datasets_url;
        let req = self
            .http
            .post(url)
            .header(CONTENT_TYPE, FORM)
            .body(sparql::create_dataset_form(&admin.name));
        let resp = self
            .add_auth(req)
            .send()
            .await
            .map_err(|e| Self::transport_error(url, e))?;
        match resp.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => {
                info!(dataset = %admin.name, "created triple store dataset");
                Ok(())
            }
            status => Err(StoreError::Status {
                operation: "create dataset".to_string(),
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default().trim().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;

    const CATALOG: &str = "https://example.org/catalog";
    const GRAPH: &str = "https://example.org/id/a";
    /// `admin:secret`
    const BASIC_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

    /// One request as the server saw it.
    #[derive(Debug)]
    struct Received {
        method: String,
        target: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Received {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Serve one connection per scripted `(status, body)` reply and hand
    /// back what was received.
    async fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Received>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut received = Vec::new();
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                received.push(read_request(&mut socket).await);
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            received
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> Received {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_len = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request head");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_len]).into_owned();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap().split(' ');
        let method = request_line.next().unwrap().to_string();
        let target = request_line.next().unwrap().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map_or(0, |(_, v)| v.parse::<usize>().unwrap());
        while buf.len() < head_len + length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[head_len..head_len + length]).into_owned();

        Received {
            method,
            target,
            headers,
            body,
        }
    }

    fn store_at(server: &str) -> HttpGraphStore {
        let config = StoreConfig {
            data_url: format!("{server}/ds/data"),
            update_url: format!("{server}/ds/update"),
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            timeout: Duration::from_secs(5),
        };
        HttpGraphStore::new(&config, CATALOG).unwrap()
    }

    fn unreachable_store() -> HttpGraphStore {
        let mut store = store_at("http://127.0.0.1:9");
        store.http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        store
    }

    // --- Graph store protocol ---

    #[tokio::test]
    async fn publish_puts_turtle_into_the_named_graph() {
        let (server, handle) = serve(vec![(201, "")]).await;
        let turtle = "<https://example.org/id/a> a <http://www.w3.org/ns/dcat#Dataset> .\n";
        store_at(&server).publish(GRAPH, turtle).await.unwrap();

        let received = handle.await.unwrap();
        let req = &received[0];
        assert_eq!(req.method, "PUT");
        assert_eq!(req.target, "/ds/data?graph=https%3A%2F%2Fexample.org%2Fid%2Fa");
        assert_eq!(req.header("content-type"), Some("text/turtle"));
        assert_eq!(req.header("authorization"), Some(BASIC_AUTH));
        assert_eq!(req.body, turtle);
    }

    #[tokio::test]
    async fn retract_of_an_absent_graph_succeeds() {
        let (server, handle) = serve(vec![(404, "")]).await;
        store_at(&server).retract(GRAPH).await.unwrap();

        let received = handle.await.unwrap();
        assert_eq!(received[0].method, "DELETE");
        assert_eq!(
            received[0].target,
            "/ds/data?graph=https%3A%2F%2Fexample.org%2Fid%2Fa"
        );
    }

    #[tokio::test]
    async fn server_errors_carry_status_and_body() {
        let (server, handle) = serve(vec![(500, "boom"), (404, "no such dataset")]).await;
        let store = store_at(&server);

        let err = store.retract(GRAPH).await.unwrap_err();
        match err {
            StoreError::Status {
                operation,
                status,
                body,
            } => {
                assert_eq!(operation, "retract");
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected a status error, got {other:?}"),
        }

        // 404 only counts as success for retract.
        let err = store.publish(GRAPH, "").await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 404, .. }), "{err:?}");
        handle.await.unwrap();
    }

    // --- SPARQL update ---

    #[tokio::test]
    async fn membership_changes_post_sparql_updates() {
        let (server, handle) = serve(vec![(204, ""), (200, "")]).await;
        let store = store_at(&server);
        store.add_membership(GRAPH).await.unwrap();
        store.remove_membership(GRAPH).await.unwrap();

        let received = handle.await.unwrap();
        for req in &received {
            assert_eq!(req.method, "POST");
            assert_eq!(req.target, "/ds/update");
            assert_eq!(req.header("content-type"), Some("application/sparql-update"));
            assert_eq!(req.header("authorization"), Some(BASIC_AUTH));
        }
        assert_eq!(received[0].body, sparql::insert_membership(CATALOG, GRAPH));
        assert_eq!(received[1].body, sparql::delete_membership(CATALOG, GRAPH));
    }

    #[tokio::test]
    async fn wipe_clears_named_then_default_graphs() {
        let (server, handle) = serve(vec![(204, ""), (204, "")]).await;
        store_at(&server).wipe().await.unwrap();

        let bodies: Vec<_> = handle.await.unwrap().into_iter().map(|r| r.body).collect();
        assert_eq!(bodies, [sparql::CLEAR_NAMED_GRAPHS, sparql::CLEAR_DEFAULT_GRAPH]);
    }

    // --- Dataset provisioning ---

    #[tokio::test]
    async fn existing_dataset_is_left_alone() {
        let listing = r#"{"datasets": [{"ds.name": "/other"}, {"ds.name": "/ds"}]}"#;
        let (server, handle) = serve(vec![(200, listing)]).await;
        store_at(&server).ensure_dataset().await.unwrap();

        let received = handle.await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].method, "GET");
        assert_eq!(received[0].target, "/$/datasets");
        assert_eq!(received[0].header("authorization"), Some(BASIC_AUTH));
    }

    #[tokio::test]
    async fn missing_dataset_is_created_as_tdb2() {
        let (server, handle) = serve(vec![(200, r#"{"datasets": []}"#), (200, "")]).await;
        store_at(&server).ensure_dataset().await.unwrap();

        let received = handle.await.unwrap();
        assert_eq!(received.len(), 2);
        let create = &received[1];
        assert_eq!(create.method, "POST");
        assert_eq!(create.target, "/$/datasets");
        assert_eq!(
            create.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(create.body, "dbName=ds&dbType=tdb2");
    }

    #[tokio::test]
    async fn failed_dataset_creation_is_reported() {
        let (server, handle) = serve(vec![(200, "{}"), (403, "forbidden")]).await;
        let err = store_at(&server).ensure_dataset().await.unwrap_err();
        assert!(
            matches!(err, StoreError::Status { status: 403, ref operation, .. } if operation == "create dataset"),
            "{err:?}"
        );
        handle.await.unwrap();
    }

    // --- Local failures ---

    #[tokio::test]
    async fn invalid_graph_iris_never_leave_the_process() {
        let store = unreachable_store();
        let err = store.publish("not an iri", "").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidIri(_)), "{err:?}");
        let err = store.add_membership("relative/x").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidIri(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_store_is_a_failure_not_a_panic() {
        let store = unreachable_store();
        let err = store.retract(GRAPH).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Transport { .. } | StoreError::Timeout { .. }),
            "{err:?}"
        );
        assert!(err.to_string().contains("127.0.0.1:9"), "{err}");
    }
}
