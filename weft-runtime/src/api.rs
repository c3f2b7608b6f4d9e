//! HTTP endpoints serving the graph for external visualization.
//!
//! Two read-only endpoints: `/graph` renders the dependency DAG and
//! `/nametable` the reference lookup structure, both as DOT text for an
//! external graphviz renderer. Handlers take the read half of the graph lock.

use crate::flow::Flow;
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use weft_core::error::{Result, WeftError};

/// Configuration for the visualization server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        let host: std::net::IpAddr = self.host.parse().unwrap_or([127, 0, 0, 1].into());
        SocketAddr::new(host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9090,
        }
    }
}

/// Route a request to a DOT endpoint.
pub async fn route<B>(
    req: Request<B>,
    flow: Arc<Flow>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    B: Send,
{
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/graph") => dot_response(flow.graph_dot().await),
        (&Method::GET, "/nametable") => dot_response(flow.nametable_dot().await),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from_static(b"not found\n")))
            .expect("static response"),
    };
    Ok(response)
}

fn dot_response(dot: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, "text/vnd.graphviz")
        .body(Full::new(Bytes::from(dot)))
        .expect("static response")
}

/// The visualization HTTP server.
pub struct ApiServer {
    config: ServerConfig,
    flow: Arc<Flow>,
}

impl ApiServer {
    /// Create a server for a flow.
    pub fn new(config: ServerConfig, flow: Arc<Flow>) -> Self {
        Self { config, flow }
    }

    /// Serve until the token is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| WeftError::Io {
            path: std::path::PathBuf::from(addr.to_string()),
            cause: e.to_string(),
        })?;

        tracing::info!(
            host = %self.config.host,
            port = %self.config.port,
            "visualization server started"
        );

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let Ok((stream, remote_addr)) = result else {
                        continue;
                    };
                    let io = TokioIo::new(stream);
                    let flow = Arc::clone(&self.flow);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let flow = Arc::clone(&flow);
                            async move { route(req, flow).await }
                        });

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::warn!(
                                remote = %remote_addr,
                                error = %err,
                                "HTTP connection error"
                            );
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("visualization server shutting down");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use weft_core::component::Registry;
    use weft_core::testing::ProbeRegistry;

    async fn loaded_flow() -> (Arc<Flow>, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"
components:
  - kind: source
    labels: [s]
    body:
      value: 1
  - kind: sink
    labels: [k]
    body:
      input: ${source.s.out}
"#,
        )
        .unwrap();

        let registry = Arc::new(ProbeRegistry::new(["source", "sink"]));
        let flow = Arc::new(Flow::new(registry as Arc<dyn Registry>, file.path()));
        flow.load().await.unwrap();
        (flow, file)
    }

    #[tokio::test]
    async fn graph_endpoint_serves_dot() {
        let (flow, _file) = loaded_flow().await;
        let req = Request::builder().uri("/graph").body(()).unwrap();

        let response = route(req, flow).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[hyper::header::CONTENT_TYPE],
            "text/vnd.graphviz"
        );
    }

    #[tokio::test]
    async fn nametable_endpoint_serves_dot() {
        let (flow, _file) = loaded_flow().await;
        let req = Request::builder().uri("/nametable").body(()).unwrap();

        let response = route(req, flow).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (flow, _file) = loaded_flow().await;
        let req = Request::builder().uri("/elsewhere").body(()).unwrap();

        let response = route(req, flow).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn server_config_socket_addr() {
        let config = ServerConfig::new("127.0.0.1", 9000);
        assert_eq!(config.socket_addr().port(), 9000);
    }
}
