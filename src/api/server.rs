use crate::utils::error::Result;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use rustls::ServerConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tower::Service;

/// 關閉時等待進行中連線的上限
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// 在 TLS 之上提供路由，直到 `shutdown` 完成
///
/// 握手失敗只影響該連線，不會中止接受迴圈。
pub async fn serve<F>(
    listener: TcpListener,
    tls_config: Arc<ServerConfig>,
    app: Router,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let acceptor = TlsAcceptor::from(tls_config);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("🚀 Broker listening on https://{}", addr);
    }

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("🛑 Shutdown requested, no longer accepting connections");
                break;
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!("⚠️ Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let acceptor = acceptor.clone();
                let tower_service = app.clone();
                connections.spawn(async move {
                    let tls_stream = match acceptor.accept(stream).await {
                        Ok(tls_stream) => tls_stream,
                        Err(e) => {
                            tracing::debug!(%peer, "TLS handshake failed: {}", e);
                            return;
                        }
                    };

                    let hyper_service =
                        hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
                            tower_service.clone().call(request)
                        });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(TokioIo::new(tls_stream), hyper_service)
                        .await
                    {
                        let err_str = err.to_string().to_lowercase();
                        if !err_str.contains("connection reset") && !err_str.contains("broken pipe") {
                            tracing::debug!(%peer, "Error serving connection: {}", err);
                        }
                    }
                });
            }
        }
    }

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            "⚠️ {} connection(s) still open after {:?}, aborting",
            connections.len(),
            SHUTDOWN_GRACE
        );
        connections.shutdown().await;
    }

    tracing::info!("👋 Broker stopped");
    Ok(())
}
