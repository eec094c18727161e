use carview_server::catalog::refresh::Refresher;
use carview_server::catalog::remote::RemoteCatalog;
use carview_server::config::{Backend, Config, Environment};
use carview_server::origin::OriginFetcher;
use carview_server::origin::http::HttpOrigin;
use carview_server::{CatalogState, SnapshotStore, server};
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, error, info};

fn init_tracing(env: Environment) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match env {
        Environment::Local => "debug,hyper=info,reqwest=info".into(),
        Environment::Dev => "debug,hyper=info".into(),
        Environment::Prod => "info".into(),
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match env {
        Environment::Local => builder.init(),
        Environment::Dev | Environment::Prod => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    init_tracing(config.env);

    info!("Starting Carview in {} with the {:?} backend", config.env, config.backend);
    debug!("{:?}", config);

    let origin: Arc<dyn OriginFetcher> = Arc::new(HttpOrigin::new(
        &config.origin_url,
        config.media_url.as_deref(),
        config.client_timeout,
    )?);

    // Root token: Ctrl-C stops the accept loop and every background task
    let shutdown = CancellationToken::new();

    let state = match config.backend {
        Backend::Memory => {
            let store = Arc::new(SnapshotStore::new());
            let refresher = Arc::new(Refresher::new(origin, store.clone()));

            info!("Performing initial catalog load from {}", config.origin_url);
            let report = refresher.refresh(config.startup_timeout).await.map_err(|e| {
                error!("❌ Initial catalog load failed: {}", e);
                e
            })?;
            info!(
                "✅ Initial catalog load complete: {} vehicles in {:?}",
                report.vehicles, report.elapsed
            );

            let cancel = shutdown.clone();
            let (interval, timeout) = (config.refresh_interval, config.refresh_timeout);
            tokio::spawn(async move { refresher.run(interval, timeout, cancel).await });

            CatalogState::memory(store, config.request_timeout)
        }
        Backend::Remote => {
            let catalog = Arc::new(RemoteCatalog::new(origin, config.cache_ttl));
            catalog.spawn_janitors(config.cache_sweep_interval, shutdown.clone());
            CatalogState::new(catalog, None, config.request_timeout)
        }
    };

    let app = server::create_app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("Carview listening on http://{} (HTTP/1.1 + HTTP/2)", config.listen_addr);

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down");
            shutdown.cancel();
        }
    });

    // Use hyper's auto-negotiating server to support both HTTP/1.1 and HTTP/2
    let conn_builder = ConnBuilder::new(hyper_util::rt::TokioExecutor::new());

    loop {
        let (stream, addr) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            },
        };
        debug!("New connection from: {}", addr);
        let io = TokioIo::new(stream);
        let app_clone = app.clone();
        let conn_builder = conn_builder.clone();

        tokio::spawn(async move {
            if let Err(err) = conn_builder
                .serve_connection(
                    io,
                    hyper::service::service_fn(move |req| app_clone.clone().call(req)),
                )
                .await
            {
                // Check if the error is an io::Error indicating a normal close
                let is_normal_close = err
                    .source()
                    .and_then(|e| e.downcast_ref::<io::Error>())
                    .map(|io_err| {
                        matches!(
                            io_err.kind(),
                            io::ErrorKind::ConnectionReset
                                | io::ErrorKind::BrokenPipe
                                | io::ErrorKind::UnexpectedEof
                        )
                    })
                    .unwrap_or(false);

                if is_normal_close {
                    debug!("Connection from {} closed normally", addr);
                } else {
                    error!("Error serving connection from {}: {}", addr, err);
                }
            }
        });
    }

    Ok(())
}
