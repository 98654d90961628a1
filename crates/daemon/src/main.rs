// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gobbyd — the Gobby daemon binary

use gobby_daemon::{config::DaemonConfig, lifecycle, server};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let config = DaemonConfig::load(None);

    let paths = match lifecycle::DaemonPaths::resolve(&config) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("gobbyd: {e}");
            return 1;
        }
    };

    // File logging with env-filter; GOBBY_LOGGING_LEVEL feeds the default.
    if let Err(e) = std::fs::create_dir_all(&paths.logs_dir) {
        eprintln!("gobbyd: create log dir: {e}");
        return 1;
    }
    let file_appender = tracing_appender::rolling::daily(&paths.logs_dir, "gobbyd.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    // Invariant violations during boot are fatal.
    let startup = match lifecycle::startup(&config, paths) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("gobbyd: startup failed: {e}");
            return 1;
        }
    };
    let shutdown = startup.shutdown.clone();

    let addr: SocketAddr = match format!("{}:{}", config.server.host, config.server.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("gobbyd: bad listen address: {e}");
            return 1;
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("gobbyd: bind {addr}: {e}");
            return 1;
        }
    };
    tracing::info!(%addr, "gobbyd listening");
    println!("READY {addr}");

    let router = server::router(startup.state.clone());
    let serve = axum::serve(listener, router).with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = signal_received() => {
                    tracing::info!("signal received, shutting down");
                }
            }
        }
    });

    let result = serve.await;
    shutdown.cancel();
    if let Err(e) = result {
        tracing::error!(error = %e, "server error");
        return 1;
    }
    0
}

async fn signal_received() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
