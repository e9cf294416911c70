//! Trials Back binary entrypoint wiring the session, its background tasks and the HTTP layer.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trials_back::{
    config::{AppConfig, StoreSettings},
    dao::{
        catalog::{load_catalog, load_easter_eggs},
        session_store::{FileSessionStore, MemorySessionStore, SessionStore},
    },
    gateway::{CatalogVerifier, FlagVerifier},
    routes,
    services::{persistence, timer_service},
    state::{
        AppState, Collaborators, Rules, SharedState,
        clock::{Clock, SystemClock},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load().context("loading configuration")?;
    let catalog = load_catalog(&config.content.challenges).context("loading challenge catalog")?;
    let easter_eggs =
        load_easter_eggs(&config.content.easter_eggs).context("loading easter eggs")?;
    info!(
        challenges = catalog.len(),
        easter_eggs = easter_eggs.len(),
        "static content loaded"
    );

    let rules = Arc::new(Rules {
        game: config.game.clone(),
        tables: config.tables.clone(),
        catalog,
        easter_eggs,
    });

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = build_store(&config.store).await?;
    let verifier = build_verifier(&config, rules.clone())?;

    let session = persistence::hydrate(store.as_ref(), clock.now(), &rules.tables)
        .await
        .context("restoring session; fix or remove the stored session before restarting")?;

    let app_state = AppState::new(
        rules,
        session,
        Collaborators {
            clock,
            verifier,
            store,
        },
        config.timings,
    );

    tokio::spawn(timer_service::run(app_state.clone()));
    let writer = tokio::spawn(persistence::run_writer(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    // The writer may be mid-save; stop it so the final flush is the last write.
    writer.abort();
    let _ = writer.await;
    if let Err(err) = persistence::flush(&app_state).await {
        warn!(error = %err, "failed to persist session on shutdown");
    }

    Ok(())
}

/// Instantiate the configured session store.
async fn build_store(settings: &StoreSettings) -> anyhow::Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match settings {
        StoreSettings::Memory => {
            warn!("session kept in memory only; it will not survive a restart");
            Arc::new(MemorySessionStore::new())
        }
        StoreSettings::File(path) => Arc::new(FileSessionStore::new(path.clone())),
        #[cfg(feature = "couch-store")]
        StoreSettings::Couch => {
            use trials_back::dao::session_store::couchdb::{CouchConfig, CouchSessionStore};

            let config = CouchConfig::from_env().context("reading CouchDB configuration")?;
            Arc::new(
                CouchSessionStore::connect(config)
                    .await
                    .context("connecting to CouchDB")?,
            )
        }
        #[cfg(not(feature = "couch-store"))]
        StoreSettings::Couch => anyhow::bail!("SESSION_STORE=couch requires the `couch-store` feature"),
    };
    info!(backend = store.backend(), "session store selected");
    Ok(store)
}

/// Pick the remote verifier when configured, the in-process catalog otherwise.
fn build_verifier(config: &AppConfig, rules: Arc<Rules>) -> anyhow::Result<Arc<dyn FlagVerifier>> {
    match &config.verifier_url {
        #[cfg(feature = "remote-verifier")]
        Some(url) => {
            use trials_back::gateway::HttpVerifier;

            info!(%url, "using remote flag verifier");
            let verifier = HttpVerifier::new(url.clone(), config.timings.verify_timeout)
                .context("building remote verifier client")?;
            Ok(Arc::new(verifier))
        }
        #[cfg(not(feature = "remote-verifier"))]
        Some(_) => anyhow::bail!("VERIFIER_URL requires the `remote-verifier` feature"),
        None => Ok(Arc::new(CatalogVerifier::new(rules))),
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
