//! Book catalog with reviews.
//!
//! Users register and log in, search the catalog, open a book to see its
//! reviews alongside rating figures from an external provider, and leave one
//! review per book. Books themselves are loaded offline by the `import` binary.

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_cookies::CookieManagerLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub mod auth;
pub mod config;
pub mod error;
pub mod import;
pub mod pages;
pub mod ratings;
pub mod routes;
pub mod session;
pub mod sql;
pub mod types;

use config::Config;
use ratings::RatingsClient;
use routes::*;
use session::SessionStore;
use sql::Db;

pub struct ServerState {
	pub db: Db,
	pub sessions: SessionStore,
	pub ratings: RatingsClient,
}

pub type SharedState = Arc<ServerState>;

pub fn app(state: SharedState, static_dir: impl AsRef<Path>) -> Router {
	Router::new()
		.route("/", get(display_index))
		.route("/register", get(display_register).post(perform_register))
		.route("/login", get(display_login).post(perform_login))
		.route("/logout", get(perform_logout))
		.route("/search", get(perform_search))
		.route("/book/:isbn", get(display_book).post(perform_comment))
		.route("/api/:isbn", get(book_api))
		.nest_service("/static", ServeDir::new(static_dir))
		.layer(CookieManagerLayer::new())
		.with_state(state)
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
	info!("Connecting to database...");
	let db = Db::connect(&config.database_url).await?;
	db.schema().await?;

	let sessions = SessionStore::open(&config.session_dir, config.session_max_age).await?;
	sessions.prune().await?;

	let state = Arc::new(ServerState {
		db,
		sessions,
		ratings: RatingsClient::new(&config.ratings_url, &config.ratings_key),
	});

	let address = format!("0.0.0.0:{}", config.port);
	info!("Binding to {address}");
	let listener = TcpListener::bind(&address).await?;
	info!("Server running on {address}");

	axum::serve(listener, app(state, &config.static_dir))
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	info!("Server shut down");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
		info!("Received Ctrl+C, shutting down");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("Failed to install signal handler")
			.recv()
			.await;
		info!("Received terminate signal, shutting down");
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
