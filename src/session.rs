//! Server-side sessions.
//!
//! The browser only holds a random id in the `session` cookie; what the id
//! maps to lives in a file named after it under the session directory. The
//! cookie has no expiry, so a session ends with the browser, on logout, or
//! once its file is older than the store's max age. Expired files are swept
//! at startup and whenever someone logs in.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use axum::{
	async_trait,
	extract::FromRequestParts,
	http::request::Parts,
	response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::types::Uid;
use crate::SharedState;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
	pub user_id: Option<Uid>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
	dir: PathBuf,
	max_age: Duration,
}

impl SessionStore {
	pub async fn open(dir: impl AsRef<Path>, max_age: Duration) -> Result<SessionStore, std::io::Error> {
		let dir = dir.as_ref().to_path_buf();
		tokio::fs::create_dir_all(&dir).await?;
		Ok(SessionStore { dir, max_age })
	}

	fn is_expired(&self, modified: SystemTime) -> bool {
		// a clock that went backwards makes the file look brand new
		modified.elapsed().unwrap_or_default() > self.max_age
	}

	// ids are parsed uuids, so they can't escape the directory
	fn path(&self, id: &Uuid) -> PathBuf {
		self.dir.join(id.as_hyphenated().to_string())
	}

	pub async fn load(&self, id: &Uuid) -> Result<SessionData, AppError> {
		let path = self.path(id);
		let modified = match tokio::fs::metadata(&path).await {
			Ok(meta) => meta.modified()?,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SessionData::default()),
			Err(e) => return Err(e.into()),
		};
		if self.is_expired(modified) {
			return Ok(SessionData::default());
		}

		match tokio::fs::read(&path).await {
			Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(SessionData::default()),
			Err(e) => Err(e.into()),
		}
	}

	pub async fn save(&self, id: &Uuid, data: &SessionData) -> Result<(), AppError> {
		tokio::fs::write(self.path(id), serde_json::to_vec(data)?).await?;
		Ok(())
	}

	pub async fn remove(&self, id: &Uuid) -> Result<(), AppError> {
		match tokio::fs::remove_file(self.path(id)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	/// Deletes every session file older than the max age.
	/// Returns how many went.
	pub async fn prune(&self) -> Result<usize, AppError> {
		let mut removed = 0;
		let mut entries = tokio::fs::read_dir(&self.dir).await?;
		while let Some(entry) = entries.next_entry().await? {
			// leave anything we didn't write alone
			let Some(id) = entry.file_name().to_str().and_then(|name| Uuid::parse_str(name).ok()) else {
				continue;
			};
			let modified = match entry.metadata().await {
				Ok(meta) => meta.modified()?,
				Err(e) if e.kind() == ErrorKind::NotFound => continue,
				Err(e) => return Err(e.into()),
			};
			if self.is_expired(modified) {
				self.remove(&id).await?;
				removed += 1;
			}
		}

		if removed > 0 {
			info!("Pruned {removed} expired sessions");
		}
		Ok(removed)
	}
}

/// The requesting client's session, loaded before the handler runs.
pub struct Session {
	id: Option<Uuid>,
	data: SessionData,
	cookies: Cookies,
	store: SessionStore,
}

impl Session {
	pub fn user_id(&self) -> Option<Uid> {
		self.data.user_id
	}

	/// Forget everything, server side and in the browser.
	pub async fn clear(&mut self) -> Result<(), AppError> {
		if let Some(id) = self.id.take() {
			self.store.remove(&id).await?;
		}
		if self.cookies.get(SESSION_COOKIE).is_some() {
			self.cookies.remove(session_cookie(String::new()));
		}
		self.data = SessionData::default();
		Ok(())
	}

	/// Start a fresh session carrying `user_id`; any previous one is dropped.
	pub async fn log_in(&mut self, user_id: Uid) -> Result<(), AppError> {
		self.clear().await?;
		if let Err(e) = self.store.prune().await {
			warn!("Session sweep failed: {e}");
		}

		let id = Uuid::new_v4();
		let data = SessionData { user_id: Some(user_id) };
		self.store.save(&id, &data).await?;
		self.cookies.add(session_cookie(id.to_string()));

		self.id = Some(id);
		self.data = data;
		Ok(())
	}
}

fn session_cookie(value: String) -> Cookie<'static> {
	let mut cookie = Cookie::new(SESSION_COOKIE, value);
	cookie.set_path("/");
	cookie.set_http_only(true);
	cookie.set_same_site(SameSite::Lax);
	cookie
}

#[async_trait]
impl FromRequestParts<SharedState> for Session {
	type Rejection = Response;

	async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
		let cookies = Cookies::from_request_parts(parts, state).await
			.map_err(|e| e.into_response())?;
		let store = state.sessions.clone();

		let id = cookies.get(SESSION_COOKIE)
			.and_then(|c| Uuid::parse_str(c.value()).ok());

		let data = match &id {
			Some(id) => match store.load(id).await {
				Ok(data) => data,
				// an unreadable file counts as no session
				Err(e) => {
					warn!("Dropping unreadable session {id}: {e}");
					store.remove(id).await.map_err(|e| e.into_response())?;
					SessionData::default()
				}
			},
			None => SessionData::default(),
		};

		Ok(Session { id, data, cookies, store })
	}
}
