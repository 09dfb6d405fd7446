use argon2::{
	password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2,
};
use axum::{
	async_trait,
	extract::FromRequestParts,
	http::request::Parts,
	response::{IntoResponse, Redirect, Response},
};

use crate::error::AppError;
use crate::session::Session;
use crate::types::Uid;
use crate::SharedState;

pub fn hash_password(password: &str) -> Result<String, AppError> {
	let salt = SaltString::generate(&mut OsRng);
	Argon2::default()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| AppError::PasswordHash(e.to_string()))
}

// an unparsable stored hash can never match
pub fn verify_password(password: &str, hashed: &str) -> bool {
	match PasswordHash::new(hashed) {
		Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
		Err(_) => false,
	}
}

/// Login gate. Taking this as a handler argument makes the route
/// redirect anonymous clients to `/login` before the handler runs.
pub struct CurrentUser {
	pub user_id: Uid,
	pub session: Session,
}

#[async_trait]
impl FromRequestParts<SharedState> for CurrentUser {
	type Rejection = Response;

	async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
		let session = Session::from_request_parts(parts, state).await?;
		match session.user_id() {
			Some(user_id) => Ok(CurrentUser { user_id, session }),
			None => Err(Redirect::to("/login").into_response()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hashes_are_salted_and_verify() {
		let first = hash_password("hunter2").unwrap();
		let second = hash_password("hunter2").unwrap();
		assert_ne!(first, second);

		assert!(verify_password("hunter2", &first));
		assert!(verify_password("hunter2", &second));
		assert!(!verify_password("hunter3", &first));
	}

	#[test]
	fn garbage_hash_never_verifies() {
		assert!(!verify_password("", "plaintext"));
		assert!(!verify_password("x", ""));
	}
}
