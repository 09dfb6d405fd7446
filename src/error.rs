use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::pages;
use crate::ratings::RatingsError;

#[derive(Error, Debug)]
pub enum AppError {
	#[error("Not found")]
	NotFound,

	#[error("Rating must be a whole number between 1 and 5")]
	InvalidRating,

	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("Session store error: {0}")]
	Session(#[from] std::io::Error),

	#[error("Corrupt session data: {0}")]
	SessionData(#[from] serde_json::Error),

	#[error("Password hashing failed: {0}")]
	PasswordHash(String),

	#[error("Ratings provider unavailable: {0}")]
	Ratings(#[from] RatingsError),
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = match self {
			AppError::NotFound => return (StatusCode::NOT_FOUND, pages::not_found()).into_response(),
			AppError::InvalidRating => StatusCode::BAD_REQUEST,
			AppError::Ratings(_) => StatusCode::BAD_GATEWAY,
			AppError::Database(_)
			| AppError::Session(_)
			| AppError::SessionData(_)
			| AppError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
		};

		if status.is_server_error() {
			error!("{self}");
		}

		(status, self.to_string()).into_response()
	}
}

/// Business-rule refusals. The page script reads the code and shows the
/// matching message, so these travel as a normal 200 JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
	UsernameTaken,
	UnknownUser,
	WrongPassword,
	DuplicateComment,
}

impl Rejection {
	pub fn code(self) -> &'static str {
		match self {
			Rejection::UsernameTaken => "1",
			Rejection::UnknownUser => "1",
			Rejection::WrongPassword => "2",
			Rejection::DuplicateComment => "1",
		}
	}
}

impl IntoResponse for Rejection {
	fn into_response(self) -> Response {
		Json(json!({ "error": self.code() })).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_codes() {
		assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
		assert_eq!(AppError::InvalidRating.into_response().status(), StatusCode::BAD_REQUEST);
		assert_eq!(
			AppError::Ratings(RatingsError::NoEntry("1".into())).into_response().status(),
			StatusCode::BAD_GATEWAY,
		);
		assert_eq!(
			AppError::PasswordHash("salt".into()).into_response().status(),
			StatusCode::INTERNAL_SERVER_ERROR,
		);
	}

	#[test]
	fn rejection_codes_match_page_script() {
		assert_eq!(Rejection::UsernameTaken.code(), "1");
		assert_eq!(Rejection::UnknownUser.code(), "1");
		assert_eq!(Rejection::WrongPassword.code(), "2");
		assert_eq!(Rejection::DuplicateComment.code(), "1");
		assert_eq!(Rejection::WrongPassword.into_response().status(), StatusCode::OK);
	}
}
