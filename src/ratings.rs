//! Client for the third-party review-count endpoint.
//!
//! One GET per call, no retries and no caching. Whatever goes wrong on the
//! provider side comes back as a [`RatingsError`] for the handler to surface.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_RATINGS_URL: &str = "https://www.goodreads.com";
const REVIEW_COUNTS_PATH: &str = "/book/review_counts.json";

#[derive(Error, Debug)]
pub enum RatingsError {
	#[error("request failed: {0}")]
	Request(#[from] reqwest::Error),

	#[error("no ratings returned for isbn {0}")]
	NoEntry(String),

	#[error("average rating {0:?} is not a number")]
	BadAverage(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratings {
	pub ratings_count: i64,
	pub reviews_count: i64,
	pub average_rating: f64,
}

#[derive(Deserialize)]
struct ReviewCounts {
	books: Vec<ReviewCountEntry>,
}

#[derive(Deserialize)]
struct ReviewCountEntry {
	work_ratings_count: i64,
	work_reviews_count: i64,
	average_rating: Score,
}

// sent as "3.81" by some providers and 3.81 by others
#[derive(Deserialize)]
#[serde(untagged)]
enum Score {
	Number(f64),
	Text(String),
}

impl Score {
	fn value(self) -> Result<f64, RatingsError> {
		match self {
			Score::Number(n) => Ok(n),
			Score::Text(s) => s.trim().parse().map_err(|_| RatingsError::BadAverage(s)),
		}
	}
}

#[derive(Clone)]
pub struct RatingsClient {
	http: Client,
	base_url: String,
	api_key: String,
}

impl RatingsClient {
	pub fn new(base_url: &str, api_key: &str) -> Self {
		RatingsClient {
			http: Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
			api_key: api_key.to_string(),
		}
	}

	pub async fn fetch(&self, isbn: &str) -> Result<Ratings, RatingsError> {
		let url = format!("{}{}", self.base_url, REVIEW_COUNTS_PATH);
		debug!("Fetching ratings for {isbn}");

		let counts: ReviewCounts = self.http
			.get(url)
			.query(&[("key", self.api_key.as_str()), ("isbns", isbn)])
			.send().await?
			.error_for_status()?
			.json().await?;

		let entry = counts.books.into_iter()
			.next()
			.ok_or_else(|| RatingsError::NoEntry(isbn.to_string()))?;

		Ok(Ratings {
			ratings_count: entry.work_ratings_count,
			reviews_count: entry.work_reviews_count,
			average_rating: entry.average_rating.value()?,
		})
	}
}

/// Throwaway provider bound to a random local port, for tests.
#[cfg(test)]
pub(crate) mod fake {
	use axum::{
		extract::Query,
		http::StatusCode,
		response::{IntoResponse, Response},
		routing::get,
		Json, Router,
	};
	use serde::Deserialize;
	use serde_json::json;

	pub const UNKNOWN_ISBN: &str = "0000000000";
	pub const EMPTY_ISBN: &str = "1111111111";

	#[derive(Deserialize)]
	struct Params {
		key: String,
		isbns: String,
	}

	async fn review_counts(Query(params): Query<Params>) -> Response {
		if params.key != "test-key" {
			return StatusCode::UNAUTHORIZED.into_response();
		}
		match params.isbns.as_str() {
			UNKNOWN_ISBN => StatusCode::NOT_FOUND.into_response(),
			EMPTY_ISBN => Json(json!({ "books": [] })).into_response(),
			isbn => Json(json!({ "books": [{
				"isbn": isbn,
				"work_ratings_count": 1234,
				"work_reviews_count": 56,
				"average_rating": "3.81",
			}] })).into_response(),
		}
	}

	/// Returns the base url to hand to `RatingsClient::new`.
	pub async fn spawn() -> String {
		let app = Router::new().route("/book/review_counts.json", get(review_counts));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{addr}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn reads_first_entry() {
		let client = RatingsClient::new(&fake::spawn().await, "test-key");
		let ratings = client.fetch("0380795272").await.unwrap();
		assert_eq!(ratings, Ratings {
			ratings_count: 1234,
			reviews_count: 56,
			average_rating: 3.81,
		});
	}

	#[tokio::test]
	async fn trailing_slash_in_base_url() {
		let base = format!("{}/", fake::spawn().await);
		let client = RatingsClient::new(&base, "test-key");
		assert!(client.fetch("0380795272").await.is_ok());
	}

	#[tokio::test]
	async fn provider_errors_are_reported() {
		let base = fake::spawn().await;

		let client = RatingsClient::new(&base, "test-key");
		assert!(matches!(client.fetch(fake::UNKNOWN_ISBN).await, Err(RatingsError::Request(_))));
		assert!(matches!(client.fetch(fake::EMPTY_ISBN).await, Err(RatingsError::NoEntry(_))));

		let wrong_key = RatingsClient::new(&base, "nope");
		assert!(matches!(wrong_key.fetch("0380795272").await, Err(RatingsError::Request(_))));
	}

	#[tokio::test]
	async fn unreachable_provider() {
		// nothing listens on port 9 locally
		let client = RatingsClient::new("http://127.0.0.1:9", "test-key");
		assert!(matches!(client.fetch("0380795272").await, Err(RatingsError::Request(_))));
	}

	#[test]
	fn average_as_text_or_number() {
		let parsed: ReviewCounts = serde_json::from_str(
			r#"{"books":[{"work_ratings_count":1,"work_reviews_count":2,"average_rating":4.5}]}"#
		).unwrap();
		let entry = parsed.books.into_iter().next().unwrap();
		assert_eq!(entry.average_rating.value().unwrap(), 4.5);

		assert!(matches!(Score::Text("n/a".into()).value(), Err(RatingsError::BadAverage(_))));
	}
}
