use serde::{Deserialize, Serialize};

pub type Uid = i64;
pub type Bid = i64;
pub type Cid = i64;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
	pub id: Uid,
	pub username: String,
	pub hashed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
	pub id: Bid,
	pub isbn: String,
	pub title: String,
	pub author: String,
	pub year: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
	pub isbn: String,
	pub title: String,
	pub author: String,
	pub year: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
	pub id: Cid,
	pub book_isbn: String,
	pub username: String,
	pub message: String,
	pub rating: i64,
}

#[derive(Debug, Clone)]
pub struct NewComment<'a> {
	pub book_isbn: &'a str,
	pub username: &'a str,
	pub message: &'a str,
	pub rating: i64,
}

/// One row of `/search` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
	pub isbn: String,
	pub title: String,
	pub author: String,
}

impl From<Book> for SearchHit {
	fn from(book: Book) -> Self {
		SearchHit {
			isbn: book.isbn,
			title: book.title,
			author: book.author,
		}
	}
}

/// Body of `/api/{isbn}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDetails {
	pub title: String,
	pub author: String,
	pub year: i64,
	pub isbn: String,
	pub review_count: i64,
	pub average_score: f64,
}

#[derive(Deserialize, Debug)]
pub struct FormRegister {
	pub reg_username: String,
	pub reg_password: String,
}

#[derive(Deserialize, Debug)]
pub struct FormLogin {
	pub login_user: String,
	pub login_pw: String,
}

// rating arrives as text so a bad value gets our own 400 instead of a decode error
#[derive(Deserialize, Debug)]
pub struct FormComment {
	pub user_comment: String,
	pub rating: String,
}

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

impl FormComment {
	pub fn rating(&self) -> Option<i64> {
		self.rating.trim().parse::<i64>()
			.ok()
			.filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
	}
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchParams {
	#[serde(default)]
	pub q: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn form(rating: &str) -> FormComment {
		FormComment { user_comment: "ok".into(), rating: rating.into() }
	}

	#[test]
	fn rating_must_be_in_range() {
		assert_eq!(form("1").rating(), Some(1));
		assert_eq!(form(" 5 ").rating(), Some(5));
		assert_eq!(form("0").rating(), None);
		assert_eq!(form("6").rating(), None);
		assert_eq!(form("four").rating(), None);
		assert_eq!(form("").rating(), None);
	}

	#[test]
	fn search_hit_drops_id_and_year() {
		let book = Book {
			id: 7,
			isbn: "0380795272".into(),
			title: "Krondor: The Betrayal".into(),
			author: "Raymond E. Feist".into(),
			year: 1998,
		};
		let hit = SearchHit::from(book);
		assert_eq!(serde_json::to_value(&hit).unwrap(), serde_json::json!({
			"isbn": "0380795272",
			"title": "Krondor: The Betrayal",
			"author": "Raymond E. Feist",
		}));
	}
}
