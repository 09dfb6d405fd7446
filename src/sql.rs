use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::types::{Book, Comment, NewBook, NewComment, Uid, User};

pub const SEARCH_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct Db {
	pool: SqlitePool,
}

impl Db {
	pub async fn connect(url: &str) -> Result<Db, sqlx::Error> {
		let options = SqliteConnectOptions::from_str(url)?
			.create_if_missing(true);

		let pool = SqlitePoolOptions::new()
			.max_connections(5)
			.acquire_timeout(Duration::from_secs(3))
			.connect_with(options).await?;

		Ok(Db::from_pool(pool))
	}

	pub fn from_pool(pool: SqlitePool) -> Db {
		Db { pool }
	}

	pub async fn schema(&self) -> Result<(), sqlx::Error> {
		for statement in TABLE_SCHEMA {
			sqlx::query(statement).execute(&self.pool).await?;
		}
		Ok(())
	}

	pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
		self.pool.begin().await
	}

	pub async fn user_by_name(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
		sqlx::query_as::<_, User>("SELECT id, username, hashed FROM users WHERE username = ?")
			.bind(username)
			.fetch_optional(&self.pool).await
	}

	pub async fn user_by_id(&self, id: Uid) -> Result<Option<User>, sqlx::Error> {
		sqlx::query_as::<_, User>("SELECT id, username, hashed FROM users WHERE id = ?")
			.bind(id)
			.fetch_optional(&self.pool).await
	}

	// on Ok returns the new user's id
	pub async fn insert_user(&self, username: &str, hashed: &str) -> Result<Uid, sqlx::Error> {
		let done = sqlx::query("INSERT INTO users (username, hashed) VALUES (?, ?)")
			.bind(username)
			.bind(hashed)
			.execute(&self.pool).await?;
		Ok(done.last_insert_rowid())
	}

	pub async fn book_by_isbn(&self, isbn: &str) -> Result<Option<Book>, sqlx::Error> {
		sqlx::query_as::<_, Book>(
			"SELECT id, isbn, title, author, year FROM books WHERE isbn = ? ORDER BY id LIMIT 1"
		)
			.bind(isbn)
			.fetch_optional(&self.pool).await
	}

	/// Substring match on isbn, title or author, in storage order.
	/// Matches against `folded`, which holds the three columns lowercased
	/// with Unicode rules; SQLite's own LIKE only folds ASCII.
	pub async fn search_books(&self, query: &str, limit: i64) -> Result<Vec<Book>, sqlx::Error> {
		let query: String = query.chars().filter(|c| *c != FIELD_SEPARATOR).collect();
		let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
		sqlx::query_as::<_, Book>(r#"
SELECT id, isbn, title, author, year FROM books
WHERE folded LIKE ?1 ESCAPE '\'
ORDER BY id
LIMIT ?2
		"#)
			.bind(pattern)
			.bind(limit)
			.fetch_all(&self.pool).await
	}

	pub async fn comments_for(&self, isbn: &str) -> Result<Vec<Comment>, sqlx::Error> {
		sqlx::query_as::<_, Comment>(
			"SELECT id, book_isbn, username, message, rating FROM comments WHERE book_isbn = ? ORDER BY id"
		)
			.bind(isbn)
			.fetch_all(&self.pool).await
	}

	pub async fn has_commented(&self, username: &str, isbn: &str) -> Result<bool, sqlx::Error> {
		let found: Option<i64> = sqlx::query_scalar(
			"SELECT id FROM comments WHERE username = ? AND book_isbn = ? LIMIT 1"
		)
			.bind(username)
			.bind(isbn)
			.fetch_optional(&self.pool).await?;
		Ok(found.is_some())
	}

	pub async fn insert_comment(&self, comment: &NewComment<'_>) -> Result<i64, sqlx::Error> {
		let done = sqlx::query(
			"INSERT INTO comments (book_isbn, username, message, rating) VALUES (?, ?, ?, ?)"
		)
			.bind(comment.book_isbn)
			.bind(comment.username)
			.bind(comment.message)
			.bind(comment.rating)
			.execute(&self.pool).await?;
		Ok(done.last_insert_rowid())
	}
}

// keeps a search from matching across two columns
const FIELD_SEPARATOR: char = '\u{1f}';

fn fold(book: &NewBook) -> String {
	[book.isbn.as_str(), book.title.as_str(), book.author.as_str()]
		.map(str::to_lowercase)
		.join(FIELD_SEPARATOR.to_string().as_str())
}

// books are only ever written by the importer, inside its transaction
pub async fn insert_book(conn: &mut SqliteConnection, book: &NewBook) -> Result<i64, sqlx::Error> {
	let done = sqlx::query("INSERT INTO books (isbn, title, author, year, folded) VALUES (?, ?, ?, ?, ?)")
		.bind(&book.isbn)
		.bind(&book.title)
		.bind(&book.author)
		.bind(book.year)
		.bind(fold(book))
		.execute(conn).await?;
	Ok(done.last_insert_rowid())
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
	match err {
		sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
		_ => false,
	}
}

fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	for chr in raw.chars() {
		if matches!(chr, '%' | '_' | '\\') {
			out.push('\\');
		}
		out.push(chr);
	}
	out
}

pub const TABLE_SCHEMA: [&str; 3] = [
r#"
CREATE TABLE IF NOT EXISTS users (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	username TEXT NOT NULL UNIQUE,
	hashed TEXT NOT NULL
);
"#,
r#"
CREATE TABLE IF NOT EXISTS books (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	isbn TEXT NOT NULL,
	title TEXT NOT NULL,
	author TEXT NOT NULL,
	year INTEGER NOT NULL,
	folded TEXT NOT NULL
);
"#,
r#"
CREATE TABLE IF NOT EXISTS comments (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	book_isbn TEXT NOT NULL,
	username TEXT NOT NULL,
	message TEXT NOT NULL,
	rating INTEGER NOT NULL,
	UNIQUE(username, book_isbn)
);
"#,
];

#[cfg(test)]
impl Db {
	pub(crate) async fn count(&self, table: &str) -> i64 {
		sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
			.fetch_one(&self.pool).await
			.unwrap()
	}

	pub(crate) async fn delete_user(&self, id: Uid) {
		sqlx::query("DELETE FROM users WHERE id = ?")
			.bind(id)
			.execute(&self.pool).await
			.unwrap();
	}
}

#[cfg(test)]
pub(crate) async fn memory_db() -> Db {
	// one connection, or every acquire would see a fresh empty database
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:").await
		.expect("can't open in-memory sqlite");
	let db = Db::from_pool(pool);
	db.schema().await.expect("can't create schema");
	db
}

#[cfg(test)]
pub(crate) async fn seed_books(db: &Db, books: &[(&str, &str, &str, i64)]) {
	let mut tx = db.begin().await.unwrap();
	for (isbn, title, author, year) in books {
		insert_book(&mut tx, &NewBook {
			isbn: isbn.to_string(),
			title: title.to_string(),
			author: author.to_string(),
			year: *year,
		}).await.unwrap();
	}
	tx.commit().await.unwrap();
}
