//! Bulk loading of the `books` table from CSV.
//!
//! Columns are taken by position: isbn, title, author, year. The first line
//! is a header and is skipped whatever it says.

use std::io::Read;

use thiserror::Error;
use tracing::{debug, info};

use crate::sql::{self, Db};
use crate::types::NewBook;

#[derive(Error, Debug)]
pub enum ImportError {
	#[error("can't read csv: {0}")]
	Csv(#[from] csv::Error),

	#[error("line {line}: expected 4 columns, found {found}")]
	Columns { line: u64, found: usize },

	#[error("line {line}: year {value:?} is not a number")]
	Year { line: u64, value: String },

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

fn parse_row(record: &csv::StringRecord) -> Result<NewBook, ImportError> {
	let line = record.position().map_or(0, |p| p.line());

	let [isbn, title, author, year] = [0, 1, 2, 3].map(|i| record.get(i));
	let (Some(isbn), Some(title), Some(author), Some(year)) = (isbn, title, author, year) else {
		return Err(ImportError::Columns { line, found: record.len() });
	};

	let year = year.trim().parse::<i64>()
		.map_err(|_| ImportError::Year { line, value: year.to_string() })?;

	Ok(NewBook {
		isbn: isbn.to_string(),
		title: title.to_string(),
		author: author.to_string(),
		year,
	})
}

/// Inserts every data row in one transaction; on any error nothing is kept.
/// Returns the number of books inserted.
pub async fn import_books<R: Read>(db: &Db, source: R) -> Result<u64, ImportError> {
	let mut reader = csv::ReaderBuilder::new()
		.has_headers(true)
		.flexible(true)
		.from_reader(source);

	let mut tx = db.begin().await?;
	let mut inserted = 0;
	for record in reader.records() {
		let book = parse_row(&record?)?;
		sql::insert_book(&mut tx, &book).await?;
		inserted += 1;
		if inserted % 1000 == 0 {
			debug!("{inserted} books so far");
		}
	}
	tx.commit().await?;

	info!("Imported {inserted} books");
	Ok(inserted)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql::memory_db;

	const BOOKS_CSV: &str = "\
isbn,title,author,year
0380795272,Krondor: The Betrayal,Raymond E. Feist,1998
1416949658,The Dark Is Rising,Susan Cooper,1973
0439785960,\"Harry Potter and the Half-Blood Prince (Harry Potter, #6)\",J.K. Rowling, 2005
";

	#[tokio::test]
	async fn inserts_every_data_row() {
		let db = memory_db().await;
		let n = import_books(&db, BOOKS_CSV.as_bytes()).await.unwrap();
		assert_eq!(n, 3);
		assert_eq!(db.count("books").await, 3);

		let hp = db.book_by_isbn("0439785960").await.unwrap().unwrap();
		assert_eq!(hp.title, "Harry Potter and the Half-Blood Prince (Harry Potter, #6)");
		assert_eq!(hp.author, "J.K. Rowling");
		assert_eq!(hp.year, 2005);

		// header row is not a book
		assert!(db.book_by_isbn("isbn").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn header_only() {
		let db = memory_db().await;
		assert_eq!(import_books(&db, "isbn,title,author,year\n".as_bytes()).await.unwrap(), 0);
		assert_eq!(db.count("books").await, 0);
	}

	#[tokio::test]
	async fn no_duplicate_detection() {
		let db = memory_db().await;
		import_books(&db, BOOKS_CSV.as_bytes()).await.unwrap();
		import_books(&db, BOOKS_CSV.as_bytes()).await.unwrap();
		assert_eq!(db.count("books").await, 6);
	}

	#[tokio::test]
	async fn bad_year_rolls_back() {
		let db = memory_db().await;
		let csv = "isbn,title,author,year\n1,A,B,2000\n2,C,D,someday\n";
		let err = import_books(&db, csv.as_bytes()).await.unwrap_err();
		assert!(matches!(err, ImportError::Year { line: 3, ref value } if value == "someday"));
		assert_eq!(db.count("books").await, 0);
	}

	#[tokio::test]
	async fn short_row_is_rejected() {
		let db = memory_db().await;
		let csv = "isbn,title,author,year\n1,A,B\n";
		let err = import_books(&db, csv.as_bytes()).await.unwrap_err();
		assert!(matches!(err, ImportError::Columns { line: 2, found: 3 }));
	}
}
