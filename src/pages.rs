use maud::{html, Markup, DOCTYPE};

use crate::ratings::Ratings;
use crate::types::{Book, Comment, MAX_RATING, MIN_RATING};

fn layout(title: &str, logged_in: bool, content: Markup) -> Markup {
	html! {
		(DOCTYPE)
		html lang="en" {
			head {
				meta charset="utf-8";
				title { (title) }
				script src="/static/scripts.js" defer {}
			}
			body {
				nav {
					a href="/" { "Books" }
					@if logged_in {
						" " a href="/logout" { "Log out" }
					} @else {
						" " a href="/login" { "Log in" }
						" " a href="/register" { "Register" }
					}
				}
				main { (content) }
			}
		}
	}
}

pub fn index() -> Markup {
	layout("Books", true, html! {
		form id="search" action="/search" method="GET" {
			input id="q" name="q" type="search" placeholder="ISBN, title or author" autofocus;
			button { "Search" }
		}
		table {
			thead { tr {
				th { "ISBN" }
				th { "Title" }
				th { "Author" }
			} }
			tbody id="results" {}
		}
	})
}

pub fn register() -> Markup {
	layout("Register", false, html! {
		form id="register" method="POST" action="/register" {
			div class="alert-danger" id="regusername" hidden {}
			input id="reg_username" name="reg_username" placeholder="username" required;
			div class="alert-danger" id="regpassword" hidden {}
			input id="reg_password" name="reg_password" type="password" placeholder="password" required;
			input id="reg_conf" name="reg_conf" type="password" placeholder="confirm password" required;
			button { "Register" }
		}
	})
}

pub fn login() -> Markup {
	layout("Log in", false, html! {
		form id="login" method="POST" action="/login" {
			div class="alert-danger" id="loginuser" hidden {}
			input id="login_user" name="login_user" placeholder="username" required;
			div class="alert-danger" id="loginpw" hidden {}
			input id="login_pw" name="login_pw" type="password" placeholder="password" required;
			button { "Log in" }
		}
	})
}

pub fn book(book: &Book, comments: &[Comment], ratings: &Ratings) -> Markup {
	layout(&book.title, true, html! {
		h1 { (book.title) }
		dl {
			dt { "Author" } dd { (book.author) }
			dt { "Published" } dd { (book.year) }
			dt { "ISBN" } dd { (book.isbn) }
			dt { "Ratings" } dd { (ratings.ratings_count) }
			dt { "Average rating" } dd { (format!("{:.2}", ratings.average_rating)) }
		}

		h2 { "Reviews (" (comments.len()) ")" }
		@if comments.is_empty() {
			p { "No reviews yet." }
		}
		@for comment in comments {
			article {
				header { strong { (comment.username) } " rated it " (comment.rating) "/" (MAX_RATING) }
				p { (comment.message) }
			}
		}

		form id="comment" method="POST" action={ "/book/" (book.isbn) } {
			div class="alert-danger" id="commenterror" hidden {}
			textarea id="user_comment" name="user_comment" placeholder="Your review" required {}
			select id="rating" name="rating" {
				@for r in MIN_RATING..=MAX_RATING {
					option value=(r) { (r) }
				}
			}
			button { "Post review" }
		}
	})
}

pub fn not_found() -> Markup {
	layout("Not found", false, html! {
		h1 { "Not found" }
		p { a href="/" { "Back to the catalog" } }
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn book_page_escapes_user_text() {
		let book = Book {
			id: 1,
			isbn: "123".into(),
			title: "Title".into(),
			author: "Author".into(),
			year: 2001,
		};
		let comments = vec![Comment {
			id: 1,
			book_isbn: "123".into(),
			username: "mallory".into(),
			message: "<script>alert(1)</script>".into(),
			rating: 2,
		}];
		let ratings = Ratings { ratings_count: 10, reviews_count: 3, average_rating: 4.0 };

		let page = super::book(&book, &comments, &ratings).into_string();
		assert!(page.contains("&lt;script&gt;"));
		assert!(!page.contains("<script>alert"));
		assert!(page.contains("Reviews (1)"));
		assert!(page.contains("4.00"));
		assert!(page.contains(r#"action="/book/123""#));
	}
}
