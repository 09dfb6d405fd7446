use axum::{
	extract::{Path, Query, State},
	response::{IntoResponse, Redirect, Response},
	Form, Json,
};
use maud::Markup;
use tracing::info;

use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::error::{AppError, Rejection};
use crate::pages;
use crate::session::Session;
use crate::sql::{is_unique_violation, SEARCH_LIMIT};
use crate::types::{BookDetails, FormComment, FormLogin, FormRegister, NewComment, SearchHit, SearchParams};
use crate::SharedState;

pub async fn display_index(_user: CurrentUser) -> Markup {
	pages::index()
}

pub async fn display_register() -> Markup {
	pages::register()
}

pub async fn perform_register(
	State(stt): State<SharedState>,
	Form(register): Form<FormRegister>,
) -> Result<Response, AppError> {
	if stt.db.user_by_name(&register.reg_username).await?.is_some() {
		return Ok(Rejection::UsernameTaken.into_response());
	}

	let hashed = hash_password(&register.reg_password)?;
	match stt.db.insert_user(&register.reg_username, &hashed).await {
		Ok(uid) => info!("Registered {} as user {uid}", register.reg_username),
		// lost a race with an identical registration
		Err(e) if is_unique_violation(&e) => return Ok(Rejection::UsernameTaken.into_response()),
		Err(e) => return Err(e.into()),
	}

	Ok(Redirect::to("/login").into_response())
}

pub async fn display_login(mut session: Session) -> Result<Markup, AppError> {
	session.clear().await?;
	Ok(pages::login())
}

pub async fn perform_login(
	State(stt): State<SharedState>,
	mut session: Session,
	Form(login): Form<FormLogin>,
) -> Result<Response, AppError> {
	session.clear().await?;

	let Some(user) = stt.db.user_by_name(&login.login_user).await? else {
		return Ok(Rejection::UnknownUser.into_response());
	};
	if !verify_password(&login.login_pw, &user.hashed) {
		info!("Wrong password for {}", user.username);
		return Ok(Rejection::WrongPassword.into_response());
	}

	session.log_in(user.id).await?;
	info!("{} logged in", user.username);
	Ok(Redirect::to("/").into_response())
}

pub async fn perform_logout(mut session: Session) -> Result<Redirect, AppError> {
	session.clear().await?;
	Ok(Redirect::to("/"))
}

pub async fn perform_search(
	State(stt): State<SharedState>,
	Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
	let books = stt.db.search_books(&params.q, SEARCH_LIMIT).await?;
	Ok(Json(books.into_iter().map(SearchHit::from).collect()))
}

pub async fn display_book(
	State(stt): State<SharedState>,
	_user: CurrentUser,
	Path(isbn): Path<String>,
) -> Result<Markup, AppError> {
	let book = stt.db.book_by_isbn(&isbn).await?.ok_or(AppError::NotFound)?;
	let comments = stt.db.comments_for(&isbn).await?;
	let ratings = stt.ratings.fetch(&isbn).await?;

	Ok(pages::book(&book, &comments, &ratings))
}

pub async fn perform_comment(
	State(stt): State<SharedState>,
	CurrentUser { user_id, mut session }: CurrentUser,
	Path(isbn): Path<String>,
	Form(comment): Form<FormComment>,
) -> Result<Response, AppError> {
	let rating = comment.rating().ok_or(AppError::InvalidRating)?;

	let Some(user) = stt.db.user_by_id(user_id).await? else {
		session.clear().await?;
		return Ok(Redirect::to("/login").into_response());
	};
	if stt.db.book_by_isbn(&isbn).await?.is_none() {
		return Err(AppError::NotFound);
	}
	if stt.db.has_commented(&user.username, &isbn).await? {
		return Ok(Rejection::DuplicateComment.into_response());
	}

	let new_comment = NewComment {
		book_isbn: &isbn,
		username: &user.username,
		message: &comment.user_comment,
		rating,
	};
	match stt.db.insert_comment(&new_comment).await {
		Ok(_) => info!("{} reviewed {isbn}", user.username),
		Err(e) if is_unique_violation(&e) => return Ok(Rejection::DuplicateComment.into_response()),
		Err(e) => return Err(e.into()),
	}

	Ok(Redirect::to(&format!("/book/{isbn}")).into_response())
}

pub async fn book_api(
	State(stt): State<SharedState>,
	_user: CurrentUser,
	Path(isbn): Path<String>,
) -> Result<Json<BookDetails>, AppError> {
	let book = stt.db.book_by_isbn(&isbn).await?.ok_or(AppError::NotFound)?;
	let ratings = stt.ratings.fetch(&isbn).await?;

	Ok(Json(BookDetails {
		title: book.title,
		author: book.author,
		year: book.year,
		isbn: book.isbn,
		review_count: ratings.reviews_count,
		average_score: ratings.average_rating,
	}))
}
