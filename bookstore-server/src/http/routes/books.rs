//! Book endpoints
//!
//! Public: listing and lookup by slug. Admin (bearer token): lookup by id,
//! upsert, delete.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Book, BookInput, BookRepo};
use crate::http::envelope::Envelope;
use crate::http::error::ApiError;
use crate::http::extractors::{AppJson, AuthUser, ValidId};
use crate::http::server::AppState;

/// `?ids=1,2` filters by book id, `?genres=3,4` by genre id
#[derive(Debug, Default, Deserialize)]
pub struct BooksQuery {
    pub ids: Option<String>,
    pub genres: Option<String>,
}

/// Upsert body; `id = 0` creates
#[derive(Deserialize)]
pub struct BookPayload {
    #[serde(default)]
    pub id: i32,
    #[serde(flatten)]
    pub book: BookInput,
}

#[derive(Deserialize)]
pub struct IdRequest {
    pub id: i32,
}

#[derive(Serialize)]
pub struct BookList {
    pub books: Vec<Book>,
}

#[derive(Serialize)]
pub struct Saved {
    pub id: i32,
}

/// Parse a comma separated id list; blank means no filter.
fn parse_ids(field: &str, raw: Option<&str>) -> Result<Vec<i32>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| ApiError::invalid_input(format!("{}: '{}' is not an id", field, s)))
        })
        .collect()
}

fn validate_input(book: &BookInput) -> Result<(), ApiError> {
    if book.title.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "title",
            reason: "cannot be empty".to_string(),
        });
    }
    if bookstore_core::slugify(&book.title).is_empty() {
        return Err(ApiError::Validation {
            field: "title",
            reason: "must contain at least one letter or digit".to_string(),
        });
    }
    Ok(())
}

/// GET /books
async fn list_books(
    State(state): State<Arc<AppState>>,
    query: Result<Query<BooksQuery>, QueryRejection>,
) -> Result<Envelope<BookList>, ApiError> {
    let Query(query) = query?;
    let ids = parse_ids("ids", query.ids.as_deref())?;
    let genres = parse_ids("genres", query.genres.as_deref())?;

    let repo = BookRepo::new(&state.store);
    let books = match (ids.is_empty(), genres.is_empty()) {
        (false, false) => {
            return Err(ApiError::invalid_input(
                "filter by either ids or genres, not both",
            ))
        }
        (true, false) => repo.get_all_in_genres(&genres).await?,
        _ => repo.get_all(&ids).await?,
    };

    Ok(Envelope::data("success", BookList { books }))
}

/// GET /books/{slug}
async fn get_book_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Envelope<Book>, ApiError> {
    let book = BookRepo::new(&state.store).get_one_by_slug(&slug).await?;
    Ok(Envelope::data("success", book))
}

/// GET /admin/books/{id}
async fn get_book_by_id(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ValidId(id): ValidId,
) -> Result<Envelope<Book>, ApiError> {
    let book = BookRepo::new(&state.store).get_one_by_id(id).await?;
    Ok(Envelope::data("success", book))
}

/// POST /admin/books - create or update, genres included
async fn save_book(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    AppJson(req): AppJson<BookPayload>,
) -> Result<(StatusCode, Envelope<Saved>), ApiError> {
    validate_input(&req.book)?;

    let repo = BookRepo::new(&state.store);
    let id = if req.id == 0 {
        repo.insert(&req.book).await?
    } else {
        repo.update(req.id, &req.book).await?;
        req.id
    };

    tracing::info!(actor = actor.id, book_id = id, "book saved");
    Ok((StatusCode::ACCEPTED, Envelope::data("Changes saved", Saved { id })))
}

/// DELETE /admin/books
async fn delete_book(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    AppJson(req): AppJson<IdRequest>,
) -> Result<Envelope<()>, ApiError> {
    BookRepo::new(&state.store).delete_by_id(req.id).await?;
    tracing::info!(actor = actor.id, book_id = req.id, "book deleted");
    Ok(Envelope::message("Book deleted"))
}

/// Book routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/books", get(list_books))
        .route("/books/{slug}", get(get_book_by_slug))
        .route("/admin/books", post(save_book).delete(delete_book))
        .route("/admin/books/{id}", get(get_book_by_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists() {
        assert_eq!(parse_ids("ids", None).unwrap(), Vec::<i32>::new());
        assert_eq!(parse_ids("ids", Some("")).unwrap(), Vec::<i32>::new());
        assert_eq!(parse_ids("ids", Some("1, 2,3,")).unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            parse_ids("genres", Some("1,x")),
            Err(ApiError::InvalidInput { .. })
        ));
    }

    #[test]
    fn title_must_produce_a_slug() {
        let mut book = BookInput {
            title: "   ".into(),
            ..Default::default()
        };
        assert!(validate_input(&book).is_err());

        book.title = "!!!".into();
        assert!(validate_input(&book).is_err());

        book.title = "Dune".into();
        assert!(validate_input(&book).is_ok());

        book.title = "Война и мир".into();
        assert!(validate_input(&book).is_ok());

        book.title = "Les Misérables".into();
        assert!(validate_input(&book).is_ok());
    }

    #[test]
    fn payload_flattens_input() {
        let payload: BookPayload = serde_json::from_str(
            r#"{"id": 4, "title": "Emma", "author_id": 2, "publication_year": 1815, "genre_ids": [1]}"#,
        )
        .unwrap();
        assert_eq!(payload.id, 4);
        assert_eq!(payload.book.title, "Emma");
        assert_eq!(payload.book.genre_ids, vec![1]);
    }
}
