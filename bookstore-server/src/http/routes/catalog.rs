//! Author and genre listings for the book edit form

use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use serde::Serialize;

use crate::db::{Author, AuthorRepo, Genre, GenreRepo};
use crate::http::envelope::Envelope;
use crate::http::error::ApiError;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct AuthorList {
    pub authors: Vec<Author>,
}

#[derive(Serialize)]
pub struct GenreList {
    pub genres: Vec<Genre>,
}

/// GET /authors
async fn list_authors(
    State(state): State<Arc<AppState>>,
) -> Result<Envelope<AuthorList>, ApiError> {
    let authors = AuthorRepo::new(&state.store).get_all().await?;
    Ok(Envelope::data("success", AuthorList { authors }))
}

/// GET /genres
async fn list_genres(State(state): State<Arc<AppState>>) -> Result<Envelope<GenreList>, ApiError> {
    let genres = GenreRepo::new(&state.store).get_all().await?;
    Ok(Envelope::data("success", GenreList { genres }))
}

/// Catalog routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/authors", get(list_authors))
        .route("/genres", get(list_genres))
}
