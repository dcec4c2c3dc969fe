//! Book repository
//!
//! Books are returned enriched with their author (LEFT JOIN; zero-valued
//! when missing) and their genres ordered by name. Patterns:
//! - list: one query for books + one batched query for all their genres
//! - insert/update: book row and genre set written in one transaction
//! - slug: recomputed from the title on every write, never set directly

use std::collections::HashMap;

use bookstore_core::slugify;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgExecutor};

use super::authors::Author;
use super::genres::Genre;
use crate::db::{DbError, Store};

/// Book with author and genres attached
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub publication_year: i32,
    pub slug: String,
    pub author: Author,
    pub description: String,
    pub genres: Vec<Genre>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn genre_ids(&self) -> Vec<i32> {
        self.genres.iter().map(|g| g.id).collect()
    }
}

/// Writable book fields.
///
/// An empty `genre_ids` leaves existing associations alone on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author_id: i32,
    pub publication_year: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

/// Flat row from the books/authors join
#[derive(Debug, FromRow)]
struct BookRow {
    id: i32,
    title: String,
    author_id: i32,
    publication_year: i32,
    slug: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    a_id: Option<i32>,
    a_author_name: Option<String>,
    a_created_at: Option<DateTime<Utc>>,
    a_updated_at: Option<DateTime<Utc>>,
}

impl BookRow {
    fn into_book(self, genres: Vec<Genre>) -> Book {
        let author = Author {
            id: self.a_id.unwrap_or_default(),
            author_name: self.a_author_name.unwrap_or_default(),
            created_at: self.a_created_at.unwrap_or_default(),
            updated_at: self.a_updated_at.unwrap_or_default(),
        };

        Book {
            id: self.id,
            title: self.title,
            author_id: self.author_id,
            publication_year: self.publication_year,
            slug: self.slug,
            author,
            description: self.description,
            genres,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Genre tagged with the book it belongs to
#[derive(Debug, FromRow)]
struct BookGenreRow {
    book_id: i32,
    #[sqlx(flatten)]
    genre: Genre,
}

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id, b.publication_year, b.slug, b.description,
           b.created_at, b.updated_at,
           a.id AS a_id, a.author_name AS a_author_name,
           a.created_at AS a_created_at, a.updated_at AS a_updated_at
    FROM books b
    LEFT JOIN authors a ON (b.author_id = a.id)
"#;

/// Book repository
pub struct BookRepo<'a> {
    store: &'a Store,
}

impl<'a> BookRepo<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All books ordered by title, optionally restricted to the given
    /// **book** ids. An empty slice means no restriction.
    ///
    /// Use [`BookRepo::get_all_in_genres`] to filter by genre.
    pub async fn get_all(&self, book_ids: &[i32]) -> Result<Vec<Book>, DbError> {
        self.store
            .run(async {
                let rows = if book_ids.is_empty() {
                    sqlx::query_as::<_, BookRow>(&format!("{BOOK_SELECT} ORDER BY b.title, b.id"))
                        .fetch_all(self.store.pool())
                        .await?
                } else {
                    sqlx::query_as::<_, BookRow>(&format!(
                        "{BOOK_SELECT} WHERE b.id = ANY($1) ORDER BY b.title, b.id"
                    ))
                    .bind(book_ids)
                    .fetch_all(self.store.pool())
                    .await?
                };
                self.attach_genres(rows).await
            })
            .await
    }

    /// Books carrying at least one of `genre_ids`, ordered by title.
    /// An empty slice returns every book.
    pub async fn get_all_in_genres(&self, genre_ids: &[i32]) -> Result<Vec<Book>, DbError> {
        if genre_ids.is_empty() {
            return self.get_all(&[]).await;
        }

        self.store
            .run(async {
                let rows = sqlx::query_as::<_, BookRow>(&format!(
                    r#"{BOOK_SELECT}
                    WHERE b.id IN (SELECT book_id FROM books_genres WHERE genre_id = ANY($1))
                    ORDER BY b.title, b.id"#
                ))
                .bind(genre_ids)
                .fetch_all(self.store.pool())
                .await?;
                self.attach_genres(rows).await
            })
            .await
    }

    /// Get one book by id.
    pub async fn get_one_by_id(&self, id: i32) -> Result<Book, DbError> {
        self.store
            .run(async {
                let row = sqlx::query_as::<_, BookRow>(&format!("{BOOK_SELECT} WHERE b.id = $1"))
                    .bind(id)
                    .fetch_optional(self.store.pool())
                    .await?
                    .ok_or_else(|| DbError::not_found("book", id))?;

                let genres = fetch_genres(self.store.pool(), row.id).await?;
                Ok(row.into_book(genres))
            })
            .await
    }

    /// Get one book by slug.
    ///
    /// Slugs are not unique; when several books share one, the lowest id wins.
    pub async fn get_one_by_slug(&self, slug: &str) -> Result<Book, DbError> {
        self.store
            .run(async {
                let row = sqlx::query_as::<_, BookRow>(&format!(
                    "{BOOK_SELECT} WHERE b.slug = $1 ORDER BY b.id LIMIT 1"
                ))
                .bind(slug)
                .fetch_optional(self.store.pool())
                .await?
                .ok_or_else(|| DbError::not_found("book", slug))?;

                let genres = fetch_genres(self.store.pool(), row.id).await?;
                Ok(row.into_book(genres))
            })
            .await
    }

    /// Genres for one book, ordered by name.
    pub async fn genres_for_book(&self, id: i32) -> Result<Vec<Genre>, DbError> {
        self.store.run(fetch_genres(self.store.pool(), id)).await
    }

    /// Insert a book and its genre set atomically, returning the new id.
    pub async fn insert(&self, book: &BookInput) -> Result<i32, DbError> {
        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                let (id,): (i32,) = sqlx::query_as(
                    r#"
                    INSERT INTO books (title, author_id, publication_year, slug, description, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
                    RETURNING id
                    "#,
                )
                .bind(&book.title)
                .bind(book.author_id)
                .bind(book.publication_year)
                .bind(slugify(&book.title))
                .bind(&book.description)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| DbError::foreign_key_violation(e, "author"))?;

                if !book.genre_ids.is_empty() {
                    replace_genres(&mut tx, id, &book.genre_ids).await?;
                }

                tx.commit().await?;
                tracing::debug!(book_id = id, genres = book.genre_ids.len(), "book inserted");
                Ok(id)
            })
            .await
    }

    /// Overwrite a book's scalar fields and recompute its slug.
    ///
    /// A non-empty `genre_ids` replaces the genre set in the same
    /// transaction; either everything is written or nothing is.
    pub async fn update(&self, id: i32, book: &BookInput) -> Result<(), DbError> {
        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                let result = sqlx::query(
                    r#"
                    UPDATE books SET
                        title = $1,
                        author_id = $2,
                        publication_year = $3,
                        slug = $4,
                        description = $5,
                        updated_at = NOW()
                    WHERE id = $6
                    "#,
                )
                .bind(&book.title)
                .bind(book.author_id)
                .bind(book.publication_year)
                .bind(slugify(&book.title))
                .bind(&book.description)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DbError::foreign_key_violation(e, "author"))?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("book", id));
                }

                if !book.genre_ids.is_empty() {
                    replace_genres(&mut tx, id, &book.genre_ids).await?;
                }

                tx.commit().await?;
                Ok(())
            })
            .await
    }

    /// Replace a book's genre set exactly. An empty slice clears it.
    pub async fn set_genres(&self, book_id: i32, genre_ids: &[i32]) -> Result<(), DbError> {
        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                let (exists,): (bool,) =
                    sqlx::query_as("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                        .bind(book_id)
                        .fetch_one(&mut *tx)
                        .await?;
                if !exists {
                    return Err(DbError::not_found("book", book_id));
                }

                replace_genres(&mut tx, book_id, genre_ids).await?;
                tx.commit().await?;
                Ok(())
            })
            .await
    }

    /// Hard delete. Association rows go with it via ON DELETE CASCADE.
    pub async fn delete_by_id(&self, id: i32) -> Result<(), DbError> {
        self.store
            .run(async {
                let result = sqlx::query("DELETE FROM books WHERE id = $1")
                    .bind(id)
                    .execute(self.store.pool())
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("book", id));
                }
                Ok(())
            })
            .await
    }

    /// Fetch genres for every row in one query and build the books.
    async fn attach_genres(&self, rows: Vec<BookRow>) -> Result<Vec<Book>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let tagged = sqlx::query_as::<_, BookGenreRow>(
            r#"
            SELECT bg.book_id, g.id, g.genre_name, g.created_at, g.updated_at
            FROM books_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE bg.book_id = ANY($1)
            ORDER BY g.genre_name, g.id
            "#,
        )
        .bind(&ids)
        .fetch_all(self.store.pool())
        .await?;

        let mut by_book = group_by_book(tagged);
        Ok(rows
            .into_iter()
            .map(|row| {
                let genres = by_book.remove(&row.id).unwrap_or_default();
                row.into_book(genres)
            })
            .collect())
    }
}

/// Group genre rows per book, keeping their query order.
fn group_by_book(rows: Vec<BookGenreRow>) -> HashMap<i32, Vec<Genre>> {
    let mut by_book: HashMap<i32, Vec<Genre>> = HashMap::new();
    for row in rows {
        by_book.entry(row.book_id).or_default().push(row.genre);
    }
    by_book
}

async fn fetch_genres<'e, E>(executor: E, book_id: i32) -> Result<Vec<Genre>, DbError>
where
    E: PgExecutor<'e>,
{
    let genres = sqlx::query_as::<_, Genre>(
        r#"
        SELECT id, genre_name, created_at, updated_at
        FROM genres
        WHERE id IN (SELECT genre_id FROM books_genres WHERE book_id = $1)
        ORDER BY genre_name, id
        "#,
    )
    .bind(book_id)
    .fetch_all(executor)
    .await?;
    Ok(genres)
}

/// Delete all associations for `book_id`, then insert one per genre id.
/// Runs on the caller's transaction.
async fn replace_genres(
    conn: &mut PgConnection,
    book_id: i32,
    genre_ids: &[i32],
) -> Result<(), DbError> {
    let genre_ids = dedup_ids(genre_ids);

    sqlx::query("DELETE FROM books_genres WHERE book_id = $1")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    if genre_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO books_genres (book_id, genre_id, created_at, updated_at)
        SELECT $1, g, NOW(), NOW() FROM UNNEST($2::int4[]) AS g
        "#,
    )
    .bind(book_id)
    .bind(&genre_ids)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::foreign_key_violation(e, "genre"))?;

    Ok(())
}

fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::authors::AuthorRepo;
    use crate::db::repos::genres::GenreRepo;
    use crate::db::repos::test_support::{test_store, unique_suffix};

    fn genre(id: i32, name: &str) -> Genre {
        Genre {
            id,
            genre_name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn dedup_sorts_and_removes_repeats() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(dedup_ids(&[]).is_empty());
    }

    #[test]
    fn grouping_keeps_order_per_book() {
        let rows = vec![
            BookGenreRow { book_id: 1, genre: genre(5, "Classic") },
            BookGenreRow { book_id: 2, genre: genre(6, "Fantasy") },
            BookGenreRow { book_id: 1, genre: genre(7, "Science Fiction") },
        ];
        let grouped = group_by_book(rows);

        let names: Vec<_> = grouped[&1].iter().map(|g| g.genre_name.as_str()).collect();
        assert_eq!(names, vec!["Classic", "Science Fiction"]);
        assert_eq!(grouped[&2].len(), 1);
    }

    #[test]
    fn missing_author_is_zero_valued() {
        let row = BookRow {
            id: 1,
            title: "Orphan".into(),
            author_id: 99,
            publication_year: 2001,
            slug: "orphan".into(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            a_id: None,
            a_author_name: None,
            a_created_at: None,
            a_updated_at: None,
        };
        let book = row.into_book(Vec::new());
        assert_eq!(book.author, Author::default());
        assert_eq!(book.author_id, 99);
    }

    #[test]
    fn input_defaults_optional_fields() {
        let input: BookInput = serde_json::from_str(
            r#"{"title": "Dune", "author_id": 1, "publication_year": 1965}"#,
        )
        .unwrap();
        assert!(input.description.is_empty());
        assert!(input.genre_ids.is_empty());
    }

    async fn seed_author(store: &Store) -> i32 {
        AuthorRepo::new(store)
            .insert(&format!("Author {}", unique_suffix()))
            .await
            .unwrap()
    }

    async fn seed_genres(store: &Store, n: usize) -> Vec<i32> {
        let repo = GenreRepo::new(store);
        let mut ids = Vec::new();
        for i in 0..n {
            ids.push(repo.insert(&format!("Genre {} {}", i, unique_suffix())).await.unwrap());
        }
        ids
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn insert_computes_slug() {
        let store = test_store().await;
        let repo = BookRepo::new(&store);
        let author_id = seed_author(&store).await;

        let id = repo
            .insert(&BookInput {
                title: "My Title".into(),
                author_id,
                publication_year: 2020,
                ..Default::default()
            })
            .await
            .unwrap();

        let book = repo.get_one_by_id(id).await.unwrap();
        assert_eq!(book.slug, "my-title");
        assert_eq!(book.author.id, author_id);
        assert!(book.genres.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn insert_with_genres_is_atomic() {
        let store = test_store().await;
        let repo = BookRepo::new(&store);
        let author_id = seed_author(&store).await;
        let genre_ids = seed_genres(&store, 2).await;

        let id = repo
            .insert(&BookInput {
                title: "Tagged".into(),
                author_id,
                publication_year: 1999,
                genre_ids: genre_ids.clone(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut got = repo.get_one_by_id(id).await.unwrap().genre_ids();
        got.sort_unstable();
        assert_eq!(got, genre_ids);

        // Unknown genre rolls the whole insert back
        let before = repo.get_all(&[]).await.unwrap().len();
        let err = repo
            .insert(&BookInput {
                title: "Never Stored".into(),
                author_id,
                publication_year: 1999,
                genre_ids: vec![i32::MAX],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::MissingReference { resource: "genre" }));
        assert_eq!(repo.get_all(&[]).await.unwrap().len(), before);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn update_replaces_genre_set_exactly() {
        let store = test_store().await;
        let repo = BookRepo::new(&store);
        let author_id = seed_author(&store).await;
        let genre_ids = seed_genres(&store, 3).await;

        let id = repo
            .insert(&BookInput {
                title: "Before".into(),
                author_id,
                publication_year: 2000,
                genre_ids: vec![genre_ids[0], genre_ids[1]],
                ..Default::default()
            })
            .await
            .unwrap();

        repo.update(
            id,
            &BookInput {
                title: "After: The Sequel".into(),
                author_id,
                publication_year: 2001,
                genre_ids: vec![genre_ids[2]],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let book = repo.get_one_by_id(id).await.unwrap();
        assert_eq!(book.slug, "after-the-sequel");
        assert_eq!(book.genre_ids(), vec![genre_ids[2]]);

        // Empty list leaves the set untouched
        repo.update(
            id,
            &BookInput {
                title: "After: The Sequel".into(),
                author_id,
                publication_year: 2001,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(repo.genres_for_book(id).await.unwrap().len(), 1);

        // set_genres with an empty slice clears it
        repo.set_genres(id, &[]).await.unwrap();
        assert!(repo.genres_for_book(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn get_all_filters_by_book_id_and_orders_by_title() {
        let store = test_store().await;
        let repo = BookRepo::new(&store);
        let author_id = seed_author(&store).await;
        let suffix = unique_suffix();

        let mut ids = Vec::new();
        for title in ["Zebra", "Apple", "Mango"] {
            ids.push(
                repo.insert(&BookInput {
                    title: format!("{title} {suffix}"),
                    author_id,
                    publication_year: 2010,
                    ..Default::default()
                })
                .await
                .unwrap(),
            );
        }

        let books = repo.get_all(&[ids[0], ids[1]]).await.unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.clone()).collect();
        assert_eq!(titles, vec![format!("Apple {suffix}"), format!("Zebra {suffix}")]);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn get_all_in_genres_joins_through_association() {
        let store = test_store().await;
        let repo = BookRepo::new(&store);
        let author_id = seed_author(&store).await;
        let genre_ids = seed_genres(&store, 2).await;

        let tagged = repo
            .insert(&BookInput {
                title: "In Genre".into(),
                author_id,
                publication_year: 2015,
                genre_ids: vec![genre_ids[0]],
                ..Default::default()
            })
            .await
            .unwrap();

        let books = repo.get_all_in_genres(&[genre_ids[0]]).await.unwrap();
        assert_eq!(books.iter().map(|b| b.id).collect::<Vec<_>>(), vec![tagged]);
        assert!(repo.get_all_in_genres(&[genre_ids[1]]).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn delete_removes_book_and_associations() {
        let store = test_store().await;
        let repo = BookRepo::new(&store);
        let author_id = seed_author(&store).await;
        let genre_ids = seed_genres(&store, 1).await;

        let id = repo
            .insert(&BookInput {
                title: format!("Doomed {}", unique_suffix()),
                author_id,
                publication_year: 1990,
                genre_ids,
                ..Default::default()
            })
            .await
            .unwrap();
        let slug = repo.get_one_by_id(id).await.unwrap().slug;

        repo.delete_by_id(id).await.unwrap();
        assert!(matches!(repo.get_one_by_id(id).await, Err(DbError::NotFound { .. })));
        assert!(matches!(repo.get_one_by_slug(&slug).await, Err(DbError::NotFound { .. })));
        assert!(repo.genres_for_book(id).await.unwrap().is_empty());
    }
}
