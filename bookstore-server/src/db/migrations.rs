//! Schema for users, session tokens, and the book catalog.
//!
//! Every statement is idempotent so `run` is safe on each start-up.

use sqlx::PgPool;

const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            password TEXT NOT NULL,
            user_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "tokens",
        r#"
        CREATE TABLE IF NOT EXISTS tokens (
            id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            email TEXT NOT NULL,
            token_hash BYTEA NOT NULL UNIQUE,
            expiry TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "tokens_user_id_idx",
        "CREATE INDEX IF NOT EXISTS tokens_user_id_idx ON tokens (user_id)",
    ),
    (
        "authors",
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id SERIAL PRIMARY KEY,
            author_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "genres",
        r#"
        CREATE TABLE IF NOT EXISTS genres (
            id SERIAL PRIMARY KEY,
            genre_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "books",
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id SERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE RESTRICT,
            publication_year INTEGER NOT NULL,
            slug TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "books_slug_idx",
        "CREATE INDEX IF NOT EXISTS books_slug_idx ON books (slug)",
    ),
    (
        "books_genres",
        r#"
        CREATE TABLE IF NOT EXISTS books_genres (
            book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (book_id, genre_id)
        )
        "#,
    ),
];

/// Advisory lock key held while the schema is applied
const MIGRATION_LOCK_KEY: i64 = 0x626f_6f6b_7374_6f72;

/// Run all migrations in a single transaction
///
/// Concurrent runs serialize on a transaction-scoped advisory lock.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running bookstore migrations...");

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *tx)
        .await?;
    for (name, statement) in SCHEMA {
        tracing::debug!(object = name, "applying schema statement");
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(objects = SCHEMA.len(), "migrations complete");
    Ok(())
}
