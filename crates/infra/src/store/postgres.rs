//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict(Email \| Username)` by constraint name |
//! | Database (foreign key violation) | `23503` | `MissingReference("user")` |
//! | Database (other) / PoolTimedOut / PoolClosed / Io | any | `Backend` |
//!
//! ## Bounded waits
//!
//! The pool is built with `acquire_timeout`; a saturated or unreachable
//! database surfaces as `Backend` instead of hanging the request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{info, instrument};

use catalog_core::{ItemId, Page, UserId};
use catalog_items::{Item, ItemDraft};
use catalog_users::{User, UserDraft};

use super::{CatalogStore, ItemFilter, StoreError, StoreResult, UniqueField};
use crate::config::DatabaseConfig;

const USERS_EMAIL_KEY: &str = "users_email_key";
const USERS_USERNAME_KEY: &str = "users_username_key";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL,
        username TEXT NOT NULL,
        full_name TEXT,
        password_hash TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ,
        CONSTRAINT users_email_key UNIQUE (email),
        CONSTRAINT users_username_key UNIQUE (username)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        price DOUBLE PRECISION,
        is_available BOOLEAN NOT NULL DEFAULT TRUE,
        owner_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS items_owner_id_idx ON items (owner_id)",
];

const USER_COLUMNS: &str = "id, email, username, full_name, password_hash, is_active, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, title, description, price, is_available, owner_id, created_at, updated_at";

/// Catalog store over a SQLx Postgres pool (`Send + Sync`, cheap to share).
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        info!(max_connections = config.max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }

    /// Create tables and constraints if they do not exist yet.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip(self, draft), fields(username = %draft.username), err)]
    async fn insert_user(&self, draft: UserDraft) -> StoreResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (email, username, full_name, password_hash, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&draft.email)
        .bind(&draft.username)
        .bind(&draft.full_name)
        .bind(&draft.password_hash)
        .bind(draft.is_active)
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        let id: i64 = row.try_get("id").map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(draft.into_user(UserId::new(id)))
    }

    #[instrument(skip(self), err)]
    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_id", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, email), err)]
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_username", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(UserId::get).collect();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(raw)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("users_by_ids", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self, page: Page) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(to_i64(page.limit))
            .bind(to_i64(page.skip))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET email = $2, username = $3, full_name = $4, password_hash = $5, \
             is_active = $6, updated_at = $7 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id.get())
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.full_name)
            .bind(&user.password_hash)
            .bind(user.is_active)
            .bind(user.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<Option<User>> {
        // Items go with the owner via ON DELETE CASCADE.
        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, draft), fields(owner_id = %draft.owner_id), err)]
    async fn insert_item(&self, draft: ItemDraft) -> StoreResult<Item> {
        let row = sqlx::query(
            r#"
            INSERT INTO items (title, description, price, is_available, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.is_available)
        .bind(draft.owner_id.get())
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        let id: i64 = row.try_get("id").map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(draft.into_item(ItemId::new(id)))
    }

    #[instrument(skip(self), err)]
    async fn item_by_id(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("item_by_id", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_items(&self, filter: &ItemFilter, page: Page) -> StoreResult<Vec<Item>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items WHERE TRUE"));

        if let Some(owner) = filter.owner {
            qb.push(" AND owner_id = ").push_bind(owner.get());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", escape_like(search.needle()));
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY id ASC LIMIT ")
            .push_bind(to_i64(page.limit))
            .push(" OFFSET ")
            .push_bind(to_i64(page.skip));

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn update_item(&self, item: &Item) -> StoreResult<Item> {
        let sql = format!(
            "UPDATE items SET title = $2, description = $3, price = $4, is_available = $5, \
             updated_at = $6 WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(item.id.get())
            .bind(&item.title)
            .bind(&item.description)
            .bind(item.price)
            .bind(item.is_available)
            .bind(item.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?;

        match row {
            Some(row) => item_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self), err)]
    async fn delete_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let sql = format!("DELETE FROM items WHERE id = $1 RETURNING {ITEM_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        row.as_ref().map(item_from_row).transpose()
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let read = || -> Result<User, sqlx::Error> {
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            full_name: row.try_get("full_name")?,
            password_hash: row.try_get("password_hash")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
        })
    };
    read().map_err(|e| map_sqlx_error("decode user row", e))
}

fn item_from_row(row: &PgRow) -> StoreResult<Item> {
    let read = || -> Result<Item, sqlx::Error> {
        Ok(Item {
            id: ItemId::new(row.try_get("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            is_available: row.try_get("is_available")?,
            owner_id: UserId::new(row.try_get("owner_id")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
        })
    };
    read().map_err(|e| map_sqlx_error("decode item row", e))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Escape `LIKE` metacharacters so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            match db_err.code().as_deref() {
                Some("23505") => match db_err.constraint() {
                    Some(USERS_EMAIL_KEY) => StoreError::Conflict(UniqueField::Email),
                    Some(USERS_USERNAME_KEY) => StoreError::Conflict(UniqueField::Username),
                    _ => StoreError::Backend(format!(
                        "unexpected unique violation in {}: {}",
                        operation,
                        db_err.message()
                    )),
                },
                Some("23503") => StoreError::MissingReference("user"),
                _ => StoreError::Backend(format!("database error in {}: {}", operation, db_err.message())),
            }
        }
        sqlx::Error::PoolTimedOut => StoreError::Backend(format!("timed out acquiring connection in {}", operation)),
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn oversized_offsets_saturate() {
        assert_eq!(to_i64(u64::MAX), i64::MAX);
        assert_eq!(to_i64(10), 10);
    }

    #[test]
    fn pool_errors_are_backend_failures() {
        assert!(matches!(map_sqlx_error("op", sqlx::Error::PoolTimedOut), StoreError::Backend(_)));
        assert!(matches!(map_sqlx_error("op", sqlx::Error::RowNotFound), StoreError::Backend(_)));
    }

    // Behaviour against a live database. These run only when DATABASE_URL is set
    // and use per-test names, so they can share one database with other runs.
    mod live {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::Duration;

        use catalog_items::{ItemSearch, NewItem};
        use catalog_users::NewUser;
        use tokio::sync::OnceCell;

        use super::*;

        static SCHEMA_READY: OnceCell<()> = OnceCell::const_new();
        static NEXT: AtomicU64 = AtomicU64::new(0);

        async fn store() -> Option<PostgresStore> {
            let url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty())?;
            let config = DatabaseConfig {
                url,
                max_connections: 2,
                acquire_timeout: Duration::from_secs(5),
            };
            let store = PostgresStore::connect(&config).await.unwrap();
            SCHEMA_READY
                .get_or_try_init(|| store.ensure_schema())
                .await
                .unwrap();
            Some(store)
        }

        fn unique(prefix: &str) -> String {
            let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            format!(
                "{prefix}-{}-{nanos}-{}",
                std::process::id(),
                NEXT.fetch_add(1, Ordering::Relaxed)
            )
        }

        fn user_draft(name: &str) -> UserDraft {
            NewUser {
                email: format!("{name}@example.com"),
                username: name.to_string(),
                full_name: Some("Test".into()),
                password: "unused".into(),
            }
            .into_draft("hash".into(), Utc::now())
        }

        fn item_draft(title: &str, owner: UserId) -> ItemDraft {
            NewItem {
                title: title.to_string(),
                description: None,
                price: Some(1.5),
            }
            .into_draft(owner, Utc::now())
        }

        #[tokio::test]
        async fn unique_violations_name_the_clashing_field() {
            let Some(store) = store().await else { return };
            let name = unique("dup");
            let user = store.insert_user(user_draft(&name)).await.unwrap();
            assert_eq!(store.user_by_username(&name).await.unwrap().map(|u| u.id), Some(user.id));

            let mut same_email = user_draft(&unique("other"));
            same_email.email = user.email.clone();
            assert_eq!(
                store.insert_user(same_email).await,
                Err(StoreError::Conflict(UniqueField::Email))
            );

            let mut same_name = user_draft(&name);
            same_name.email = format!("{}@example.com", unique("fresh"));
            assert_eq!(
                store.insert_user(same_name).await,
                Err(StoreError::Conflict(UniqueField::Username))
            );

            let other = store.insert_user(user_draft(&unique("other"))).await.unwrap();
            let mut stolen = other.clone();
            stolen.username = user.username.clone();
            assert_eq!(
                store.update_user(&stolen).await,
                Err(StoreError::Conflict(UniqueField::Username))
            );
        }

        #[tokio::test]
        async fn item_with_unknown_owner_is_a_missing_reference() {
            let Some(store) = store().await else { return };
            let err = store.insert_item(item_draft("orphan", UserId::new(i64::MAX))).await;
            assert_eq!(err, Err(StoreError::MissingReference("user")));
        }

        #[tokio::test]
        async fn deleting_a_user_cascades_to_their_items() {
            let Some(store) = store().await else { return };
            let owner = store.insert_user(user_draft(&unique("owner"))).await.unwrap();
            let keeper = store.insert_user(user_draft(&unique("keeper"))).await.unwrap();
            let doomed = store.insert_item(item_draft("doomed", owner.id)).await.unwrap();
            let kept = store.insert_item(item_draft("kept", keeper.id)).await.unwrap();

            let removed = store.delete_user(owner.id).await.unwrap();
            assert_eq!(removed.map(|u| u.id), Some(owner.id));
            assert_eq!(store.user_by_id(owner.id).await.unwrap(), None);
            assert_eq!(store.item_by_id(doomed.id).await.unwrap(), None);
            assert!(store.item_by_id(kept.id).await.unwrap().is_some());

            assert_eq!(store.delete_user(owner.id).await.unwrap(), None);
        }

        #[tokio::test]
        async fn search_treats_like_metacharacters_literally() {
            let Some(store) = store().await else { return };
            let owner = store.insert_user(user_draft(&unique("search"))).await.unwrap();
            let literal = store.insert_item(item_draft("50%_off lamp", owner.id)).await.unwrap();
            store.insert_item(item_draft("500 off lamp", owner.id)).await.unwrap();

            let filter = ItemFilter {
                owner: Some(owner.id),
                search: ItemSearch::new(Some("50%_")),
            };
            let found = store.list_items(&filter, Page::default()).await.unwrap();
            assert_eq!(found.iter().map(|i| i.id).collect::<Vec<_>>(), vec![literal.id]);

            let filter = ItemFilter {
                owner: Some(owner.id),
                search: ItemSearch::new(Some("LAMP")),
            };
            assert_eq!(store.list_items(&filter, Page::default()).await.unwrap().len(), 2);
        }

        #[tokio::test]
        async fn listings_are_id_ordered_and_windowed() {
            let Some(store) = store().await else { return };
            let owner = store.insert_user(user_draft(&unique("pager"))).await.unwrap();
            let mut ids = Vec::new();
            for n in 0..5 {
                ids.push(store.insert_item(item_draft(&format!("item {n}"), owner.id)).await.unwrap().id);
            }

            let page = store
                .list_items(&ItemFilter::owned_by(owner.id), Page::new(2, 2))
                .await
                .unwrap();
            assert_eq!(page.iter().map(|i| i.id).collect::<Vec<_>>(), ids[2..4].to_vec());

            let past_end = store
                .list_items(&ItemFilter::owned_by(owner.id), Page::new(u64::MAX, 10))
                .await
                .unwrap();
            assert!(past_end.is_empty());
        }

        #[tokio::test]
        async fn item_updates_keep_the_owner_and_can_clear_fields() {
            let Some(store) = store().await else { return };
            let owner = store.insert_user(user_draft(&unique("keep"))).await.unwrap();
            let other = store.insert_user(user_draft(&unique("thief"))).await.unwrap();
            let mut item = store.insert_item(item_draft("x", owner.id)).await.unwrap();

            item.owner_id = other.id;
            item.title = "y".into();
            item.price = None;
            item.updated_at = Some(Utc::now());
            let stored = store.update_item(&item).await.unwrap();
            assert_eq!(stored.owner_id, owner.id);
            assert_eq!(stored.title, "y");
            assert_eq!(stored.price, None);
            assert!(stored.updated_at.is_some());

            store.delete_item(item.id).await.unwrap();
            assert_eq!(store.update_item(&item).await, Err(StoreError::NotFound));
        }

        #[tokio::test]
        async fn users_by_ids_returns_known_users_in_id_order() {
            let Some(store) = store().await else { return };
            let a = store.insert_user(user_draft(&unique("a"))).await.unwrap();
            let b = store.insert_user(user_draft(&unique("b"))).await.unwrap();

            let found = store
                .users_by_ids(&[b.id, UserId::new(i64::MAX), a.id])
                .await
                .unwrap();
            assert_eq!(found.iter().map(|u| u.id).collect::<Vec<_>>(), vec![a.id, b.id]);
            assert!(store.users_by_ids(&[]).await.unwrap().is_empty());
        }
    }
}
