use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, Transaction,
};
use std::{fs, path::PathBuf, str::FromStr};
use tracing::debug;
use uuid::Uuid;

use shared::{
    domain::{Item, ItemDocument, ItemId, PrincipalId},
    protocol::ItemSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    Anonymous,
    Token,
}

impl PrincipalKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Token => "token",
        }
    }
}

/// Outcome of a write that targets an existing document.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetedWrite {
    Applied { revision: u64 },
    Missing,
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        create_database_dir(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every in-memory connection is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn register_principal(&self, principal: &PrincipalId, kind: PrincipalKind) -> Result<()> {
        sqlx::query(
            "INSERT INTO principals (id, kind) VALUES (?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(principal.as_str())
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to register principal {principal}"))?;
        Ok(())
    }

    pub async fn principal_exists(&self, principal: &PrincipalId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM principals WHERE id = ?")
            .bind(principal.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Appends a document to the namespace and returns the stored item with
    /// its freshly assigned id.
    pub async fn insert_item(&self, namespace: &str, document: ItemDocument) -> Result<(Item, u64)> {
        let id = Uuid::new_v4().simple().to_string();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO items (id, namespace, name, quantity, price, is_purchased, created_at, owner_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(namespace)
        .bind(&document.name)
        .bind(i64::from(document.quantity))
        .bind(document.price)
        .bind(document.is_purchased)
        .bind(document.created_at)
        .bind(document.owner_id.as_str())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert item into namespace {namespace}"))?;
        let revision = bump_revision(&mut tx, namespace).await?;
        tx.commit().await?;

        debug!(namespace, item_id = %id, revision, "storage: item inserted");
        Ok((Item::from_document(ItemId::Remote(id), document), revision))
    }

    pub async fn toggle_item(&self, namespace: &str, item_id: &str) -> Result<TargetedWrite> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE items SET is_purchased = 1 - is_purchased WHERE namespace = ? AND id = ?",
        )
        .bind(namespace)
        .bind(item_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to toggle item {item_id}"))?
        .rows_affected();
        if updated == 0 {
            return Ok(TargetedWrite::Missing);
        }
        let revision = bump_revision(&mut tx, namespace).await?;
        tx.commit().await?;
        Ok(TargetedWrite::Applied { revision })
    }

    pub async fn delete_item(&self, namespace: &str, item_id: &str) -> Result<TargetedWrite> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM items WHERE namespace = ? AND id = ?")
            .bind(namespace)
            .bind(item_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to delete item {item_id}"))?
            .rows_affected();
        if deleted == 0 {
            return Ok(TargetedWrite::Missing);
        }
        let revision = bump_revision(&mut tx, namespace).await?;
        tx.commit().await?;
        Ok(TargetedWrite::Applied { revision })
    }

    /// Reads the complete item set of a namespace together with its current
    /// revision in a single transaction.
    pub async fn snapshot(&self, namespace: &str) -> Result<ItemSnapshot> {
        let mut tx = self.pool.begin().await?;
        let revision: Option<i64> =
            sqlx::query_scalar("SELECT revision FROM namespace_revisions WHERE namespace = ?")
                .bind(namespace)
                .fetch_optional(&mut *tx)
                .await?;
        let rows = sqlx::query(
            "SELECT id, name, quantity, price, is_purchased, created_at, owner_id
             FROM items WHERE namespace = ? ORDER BY rowid ASC",
        )
        .bind(namespace)
        .fetch_all(&mut *tx)
        .await
        .with_context(|| format!("failed to list items for namespace {namespace}"))?;
        tx.commit().await?;

        let items = rows.iter().map(item_from_row).collect::<Result<Vec<_>>>()?;
        Ok(ItemSnapshot {
            namespace: namespace.to_string(),
            revision: revision.unwrap_or(0).max(0) as u64,
            items,
        })
    }
}

async fn bump_revision(tx: &mut Transaction<'_, Sqlite>, namespace: &str) -> Result<u64> {
    let revision: i64 = sqlx::query_scalar(
        "INSERT INTO namespace_revisions (namespace, revision) VALUES (?, 1)
         ON CONFLICT(namespace) DO UPDATE SET revision = revision + 1
         RETURNING revision",
    )
    .bind(namespace)
    .fetch_one(&mut **tx)
    .await
    .with_context(|| format!("failed to bump revision for namespace {namespace}"))?;
    Ok(revision.max(0) as u64)
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    let quantity: i64 = row.try_get("quantity")?;
    Ok(Item {
        id: ItemId::Remote(row.try_get("id")?),
        name: row.try_get("name")?,
        quantity: u32::try_from(quantity).context("stored quantity out of range")?,
        price: row.try_get("price")?,
        is_purchased: row.try_get("is_purchased")?,
        created_at: row.try_get("created_at")?,
        owner_id: PrincipalId(row.try_get("owner_id")?),
    })
}

/// Turns a bare file path or a `sqlite:` path into a `sqlite://` URL. Other
/// URLs and the in-memory database pass through untouched.
pub fn sqlite_url(raw: &str) -> String {
    if raw.contains("://") || raw.starts_with("sqlite::memory:") {
        return raw.to_string();
    }
    let path = raw.strip_prefix("sqlite:").unwrap_or(raw);
    format!("sqlite://{}", path.replace('\\', "/"))
}

fn database_file(database_url: &str) -> Option<PathBuf> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

fn create_database_dir(database_url: &str) -> Result<()> {
    let Some(file) = database_file(database_url) else {
        return Ok(());
    };
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("cannot create directory {} for {database_url}", dir.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
