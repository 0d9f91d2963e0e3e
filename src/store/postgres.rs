use anyhow::{anyhow, Context, Result};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

use crate::model::{BlobRef, Id, WardrobeItem};
use crate::store::traits::MetadataStore;

const ITEM_COLUMNS: &str = "id, owner_id, category, raw_label, color_label, blob_url, blob_id, created_at, source_tag";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn item_from_row(row: &PgRow) -> Result<WardrobeItem> {
    let category: String = row.try_get("category")?;
    let source_tag: String = row.try_get("source_tag")?;

    Ok(WardrobeItem {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        category: category.parse().map_err(|e: String| anyhow!(e))?,
        raw_label: row.try_get("raw_label")?,
        color_label: row.try_get("color_label")?,
        blob_ref: BlobRef {
            url: row.try_get("blob_url")?,
            blob_id: row.try_get("blob_id")?,
        },
        created_at: row.try_get("created_at")?,
        source_tag: source_tag.parse().map_err(|e: String| anyhow!(e))?,
    })
}

#[async_trait::async_trait]
impl MetadataStore for PostgresStore {
    async fn get_item(&self, id: &Id) -> Result<Option<WardrobeItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM wardrobe_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wardrobe item")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(item_from_row(&row)?))
    }

    async fn list_items_for_owner(&self, owner_id: &Id) -> Result<Vec<WardrobeItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM wardrobe_items WHERE owner_id = $1 ORDER BY created_at DESC, id",
            ITEM_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wardrobe items")?;

        rows.iter().map(item_from_row).collect()
    }

    async fn insert_items(&self, items: &[WardrobeItem]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start wardrobe batch")?;

        for item in items {
            sqlx::query(&format!(
                "INSERT INTO wardrobe_items ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                ITEM_COLUMNS
            ))
            .bind(&item.id)
            .bind(&item.owner_id)
            .bind(item.category.to_string())
            .bind(&item.raw_label)
            .bind(&item.color_label)
            .bind(&item.blob_ref.url)
            .bind(&item.blob_ref.blob_id)
            .bind(item.created_at)
            .bind(item.source_tag.to_string())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert wardrobe item {}", item.id))?;
        }

        // Dropping the transaction on an early return rolls it back
        tx.commit()
            .await
            .context("Failed to commit wardrobe batch")?;

        Ok(())
    }

    async fn delete_item(&self, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wardrobe_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete wardrobe item")?;

        Ok(result.rows_affected() > 0)
    }
}
