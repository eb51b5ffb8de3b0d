// SQLite-backed persistence. Each `apply` runs in one transaction; updates
// are guarded by `WHERE version = ?` so a stale writer affects zero rows.

use async_trait::async_trait;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::info;

use super::traits::{ConditionalWrite, Expected, Record, StoreError, WorkflowStore};
use crate::model::{Project, ProjectFilter, ProjectId, Quote, QuoteFilter, QuoteId};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects, creating the database file if needed, and optionally migrates
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        if !Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(sqlx::Error::from)?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn conflict(record: &Record, expected: Expected) -> StoreError {
    StoreError::Conflict {
        entity: record.entity(),
        id: record.id(),
        expected: expected.to_string(),
        found: "a different value".to_string(),
    }
}

async fn write_quote(
    tx: &mut Transaction<'_, Sqlite>,
    quote: &Quote,
    expected: Expected,
) -> Result<u64, StoreError> {
    let body = serde_json::to_string(quote)?;
    let result = match expected {
        Expected::Absent => {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO quotes (id, version, status, requester, body)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(quote.id.to_string())
            .bind(quote.version as i64)
            .bind(quote.status.to_string())
            .bind(quote.requester.as_str())
            .bind(&body)
            .execute(&mut **tx)
            .await?
        }
        Expected::Version(version) => {
            sqlx::query(
                r#"
                UPDATE quotes
                SET version = ?2, status = ?3, requester = ?4, body = ?5
                WHERE id = ?1 AND version = ?6
                "#,
            )
            .bind(quote.id.to_string())
            .bind(quote.version as i64)
            .bind(quote.status.to_string())
            .bind(quote.requester.as_str())
            .bind(&body)
            .bind(version as i64)
            .execute(&mut **tx)
            .await?
        }
    };
    Ok(result.rows_affected())
}

async fn write_project(
    tx: &mut Transaction<'_, Sqlite>,
    project: &Project,
    expected: Expected,
) -> Result<u64, StoreError> {
    let body = serde_json::to_string(project)?;
    let technician = project.assigned_technician.as_ref().map(|t| t.as_str().to_string());
    let result = match expected {
        Expected::Absent => {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO projects (id, version, status, customer, technician, body)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(project.id.to_string())
            .bind(project.version as i64)
            .bind(project.status.to_string())
            .bind(project.customer.as_str())
            .bind(technician)
            .bind(&body)
            .execute(&mut **tx)
            .await?
        }
        Expected::Version(version) => {
            sqlx::query(
                r#"
                UPDATE projects
                SET version = ?2, status = ?3, customer = ?4, technician = ?5, body = ?6
                WHERE id = ?1 AND version = ?7
                "#,
            )
            .bind(project.id.to_string())
            .bind(project.version as i64)
            .bind(project.status.to_string())
            .bind(project.customer.as_str())
            .bind(technician)
            .bind(&body)
            .bind(version as i64)
            .execute(&mut **tx)
            .await?
        }
    };
    Ok(result.rows_affected())
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl WorkflowStore for SqliteStore {
    async fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>, StoreError> {
        let row = sqlx::query("SELECT body FROM quotes WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| decode(&row.get::<String, _>("body"))).transpose()
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT body FROM quotes
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR requester = ?2)
            ORDER BY created_seq
            "#,
        )
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.requester.as_ref().map(|r| r.as_str().to_string()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| decode(&row.get::<String, _>("body")))
            .collect()
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query("SELECT body FROM projects WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| decode(&row.get::<String, _>("body"))).transpose()
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT body FROM projects
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR customer = ?2)
              AND (?3 IS NULL OR technician = ?3)
            ORDER BY created_seq
            "#,
        )
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.customer.as_ref().map(|c| c.as_str().to_string()))
        .bind(filter.technician.as_ref().map(|t| t.as_str().to_string()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| decode(&row.get::<String, _>("body")))
            .collect()
    }

    async fn apply(&self, writes: Vec<ConditionalWrite>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for write in &writes {
            let affected = match &write.record {
                Record::Quote(quote) => write_quote(&mut tx, quote, write.expected).await?,
                Record::Project(project) => write_project(&mut tx, project, write.expected).await?,
            };
            if affected != 1 {
                tx.rollback().await?;
                return Err(conflict(&write.record, write.expected));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorId, QuoteDraft};
    use chrono::Utc;

    async fn store() -> SqliteStore {
        // One connection: every in-memory connection is its own database
        SqliteStore::new("sqlite::memory:", 1, true).await.unwrap()
    }

    #[tokio::test]
    async fn test_stale_version_rolls_back_whole_batch() {
        let store = store().await;
        let quote = Quote::new(ActorId::from("c1"), QuoteDraft::default(), Utc::now());
        store.apply(vec![ConditionalWrite::insert_quote(quote.clone())]).await.unwrap();

        let next = quote.next_version(Utc::now());
        let project = Project::from_quote(&quote, Utc::now());
        let err = store
            .apply(vec![
                ConditionalWrite::insert_project(project.clone()),
                ConditionalWrite::update_quote(next, quote.version + 1),
            ])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(store.get_project(project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filters_use_indexed_columns() {
        let store = store().await;
        let quote = Quote::new(ActorId::from("c1"), QuoteDraft::default(), Utc::now());
        let other = Quote::new(ActorId::from("c2"), QuoteDraft::default(), Utc::now());
        store
            .apply(vec![
                ConditionalWrite::insert_quote(quote.clone()),
                ConditionalWrite::insert_quote(other),
            ])
            .await
            .unwrap();

        let mine = store
            .list_quotes(&QuoteFilter {
                requester: Some(ActorId::from("c1")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine, vec![quote]);
    }
}
