use crate::domain::model::UserRecord;
use crate::domain::ports::{ItemReader, ItemWriter};
use crate::utils::error::{BatchError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::VecDeque;
use std::str::FromStr;

pub const TABLE_NAME: &str = "user_tb";

/// Rows fetched per query by [`TablePageReader`].
pub const EXPORT_PAGE_SIZE: usize = 10;

/// Handle to the `user_tb` table. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct UserTable {
    pool: SqlitePool,
}

impl UserTable {
    /// Opens (creating if missing) the database and ensures the table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // 每條 :memory: 連線都是獨立資料庫，只能用單一且不回收的連線
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(10)
        };

        let pool = pool_options.connect_with(options).await?;

        let table = Self { pool };
        table.ensure_schema().await?;
        tracing::info!("🗄️ Connected to {} ({})", TABLE_NAME, database_url);
        Ok(table)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_tb (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL DEFAULT '',
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                sex TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                date_of_birth TEXT NOT NULL DEFAULT '',
                job_title TEXT NOT NULL DEFAULT ''
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Up to `page_size` rows with `id > after_id`, ascending by id.
    pub async fn read_page(&self, after_id: i64, page_size: usize) -> Result<Vec<UserRecord>> {
        let limit = i64::try_from(page_size).map_err(|_| BatchError::ConfigError {
            message: format!("page size {} is out of range", page_size),
        })?;

        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, user_id, first_name, last_name, sex, email, phone, date_of_birth, job_title
             FROM user_tb WHERE id > ? ORDER BY id ASC LIMIT ?",
        )
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    /// Saves `record` as a new row and returns it with the assigned id.
    ///
    /// Any id carried in from the input is not used as a key: every call
    /// inserts, so loading the same file twice stores every line twice.
    pub async fn upsert(&self, mut record: UserRecord) -> Result<UserRecord> {
        let result = sqlx::query(
            "INSERT INTO user_tb
                (user_id, first_name, last_name, sex, email, phone, date_of_birth, job_title)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.user_id)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.sex)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.date_of_birth)
        .bind(&record.job_title)
        .execute(&self.pool)
        .await?;

        record.id = Some(result.last_insert_rowid());
        Ok(record)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_tb")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    user_id: String,
    first_name: String,
    last_name: String,
    sex: String,
    email: String,
    phone: String,
    date_of_birth: String,
    job_title: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: Some(row.id),
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            sex: row.sex,
            email: row.email,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            job_title: row.job_title,
        }
    }
}

/// Keyset cursor over the table: each refill asks for rows after the last
/// id seen, so a static table is neither skipped nor repeated.
pub struct TablePageReader {
    table: UserTable,
    page_size: usize,
    last_id: i64,
    buffer: VecDeque<UserRecord>,
    exhausted: bool,
}

impl TablePageReader {
    pub fn new(table: UserTable, page_size: usize) -> Self {
        Self {
            table,
            page_size: page_size.max(1),
            last_id: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }
}

#[async_trait]
impl ItemReader<UserRecord> for TablePageReader {
    async fn read(&mut self) -> Result<Option<UserRecord>> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = self.table.read_page(self.last_id, self.page_size).await?;
            tracing::debug!("📄 Fetched page after id {} ({} rows)", self.last_id, page.len());

            if page.len() < self.page_size {
                self.exhausted = true;
            }
            if let Some(last) = page.last().and_then(|record| record.id) {
                self.last_id = last;
            }
            self.buffer.extend(page);
        }

        Ok(self.buffer.pop_front())
    }
}

/// Persists each record individually through [`UserTable::upsert`].
#[derive(Clone)]
pub struct TableWriter {
    table: UserTable,
}

impl TableWriter {
    pub fn new(table: UserTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl ItemWriter<UserRecord> for TableWriter {
    async fn write(&self, item: UserRecord) -> Result<()> {
        let saved = self.table.upsert(item).await?;
        tracing::trace!("saved user row {:?}", saved.id);
        Ok(())
    }
}
