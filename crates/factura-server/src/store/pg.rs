//! PostgreSQL-backed job store

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{FileRecord, Job, JobStore, StoreError};

/// Production store backed by the `jobs` and `files` tables.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn job_from_row(row: &sqlx::postgres::PgRow) -> Result<Job, StoreError> {
        Ok(Job {
            id: row.try_get("id")?,
            status: row.try_get::<String, _>("status")?.parse()?,
            target_currency: row.try_get("target_currency")?,
            total: row.try_get("total")?,
            processed: row.try_get("processed")?,
            report_path: row.try_get("report_path")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn file_from_row(row: &sqlx::postgres::PgRow) -> Result<FileRecord, StoreError> {
        Ok(FileRecord {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            position: row.try_get("upload_position")?,
            filename: row.try_get("filename")?,
            status: row.try_get::<String, _>("status")?.parse()?,
            original_currency: row.try_get("original_currency")?,
            target_currency: row.try_get("target_currency")?,
            invoice_date: row.try_get("invoice_date")?,
            invoice_identifier: row.try_get("invoice_identifier")?,
            total_amount: row.try_get("total_amount")?,
            vendor_name: row.try_get("vendor_name")?,
            converted_amount: row.try_get("converted_amount")?,
            exchange_rate: row.try_get("exchange_rate")?,
            error_message: row.try_get("error_message")?,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, job: &Job, files: &[FileRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, status, target_currency, total, processed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(&job.target_currency)
        .bind(job.total)
        .bind(job.processed)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await?;

        for file in files {
            sqlx::query(
                r#"
                INSERT INTO files
                    (id, job_id, upload_position, filename, status, target_currency)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(file.id)
            .bind(file.job_id)
            .bind(file.position)
            .bind(&file.filename)
            .bind(file.status.as_str())
            .bind(&file.target_currency)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::job_from_row).transpose()
    }

    async fn files(&self, job_id: Uuid) -> Result<Vec<FileRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM files WHERE job_id = $1 ORDER BY upload_position")
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::file_from_row).collect()
    }

    async fn mark_processing(&self, job_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = 'processing', updated_at = now()
            WHERE id = $1 AND status = 'queued'
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(job_id));
        }
        Ok(())
    }

    async fn update_file(&self, file: &FileRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE files SET
                status = $2,
                original_currency = $3,
                invoice_date = $4,
                invoice_identifier = $5,
                total_amount = $6,
                vendor_name = $7,
                converted_amount = $8,
                exchange_rate = $9,
                error_message = $10
            WHERE id = $1
            "#,
        )
        .bind(file.id)
        .bind(file.status.as_str())
        .bind(&file.original_currency)
        .bind(file.invoice_date)
        .bind(&file.invoice_identifier)
        .bind(&file.total_amount)
        .bind(&file.vendor_name)
        .bind(&file.converted_amount)
        .bind(&file.exchange_rate)
        .bind(&file.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn bump_processed(&self, job_id: Uuid) -> Result<i32, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE jobs SET processed = processed + 1, updated_at = now()
            WHERE id = $1
            RETURNING processed
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::JobNotFound(job_id))?;

        Ok(row.try_get("processed")?)
    }

    async fn complete_job(&self, job_id: Uuid, report_path: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = 'completed', report_path = $2, updated_at = now()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(job_id)
        .bind(report_path)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(job_id));
        }
        Ok(())
    }

    async fn fail_job(&self, job_id: Uuid, message: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = 'error', error_message = $2, updated_at = now()
            WHERE id = $1 AND status IN ('queued', 'processing')
            "#,
        )
        .bind(job_id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(job_id));
        }
        Ok(())
    }
}
