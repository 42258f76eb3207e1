use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::jobs::listing::ListingFilter;
use crate::jobs::posting::{JobPatch, NewJobRequest};
use crate::models::job::{JobCompletionRow, JobRow, JobStatus};

/// Upper bound on candidates pulled into the in-memory ranking step.
pub const LISTING_FETCH_LIMIT: i64 = 1000;

/// Active jobs passing `filter`. Same-city then same-state rows come first so
/// the cap trims distant listings before near ones.
pub async fn search_active_jobs(
    pool: &PgPool,
    filter: &ListingFilter,
) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE status = 'active'
          AND ($1::text IS NULL OR category = $1)
          AND ($2::text IS NULL
               OR title ILIKE $2 OR description ILIKE $2 OR job_type ILIKE $2
               OR location ILIKE $2 OR category ILIKE $2)
        ORDER BY COALESCE(location ILIKE $3, FALSE) DESC,
                 location ILIKE ANY($4) DESC,
                 featured DESC,
                 created_at DESC
        LIMIT $5
        "#,
    )
    .bind(&filter.category)
    .bind(&filter.text_pattern)
    .bind(&filter.city_pattern)
    .bind(&filter.nearby_patterns)
    .bind(LISTING_FETCH_LIMIT)
    .fetch_all(pool)
    .await
}

/// Active urgent or immediate jobs, featured first then newest.
pub async fn list_urgent_jobs(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE status = 'active' AND urgency <> 'normal'
        ORDER BY featured DESC, created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn list_featured_jobs(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE status = 'active' AND featured
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn list_jobs_by_owner(pool: &PgPool, user_id: Uuid) -> Result<Vec<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await
}

/// Inserts a job and bumps the owner's `jobs_posted` counter in one transaction.
pub async fn create_job(pool: &PgPool, job: &NewJobRequest) -> Result<JobRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (id, user_id, title, job_type, category, daily_salary, location,
             description, phone, urgency, status, featured, images)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active', FALSE, '{}')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job.user_id)
    .bind(&job.title)
    .bind(&job.job_type)
    .bind(&job.category)
    .bind(&job.daily_salary)
    .bind(&job.location)
    .bind(&job.description)
    .bind(&job.phone)
    .bind(job.urgency.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE profiles SET jobs_posted = jobs_posted + 1 WHERE user_id = $1")
        .bind(job.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!("Job {} posted by {}", row.id, row.user_id);
    Ok(row)
}

/// Applies a patch to a job owned by `patch.user_id`. Returns `None` if no such job.
pub async fn update_job(
    pool: &PgPool,
    job_id: Uuid,
    patch: &JobPatch,
) -> Result<Option<JobRow>, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET
            title = COALESCE($3, title),
            job_type = COALESCE($4, job_type),
            category = COALESCE($5, category),
            daily_salary = COALESCE($6, daily_salary),
            location = COALESCE($7, location),
            description = COALESCE($8, description),
            phone = COALESCE($9, phone),
            urgency = COALESCE($10, urgency),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(patch.user_id)
    .bind(&patch.title)
    .bind(&patch.job_type)
    .bind(&patch.category)
    .bind(&patch.daily_salary)
    .bind(&patch.location)
    .bind(&patch.description)
    .bind(&patch.phone)
    .bind(patch.urgency.map(|u| u.as_str()))
    .fetch_optional(pool)
    .await
}

pub async fn delete_job(pool: &PgPool, job_id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND user_id = $2")
        .bind(job_id)
        .bind(owner_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn append_image(pool: &PgPool, job_id: Uuid, url: &str) -> Result<JobRow, sqlx::Error> {
    sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET images = array_append(images, $2), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(url)
    .fetch_one(pool)
    .await
}


/// Flips an active job to completed. Matching on status makes concurrent
/// completions of one job race on this row, and only one wins.
pub const COMPLETE_ACTIVE_JOB_SQL: &str = r#"
    UPDATE jobs SET status = 'completed', updated_at = NOW()
    WHERE id = $1 AND status = 'active'
"#;

/// Records a completion, closes the job and credits the worker in one
/// transaction. Returns `None` if the job was no longer active.
pub async fn complete_job(
    pool: &PgPool,
    job_id: Uuid,
    employer_id: Uuid,
    worker_id: Uuid,
) -> Result<Option<JobCompletionRow>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let closed = sqlx::query(COMPLETE_ACTIVE_JOB_SQL)
        .bind(job_id)
        .execute(&mut *tx)
        .await?;
    if closed.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let completion = sqlx::query_as::<_, JobCompletionRow>(
        r#"
        INSERT INTO job_completions (id, job_id, employer_id, worker_id)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .bind(employer_id)
    .bind(worker_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE profiles SET jobs_completed = jobs_completed + 1 WHERE user_id = $1")
        .bind(worker_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!("Job {job_id} completed by worker {worker_id}");
    Ok(Some(completion))
}

pub async fn get_completion(
    pool: &PgPool,
    completion_id: Uuid,
) -> Result<Option<JobCompletionRow>, sqlx::Error> {
    sqlx::query_as::<_, JobCompletionRow>("SELECT * FROM job_completions WHERE id = $1")
        .bind(completion_id)
        .fetch_optional(pool)
        .await
}

/// Marks active jobs older than `ttl_days` as expired. Returns the count.
pub async fn expire_stale_jobs(pool: &PgPool, ttl_days: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE jobs SET status = $1, updated_at = NOW()
        WHERE status = 'active' AND created_at < NOW() - make_interval(days => $2)
        "#,
    )
    .bind(JobStatus::Expired.as_str())
    .bind(ttl_days)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_only_closes_active_jobs() {
        let sql = COMPLETE_ACTIVE_JOB_SQL
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        assert!(sql.contains("SET status = 'completed'"));
        assert!(sql.ends_with("WHERE id = $1 AND status = 'active'"));
    }
}
