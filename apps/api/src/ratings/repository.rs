use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::rating::{RatingRow, RatingType};
use crate::ratings::scoring::{incremental_mean, ValidRating};

/// Stores a rating and folds it into the rated profile's average for that role.
/// A second rating from the same rater on the same completion hits the unique
/// constraint and surfaces as a conflict.
pub async fn submit_rating(pool: &PgPool, rating: &ValidRating) -> Result<RatingRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, RatingRow>(
        r#"
        INSERT INTO ratings
            (id, job_completion_id, rater_id, rated_user_id, stars, feedback, rating_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(rating.job_completion_id)
    .bind(rating.rater_id)
    .bind(rating.rated_user_id)
    .bind(rating.stars)
    .bind(&rating.feedback)
    .bind(rating.rating_type.as_str())
    .fetch_one(&mut *tx)
    .await?;

    // Employers rate the worker side of a profile and vice versa.
    let (select_sql, update_sql) = match rating.rating_type {
        RatingType::EmployerToWorker => (
            "SELECT rating_as_worker, rating_as_worker_count FROM profiles \
             WHERE user_id = $1 FOR UPDATE",
            "UPDATE profiles SET rating_as_worker = $2, rating_as_worker_count = $3, \
             updated_at = NOW() WHERE user_id = $1",
        ),
        RatingType::WorkerToEmployer => (
            "SELECT rating_as_employer, rating_as_employer_count FROM profiles \
             WHERE user_id = $1 FOR UPDATE",
            "UPDATE profiles SET rating_as_employer = $2, rating_as_employer_count = $3, \
             updated_at = NOW() WHERE user_id = $1",
        ),
    };

    let current: Option<(f64, i32)> = sqlx::query_as(select_sql)
        .bind(rating.rated_user_id)
        .fetch_optional(&mut *tx)
        .await?;

    if let Some((average, count)) = current {
        let (average, count) = incremental_mean(average, count, rating.stars);
        sqlx::query(update_sql)
            .bind(rating.rated_user_id)
            .bind(average)
            .bind(count)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!(
        "Rating {} ({}) recorded for user {}",
        row.id,
        rating.rating_type.as_str(),
        rating.rated_user_id
    );
    Ok(row)
}

pub async fn list_ratings_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<RatingRow>, sqlx::Error> {
    sqlx::query_as::<_, RatingRow>(
        "SELECT * FROM ratings WHERE rated_user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
