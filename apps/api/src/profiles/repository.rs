use sqlx::PgPool;
use uuid::Uuid;

use crate::models::profile::ProfileRow;
use crate::profiles::update::ProfilePatch;

pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Applies the fields present in `patch`. Returns `None` if the profile does not exist.
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    patch: &ProfilePatch,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>(
        r#"
        UPDATE profiles SET
            name       = COALESCE($2, name),
            phone      = COALESCE($3, phone),
            bio        = COALESCE($4, bio),
            location   = COALESCE($5, location),
            skills     = COALESCE($6, skills),
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&patch.name)
    .bind(&patch.phone)
    .bind(&patch.bio)
    .bind(&patch.location)
    .bind(&patch.skills)
    .fetch_optional(pool)
    .await
}
