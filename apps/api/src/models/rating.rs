use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RatingType {
    WorkerToEmployer,
    EmployerToWorker,
}

impl RatingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingType::WorkerToEmployer => "worker_to_employer",
            RatingType::EmployerToWorker => "employer_to_worker",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RatingRow {
    pub id: Uuid,
    pub job_completion_id: Uuid,
    pub rater_id: Uuid,
    pub rated_user_id: Uuid,
    pub stars: i16,
    pub feedback: Option<String>,
    pub rating_type: String,
    pub created_at: DateTime<Utc>,
}
