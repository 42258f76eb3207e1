//! Who rates whom after a job completion, and how profile averages move.

use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::JobCompletionRow;
use crate::models::rating::RatingType;

pub const MIN_STARS: i16 = 1;
pub const MAX_STARS: i16 = 5;
const MAX_FEEDBACK_LEN: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub job_completion_id: Uuid,
    pub rater_id: Uuid,
    pub stars: i16,
    pub feedback: Option<String>,
}

/// A rating that passed every check and is ready to store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRating {
    pub job_completion_id: Uuid,
    pub rater_id: Uuid,
    pub rated_user_id: Uuid,
    pub rating_type: RatingType,
    pub stars: i16,
    pub feedback: Option<String>,
}

impl RatingRequest {
    pub fn validated(self, completion: &JobCompletionRow) -> Result<ValidRating, AppError> {
        if !(MIN_STARS..=MAX_STARS).contains(&self.stars) {
            return Err(AppError::Validation(format!(
                "stars must be between {MIN_STARS} and {MAX_STARS}"
            )));
        }
        let (rating_type, rated_user_id) = rating_role(completion, self.rater_id)?;
        let feedback = self
            .feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        if feedback
            .as_deref()
            .is_some_and(|f| f.chars().count() > MAX_FEEDBACK_LEN)
        {
            return Err(AppError::Validation(format!(
                "feedback must be at most {MAX_FEEDBACK_LEN} characters"
            )));
        }
        Ok(ValidRating {
            job_completion_id: completion.id,
            rater_id: self.rater_id,
            rated_user_id,
            rating_type,
            stars: self.stars,
            feedback,
        })
    }
}

/// The rating direction and the rated user, from the rater's side of the completion.
pub fn rating_role(
    completion: &JobCompletionRow,
    rater_id: Uuid,
) -> Result<(RatingType, Uuid), AppError> {
    if rater_id == completion.employer_id {
        Ok((RatingType::EmployerToWorker, completion.worker_id))
    } else if rater_id == completion.worker_id {
        Ok((RatingType::WorkerToEmployer, completion.employer_id))
    } else {
        Err(AppError::Forbidden(
            "only the employer or worker of a completed job can rate it".to_string(),
        ))
    }
}

/// Folds one more score into a running average.
pub fn incremental_mean(average: f64, count: i32, stars: i16) -> (f64, i32) {
    let count = count.max(0);
    let next = count + 1;
    let average = average + (f64::from(stars) - average) / f64::from(next);
    (average, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn completion() -> JobCompletionRow {
        JobCompletionRow {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            employer_id: Uuid::new_v4(),
            worker_id: Uuid::new_v4(),
            completed_at: Utc::now(),
        }
    }

    fn request(rater_id: Uuid, stars: i16) -> RatingRequest {
        RatingRequest {
            job_completion_id: Uuid::new_v4(),
            rater_id,
            stars,
            feedback: Some("  Great work  ".to_string()),
        }
    }

    #[test]
    fn test_employer_rates_worker() {
        let c = completion();
        let rating = request(c.employer_id, 5).validated(&c).unwrap();
        assert_eq!(rating.rating_type, RatingType::EmployerToWorker);
        assert_eq!(rating.rated_user_id, c.worker_id);
        assert_eq!(rating.job_completion_id, c.id);
        assert_eq!(rating.feedback.as_deref(), Some("Great work"));
    }

    #[test]
    fn test_worker_rates_employer() {
        let c = completion();
        let rating = request(c.worker_id, 3).validated(&c).unwrap();
        assert_eq!(rating.rating_type, RatingType::WorkerToEmployer);
        assert_eq!(rating.rated_user_id, c.employer_id);
    }

    #[test]
    fn test_outsider_cannot_rate() {
        let c = completion();
        assert!(matches!(
            request(Uuid::new_v4(), 4).validated(&c),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_stars_out_of_range() {
        let c = completion();
        assert!(request(c.worker_id, 0).validated(&c).is_err());
        assert!(request(c.worker_id, 6).validated(&c).is_err());
    }

    #[test]
    fn test_blank_feedback_dropped() {
        let c = completion();
        let mut req = request(c.worker_id, 4);
        req.feedback = Some("   ".to_string());
        assert_eq!(req.validated(&c).unwrap().feedback, None);
    }

    #[test]
    fn test_incremental_mean_first_rating() {
        assert_eq!(incremental_mean(0.0, 0, 4), (4.0, 1));
    }

    proptest! {
        #[test]
        fn incremental_mean_matches_arithmetic_mean(stars in prop::collection::vec(1i16..=5, 1..50)) {
            let (avg, count) = stars
                .iter()
                .fold((0.0, 0), |(avg, count), &s| incremental_mean(avg, count, s));
            let expected = stars.iter().map(|&s| f64::from(s)).sum::<f64>() / stars.len() as f64;
            prop_assert_eq!(count as usize, stars.len());
            prop_assert!((avg - expected).abs() < 1e-9);
            prop_assert!(avg > 1.0 - 1e-9 && avg < 5.0 + 1e-9);
        }
    }
}
