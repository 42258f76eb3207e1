//! Request bodies for creating and editing listings, with their validation.

use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::categories;
use crate::models::job::Urgency;

const MAX_TITLE_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 5000;

#[derive(Debug, Clone, Deserialize)]
pub struct NewJobRequest {
    pub user_id: Uuid,
    pub title: String,
    pub job_type: String,
    pub category: String,
    pub daily_salary: String,
    pub location: String,
    pub description: String,
    pub phone: String,
    #[serde(default)]
    pub urgency: Urgency,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPatch {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub job_type: Option<String>,
    pub category: Option<String>,
    pub daily_salary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub urgency: Option<Urgency>,
}

impl NewJobRequest {
    /// Trims every field, canonicalises the category and checks required fields.
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        self.job_type = self.job_type.trim().to_string();
        self.daily_salary = self.daily_salary.trim().to_string();
        self.location = self.location.trim().to_string();
        self.description = self.description.trim().to_string();
        self.phone = normalize_phone(&self.phone)?;
        self.category = categories::normalize(&self.category).to_string();

        require("title", &self.title)?;
        require("location", &self.location)?;
        require("description", &self.description)?;
        check_lengths(Some(&self.title), Some(&self.description))?;
        Ok(self)
    }
}

impl JobPatch {
    pub fn validated(mut self) -> Result<Self, AppError> {
        for (field, value) in [
            ("title", &mut self.title),
            ("location", &mut self.location),
            ("description", &mut self.description),
        ] {
            if let Some(v) = value.as_mut() {
                *v = v.trim().to_string();
                require(field, v)?;
            }
        }
        if let Some(phone) = self.phone.as_deref() {
            self.phone = Some(normalize_phone(phone)?);
        }
        if let Some(category) = self.category.as_deref() {
            self.category = Some(categories::normalize(category).to_string());
        }
        check_lengths(self.title.as_deref(), self.description.as_deref())?;
        Ok(self)
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn check_lengths(title: Option<&str>, description: Option<&str>) -> Result<(), AppError> {
    if title.is_some_and(|t| t.chars().count() > MAX_TITLE_LEN) {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
        return Err(AppError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// Keeps digits and a leading '+'; Indian numbers need at least 10 digits.
pub fn normalize_phone(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 10 || digits.len() > 13 {
        return Err(AppError::Validation(format!(
            "phone '{raw}' is not a valid phone number"
        )));
    }
    if raw.starts_with('+') {
        Ok(format!("+{digits}"))
    } else {
        Ok(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewJobRequest {
        NewJobRequest {
            user_id: Uuid::new_v4(),
            title: "  Need a cook ".to_string(),
            job_type: "Part Time".to_string(),
            category: "cooking-catering".to_string(),
            daily_salary: "₹500/day".to_string(),
            location: " Agra ".to_string(),
            description: "Cook for a family of four".to_string(),
            phone: "98765 43210".to_string(),
            urgency: Urgency::Urgent,
        }
    }

    #[test]
    fn test_valid_request_is_normalized() {
        let job = request().validated().unwrap();
        assert_eq!(job.title, "Need a cook");
        assert_eq!(job.location, "Agra");
        assert_eq!(job.category, "Cooking & Catering");
        assert_eq!(job.phone, "9876543210");
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut req = request();
        req.title = "   ".to_string();
        assert!(matches!(req.validated(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unknown_category_becomes_other() {
        let mut req = request();
        req.category = "Astronaut".to_string();
        assert_eq!(req.validated().unwrap().category, "Other Services");
    }

    #[test]
    fn test_phone_rules() {
        assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "+919876543210");
        assert!(normalize_phone("12345").is_err());
    }

    #[test]
    fn test_patch_rejects_blank_location() {
        let patch = JobPatch {
            location: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(patch.validated().is_err());
    }

    #[test]
    fn test_patch_untouched_fields_stay_none() {
        let patch = JobPatch {
            title: Some(" Driver ".to_string()),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("Driver"));
        assert!(patch.location.is_none());
    }
}
