use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::posting::normalize_phone;

const MAX_NAME_LEN: usize = 80;
const MAX_BIO_LEN: usize = 1000;
const MAX_SKILLS: usize = 20;

/// Partial profile edit. `user_id` must match the profile being edited.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub skills: Option<Vec<String>>,
}

impl ProfilePatch {
    pub fn validated(mut self) -> Result<Self, AppError> {
        if let Some(name) = self.name.as_mut() {
            *name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Validation("name cannot be empty".to_string()));
            }
            if name.chars().count() > MAX_NAME_LEN {
                return Err(AppError::Validation(format!(
                    "name must be at most {MAX_NAME_LEN} characters"
                )));
            }
        }
        if let Some(phone) = self.phone.as_deref() {
            self.phone = Some(normalize_phone(phone)?);
        }
        if let Some(bio) = self.bio.as_mut() {
            *bio = bio.trim().to_string();
            if bio.chars().count() > MAX_BIO_LEN {
                return Err(AppError::Validation(format!(
                    "bio must be at most {MAX_BIO_LEN} characters"
                )));
            }
        }
        if let Some(location) = self.location.as_mut() {
            *location = location.trim().to_string();
        }
        if let Some(skills) = self.skills.take() {
            self.skills = Some(clean_skills(skills)?);
        }
        Ok(self)
    }
}

/// Trims skills, drops blanks and case-insensitive duplicates, keeps first-seen order.
fn clean_skills(skills: Vec<String>) -> Result<Vec<String>, AppError> {
    let mut cleaned: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim();
        if skill.is_empty() || cleaned.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            continue;
        }
        cleaned.push(skill.to_string());
    }
    if cleaned.len() > MAX_SKILLS {
        return Err(AppError::Validation(format!(
            "at most {MAX_SKILLS} skills are allowed"
        )));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_normalizes() {
        let patch = ProfilePatch {
            user_id: Uuid::new_v4(),
            name: Some("  Ravi Kumar ".to_string()),
            phone: Some("+91 98765 43210".to_string()),
            location: Some(" Pune ".to_string()),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(patch.name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(patch.phone.as_deref(), Some("+919876543210"));
        assert_eq!(patch.location.as_deref(), Some("Pune"));
        assert!(patch.bio.is_none());
    }

    #[test]
    fn test_blank_name_rejected() {
        let patch = ProfilePatch {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(patch.validated().is_err());
    }

    #[test]
    fn test_skills_deduped() {
        let patch = ProfilePatch {
            skills: Some(vec![
                "Cooking".to_string(),
                " cooking ".to_string(),
                "".to_string(),
                "Driving".to_string(),
            ]),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(
            patch.skills,
            Some(vec!["Cooking".to_string(), "Driving".to_string()])
        );
    }

    #[test]
    fn test_too_many_skills() {
        let skills = (0..=MAX_SKILLS).map(|i| format!("skill {i}")).collect();
        let patch = ProfilePatch {
            skills: Some(skills),
            ..Default::default()
        };
        assert!(patch.validated().is_err());
    }
}
