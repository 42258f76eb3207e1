//! AI job-posting assistant: turns a one-line need into a draft listing.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::jobs::categories::{self, CATEGORIES};
use crate::jobs::prompts::{ASSIST_PROMPT_TEMPLATE, ASSIST_SYSTEM};
use crate::llm_client::LlmClient;

const MAX_NEED_LEN: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct AssistRequest {
    pub need: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Draft fields suggested for a new job post. Never saved automatically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDraft {
    pub title: String,
    pub category: String,
    pub job_type: String,
    pub daily_salary: String,
    pub description: String,
}

pub fn build_prompt(request: &AssistRequest) -> Result<String, AppError> {
    let need = request.need.trim();
    if need.is_empty() {
        return Err(AppError::Validation("need cannot be empty".to_string()));
    }
    if need.chars().count() > MAX_NEED_LEN {
        return Err(AppError::Validation(format!(
            "need must be at most {MAX_NEED_LEN} characters"
        )));
    }
    Ok(ASSIST_PROMPT_TEMPLATE
        .replace("{need}", need)
        .replace("{location}", request.location.as_deref().unwrap_or("").trim())
        .replace("{categories}", &CATEGORIES.join(", ")))
}

/// Keeps model output inside the board's vocabulary.
pub fn sanitize_draft(mut draft: JobDraft) -> JobDraft {
    draft.category = categories::normalize(&draft.category).to_string();
    draft.title = draft.title.trim().chars().take(60).collect();
    draft.description = draft.description.trim().to_string();
    draft
}

pub async fn draft_job(llm: &LlmClient, request: &AssistRequest) -> Result<JobDraft, AppError> {
    let prompt = build_prompt(request)?;
    let draft: JobDraft = llm
        .call_json(&prompt, ASSIST_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("job assistant failed: {e}")))?;
    Ok(sanitize_draft(draft))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_fills_placeholders() {
        let prompt = build_prompt(&AssistRequest {
            need: "  need a maid for morning cleaning ".to_string(),
            location: Some("Agra".to_string()),
        })
        .unwrap();
        assert!(prompt.contains("\"need a maid for morning cleaning\""));
        assert!(prompt.contains("Location (may be empty): Agra"));
        assert!(prompt.contains("Household Help"));
        assert!(!prompt.contains("{need}"));
    }

    #[test]
    fn test_empty_need_rejected() {
        let err = build_prompt(&AssistRequest {
            need: " ".to_string(),
            location: None,
        });
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_sanitize_clamps_category_and_title() {
        let draft = sanitize_draft(JobDraft {
            title: "x".repeat(100),
            category: "Rocket Science".to_string(),
            job_type: "One Time".to_string(),
            daily_salary: "₹700/day".to_string(),
            description: "  Help needed.  ".to_string(),
        });
        assert_eq!(draft.category, "Other Services");
        assert_eq!(draft.title.chars().count(), 60);
        assert_eq!(draft.description, "Help needed.");
    }

    #[test]
    fn test_draft_parses_from_model_json() {
        let raw = r#"{"title":"Cook needed","category":"cooking-catering","job_type":"Full Day","daily_salary":"₹500/day","description":"Cook lunch."}"#;
        let draft = sanitize_draft(serde_json::from_str::<JobDraft>(raw).unwrap());
        assert_eq!(draft.category, "Cooking & Catering");
    }
}
