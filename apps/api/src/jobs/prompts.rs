// Prompts for the job-posting assistant.

pub const ASSIST_SYSTEM: &str = "You help small employers in India write clear job posts \
    for local, daily-wage work. Keep language simple. \
    You MUST respond with valid JSON only, with no markdown fences and no commentary.";

/// Replace `{need}`, `{location}` and `{categories}` before sending.
pub const ASSIST_PROMPT_TEMPLATE: &str = r#"An employer described what they need:

"{need}"

Location (may be empty): {location}

Write a job post. Return a JSON object with exactly these fields:
{
  "title": "short title, at most 60 characters",
  "category": "one of: {categories}",
  "job_type": "Full Day | Half Day | Part Time | One Time",
  "daily_salary": "a fair daily wage in rupees, e.g. \"₹600/day\"",
  "description": "3-5 short sentences: the work, timings, requirements"
}"#;
