use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::models::types::AssignmentTarget;
use crate::schemas::question::QuestionCreate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OnlineTestCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(alias = "batchId")]
    #[validate(length(min = 1, message = "batch_id must not be empty"))]
    pub batch_id: String,
    #[serde(alias = "date", alias = "startAt", deserialize_with = "deserialize_instant")]
    pub start_at: OffsetDateTime,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub duration_minutes: i64,
    #[serde(default)]
    pub questions: Vec<QuestionCreate>,
    #[serde(default, alias = "assignmentTarget")]
    pub assignment_target: AssignmentTarget,
    #[serde(default, alias = "assignedStudentIds")]
    pub assigned_student_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OfflineTestCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(alias = "batchId")]
    #[validate(length(min = 1, message = "batch_id must not be empty"))]
    pub batch_id: String,
    #[serde(alias = "date", alias = "startAt", deserialize_with = "deserialize_instant")]
    pub start_at: OffsetDateTime,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub duration_minutes: i64,
    #[serde(alias = "totalMarks")]
    #[validate(range(min = 1, message = "total_marks must be positive"))]
    pub total_marks: i64,
    #[serde(default, alias = "assignmentTarget")]
    pub assignment_target: AssignmentTarget,
    #[serde(default, alias = "assignedStudentIds")]
    pub assigned_student_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OfflineMarkCreate {
    #[validate(range(min = 0, message = "marks must not be negative"))]
    pub marks: i64,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Millis(i64),
    Text(String),
}

fn parse_instant_text(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // datetime-local inputs arrive without an offset; they are taken as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match RawInstant::deserialize(deserializer)? {
        RawInstant::Millis(millis) => {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                .map_err(|_| D::Error::custom(format!("invalid timestamp: {millis}")))
        }
        RawInstant::Text(raw) => parse_instant_text(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}"))),
    }
}
