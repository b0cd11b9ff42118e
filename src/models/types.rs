use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    /// Single choice among `options`.
    Mcq,
    YesNo,
    FillInBlanks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestMode {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentTarget {
    #[default]
    All,
    Specific,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Upcoming,
    Due,
    Submitted,
    Completed,
    Missed,
    PendingMarking,
    Marked,
}

impl TestStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming",
            Self::Due => "Due",
            Self::Submitted => "Submitted",
            Self::Completed => "Completed",
            Self::Missed => "Missed",
            Self::PendingMarking => "Pending Marking",
            Self::Marked => "Marked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeMode {
    ManualSubmit,
    AutoDeadline,
}

impl FinalizeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManualSubmit => "manual",
            Self::AutoDeadline => "auto_deadline",
        }
    }
}
