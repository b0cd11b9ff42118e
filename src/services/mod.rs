pub mod ai_completion;
pub mod question_bank;
pub mod results;
pub mod scoring;
pub mod submission_finalize;
pub mod test_definitions;
pub mod test_status;
