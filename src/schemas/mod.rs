pub mod attempt;
pub mod question;
pub mod result;
pub mod test_definition;

pub use question::QuestionCreate;
pub use test_definition::{OfflineMarkCreate, OfflineTestCreate, OnlineTestCreate};
