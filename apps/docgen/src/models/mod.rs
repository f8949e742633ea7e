pub mod fields;
pub mod submission;
