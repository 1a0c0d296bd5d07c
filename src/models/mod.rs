pub mod question;
pub mod report;
pub mod study_guide;
