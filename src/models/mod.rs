pub mod loaders;
pub mod question;
pub mod submission;
