pub mod backend;
pub mod cascade;
pub mod chunker;
pub mod concepts;
pub mod parser;
pub mod prompt;
pub mod translate;
