pub mod files;
pub mod metadata;
pub mod probe;
pub mod writer;
