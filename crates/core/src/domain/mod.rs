pub mod snapshot;
pub mod summary;
