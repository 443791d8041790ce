//! Identity and storage helpers

pub mod fs;
pub mod id;

pub use fs::{mk_unique_dir, read_file, write_file};
pub use id::generate_id;
