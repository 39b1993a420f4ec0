//! System module: filesystem layout of projects

pub mod paths;

pub use paths::{find_project_dir_above, is_project_dir, ProjectDirs};
