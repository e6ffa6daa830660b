//! Locating and loading archive volumes from the local filesystem.

mod local;

pub use local::{Volume, discover_volumes};
