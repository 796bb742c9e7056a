pub mod diff;
pub mod manifest;
