pub mod filters;
pub mod install;

pub use filters::{clean, smudge};
pub use install::{install, uninstall};
