//! CLI command implementations

mod check;
mod context;
mod serve;
mod status;

pub use check::run_check;
pub use serve::{ServeOptions, run_serve};
pub use status::run_status;
