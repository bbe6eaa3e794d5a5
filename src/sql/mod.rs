//! SQL templating and execution.
//!
//! Layout:
//! - `template.rs`: `:name` → `?` rewriting, comment and literal aware
//! - `binder.rs`: values, argument validation and positional binding
//! - `exec.rs`: list / exactly-one / update helpers over any executor

pub mod binder;
pub mod exec;
pub mod template;

pub use binder::{Params, Prepared, SqlValue, bind_named};
pub use template::SqlTemplate;
