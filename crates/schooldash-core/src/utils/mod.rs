//! Display formatting helpers.

pub mod format;

pub use format::{format_currency, format_date, format_relative, truncate_string};
