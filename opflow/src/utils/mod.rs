//! Small shared helpers.

mod timestamps;

pub use timestamps::{format_iso8601, iso_timestamp, now_utc, Timestamp};
