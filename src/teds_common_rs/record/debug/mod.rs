pub mod debug_logger;

pub use debug_logger::{format_field_listing, RecordDebugLogger};
