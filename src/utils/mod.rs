pub mod format;

pub use format::{IconKind, format_bytes, icon_kind};
