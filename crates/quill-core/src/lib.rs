pub mod attrs;
pub mod pretty;
pub mod value;

pub use attrs::Attributes;
pub use pretty::format_value;
pub use value::Value;
