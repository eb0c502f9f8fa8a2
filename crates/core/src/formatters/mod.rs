pub mod csv;
pub mod json;
pub mod text;

pub use self::csv::to_csv;
pub use json::{JsonFormatter, to_json};
pub use text::{TextTableConfig, to_text_table};
