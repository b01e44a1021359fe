pub mod table;
pub mod parser;
pub mod extractor;
pub mod rates;
pub mod formatter;

pub use table::*;
pub use parser::*;
pub use extractor::*;
pub use rates::*;
pub use formatter::*;
