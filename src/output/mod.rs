// Output module
pub mod table;

pub use table::{AlertStateRow, OutputFormat, UsageRow, render_bar};
