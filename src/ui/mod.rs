pub mod icons;
pub mod output;
pub mod progress;
pub mod table;

pub use icons::Icons;
pub use output::{dim, error, header, info, muted, section, status, success, summary_row, warn};
pub use progress::SyncProgress;
pub use table::{failures_table, stats_table, TableBuilder};
