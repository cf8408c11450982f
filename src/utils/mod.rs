pub mod dates;
pub mod logging;
pub mod names;
pub mod stats;

pub use dates::{date2sql, normalize_whitespace, parse_portal_date};
pub use names::{create_named, get_name, sort_named, Named, PersonName};
pub use stats::{average, cmp_optional, percentile_ranks};
