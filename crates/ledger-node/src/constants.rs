pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
/// Fields a submitted transaction must carry with a non-empty value.
pub const REQUIRED_TX_FIELDS: [&str; 2] = ["author", "content"];
pub const NOTHING_TO_MINE: &str = "Nothing to mine";
