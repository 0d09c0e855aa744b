/// Subdirectory of the backup root holding the previous generation of every domain.
pub const QUARANTINE_DIR: &str = "lost";

/// Suffix of every stored domain configuration file.
pub const CONFIG_SUFFIX: &str = ".xml";
