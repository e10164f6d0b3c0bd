pub mod resolve;
pub mod scripts;
pub mod setup;
pub mod submit_several;
pub mod summarize;
pub mod version;

use std::path::Path;

/// Directory relative parameter files in a configuration are read from.
pub(crate) fn config_dir(config: &Path) -> &Path {
    config.parent().unwrap_or_else(|| Path::new("."))
}
