//! Project guide: `terminus.md` in the working directory.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

pub const GUIDE_FILE_NAME: &str = "terminus.md";

/// Reads the guide from `dir`. Missing, unreadable or blank files yield `None`.
pub fn load_guide(dir: &Path) -> Option<String> {
    let path = dir.join(GUIDE_FILE_NAME);
    match fs::read_to_string(&path) {
        Ok(content) => {
            let content = content.trim();
            debug!(path = %path.display(), bytes = content.len(), "project guide loaded");
            (!content.is_empty()).then(|| content.to_string())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => None,
        Err(error) => {
            warn!(path = %path.display(), %error, "reading project guide failed");
            None
        }
    }
}
