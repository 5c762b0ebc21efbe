use std::path::Path;

use crate::models::SourceKind;

/// Decides whether a picked or dropped path is an archive or a folder.
pub fn classify(path: impl AsRef<Path>) -> SourceKind {
    let lowered = path.as_ref().to_string_lossy().trim_end().to_lowercase();
    if lowered.ends_with(".zip") {
        SourceKind::Archive
    } else {
        SourceKind::Folder
    }
}
