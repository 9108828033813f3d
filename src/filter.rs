//! Candidate selection: which remote entries are iWork documents.

use crate::remote::{EntryKind, RemoteEntry};

/// Lowercase extensions (dot included) accepted for conversion.
///
/// `.key` is the legacy Keynote extension and `.nmbrs` an occasional Numbers
/// alias; both decode exactly like their primary forms.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".pages", ".numbers", ".nmbrs", ".keynote", ".key"];

/// A remote file selected for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFile {
    pub entry: RemoteEntry,
    /// Lowercased extension including the leading dot, e.g. `.pages`.
    pub extension: String,
}

impl CandidateFile {
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// The name with its final extension removed (`Report.v2.pages` → `Report.v2`).
    pub fn base_name(&self) -> &str {
        let name = &self.entry.name;
        &name[..name.len() - self.extension.len()]
    }
}

/// The final extension of `name`, dot included; empty if there is none.
pub fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}

/// True iff `entry` is a file whose extension is in [`SUPPORTED_EXTENSIONS`].
pub fn is_supported(entry: &RemoteEntry) -> bool {
    entry.kind == EntryKind::File
        && SUPPORTED_EXTENSIONS.contains(&file_extension(&entry.name).to_ascii_lowercase().as_str())
}

/// Keep supported entries, preserving listing order.
pub fn select_candidates(entries: impl IntoIterator<Item = RemoteEntry>) -> Vec<CandidateFile> {
    entries
        .into_iter()
        .filter(is_supported)
        .map(|entry| {
            let extension = file_extension(&entry.name).to_ascii_lowercase();
            CandidateFile { entry, extension }
        })
        .collect()
}
