//! Local file names for scratch copies and converted output.
//!
//! Remote names are user-controlled, so they are sanitised before touching
//! the local filesystem: a name must never be able to address a path outside
//! the scratch or output directory.
//!
//! Output names are derived from the base name only (`Doc.pages` →
//! `Doc_extracted.txt`). Two candidates differing only by extension would
//! collide, so [`OutputNamer`] remembers which paths this run already
//! produced and folds the source extension (then the remote id) into later
//! names.

use crate::config::OutputFormat;
use crate::filter::CandidateFile;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;

/// Path separators, characters reserved on Windows, and ASCII control characters.
static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f\x7f]"#).unwrap());

/// Replace anything that is not safe in a single path component with `_`.
///
/// Empty names and the special components `.` / `..` become `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name.trim(), "_");
    match cleaned.as_ref() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned.into_owned(),
    }
}

/// Derives per-run unique output paths.
#[derive(Debug)]
pub struct OutputNamer {
    output_dir: PathBuf,
    format: OutputFormat,
    claimed: HashSet<PathBuf>,
}

impl OutputNamer {
    pub fn new(output_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            claimed: HashSet::new(),
        }
    }

    /// The output path for `candidate`, distinct from every path returned
    /// earlier in this run.
    pub fn output_path(&mut self, candidate: &CandidateFile) -> PathBuf {
        let base = candidate.base_name();
        let ext = candidate.extension.trim_start_matches('.');

        let attempts = [
            base.to_string(),
            format!("{base}_{ext}"),
            format!("{base}_{ext}_{}", candidate.entry.id),
        ];
        for stem in attempts {
            let path = self.path_for(&stem);
            if self.claimed.insert(path.clone()) {
                return path;
            }
        }

        // Box ids are unique per store, so this only triggers for odd
        // RemoteStore implementations.
        let mut n = 1usize;
        loop {
            let path = self.path_for(&format!("{base}_{ext}_{}_{n}", candidate.entry.id));
            if self.claimed.insert(path.clone()) {
                return path;
            }
            n += 1;
        }
    }

    fn path_for(&self, stem: &str) -> PathBuf {
        let file_name = format!("{}{}", stem, self.format.output_suffix());
        self.output_dir.join(sanitize_file_name(&file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::select_candidates;
    use crate::remote::{EntryKind, RemoteEntry};
    use std::path::Path;

    fn candidate(id: &str, name: &str) -> CandidateFile {
        select_candidates([RemoteEntry {
            id: id.to_string(),
            name: name.to_string(),
            kind: EntryKind::File,
            size: 10,
            modified_at: None,
        }])
        .remove(0)
    }

    #[test]
    fn sanitises_separators_and_specials() {
        assert_eq!(sanitize_file_name("a/b\\c.pages"), "a_b_c.pages");
        assert_eq!(sanitize_file_name("Q3: plan?.key"), "Q3_ plan_.key");
        assert_eq!(sanitize_file_name(".."), "_");
        assert_eq!(sanitize_file_name("   "), "_");
        assert_eq!(sanitize_file_name("Résumé.pages"), "Résumé.pages");
    }

    #[test]
    fn text_and_html_suffixes() {
        let mut txt = OutputNamer::new("/out", OutputFormat::Text);
        assert_eq!(
            txt.output_path(&candidate("1", "Report.pages")),
            PathBuf::from("/out/Report_extracted.txt")
        );
        let mut html = OutputNamer::new("/out", OutputFormat::Html);
        assert_eq!(
            html.output_path(&candidate("1", "Report.pages")),
            PathBuf::from("/out/Report_converted.html")
        );
    }

    #[test]
    fn same_base_name_gets_disambiguated() {
        let mut namer = OutputNamer::new("/out", OutputFormat::Text);
        let first = namer.output_path(&candidate("1", "Plan.pages"));
        let second = namer.output_path(&candidate("2", "Plan.numbers"));
        let third = namer.output_path(&candidate("3", "Plan.numbers"));

        assert_eq!(first, PathBuf::from("/out/Plan_extracted.txt"));
        assert_eq!(second, PathBuf::from("/out/Plan_numbers_extracted.txt"));
        assert_eq!(third, PathBuf::from("/out/Plan_numbers_3_extracted.txt"));
    }

    #[test]
    fn traversal_names_stay_inside_output_dir() {
        let mut namer = OutputNamer::new("/out", OutputFormat::Text);
        let path = namer.output_path(&candidate("1", "../../etc/passwd.pages"));
        assert_eq!(path.parent(), Some(Path::new("/out")));
    }
}
