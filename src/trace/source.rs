//! Source windows around a point of failure

use rustc_hash::FxHashMap as HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Number of lines shown on each side of the failing line.
pub const RADIUS: usize = 5;

/// Memoised file contents, keyed by path.
///
/// Unreadable files are remembered as `None` so they are only tried once.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<PathBuf, Option<Rc<Vec<String>>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines of `path`, reading it on first use.
    pub fn lines(&mut self, path: &Path) -> Option<Rc<Vec<String>>> {
        if let Some(cached) = self.files.get(path) {
            return cached.clone();
        }
        tracing::trace!(path = %path.display(), "reading source file");
        let loaded = std::fs::read_to_string(path)
            .ok()
            .map(|text| Rc::new(text.lines().map(str::to_string).collect::<Vec<_>>()));
        self.files.insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    /// Render the lines surrounding `line` (1-indexed) of `path`.
    ///
    /// ```text
    /// [3..13] in tests/math.rs
    ///    03 ...
    /// => 08     t.assert().eq(&sum, &5);
    ///    13 ...
    /// ```
    pub fn snippet(&mut self, path: &Path, line: usize) -> Option<String> {
        let source = self.lines(path)?;
        if line == 0 || line > source.len() {
            return None;
        }

        let first = line.saturating_sub(RADIUS).max(1);
        let last = (line + RADIUS).min(source.len());
        let width = last.to_string().len();

        let mut out = format!("[{}..{}] in {}", first, last, path.display());
        for n in first..=last {
            let marker = if n == line { "=>" } else { "" };
            out.push('\n');
            out.push_str(&format!(
                "{:>2} {:0width$} {}",
                marker,
                n,
                source[n - 1],
                width = width
            ));
        }
        Some(out.trim().to_string())
    }

    /// Number of distinct paths looked up so far.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
