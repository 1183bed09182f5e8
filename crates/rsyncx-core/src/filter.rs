//! Exclude filters applied to local and remote listings
//!
//! Patterns use rsync's glob flavour: `*` and `?` stay within one path
//! segment, `**` crosses segments, a trailing `/` only matches directories and
//! a pattern containing `/` is anchored at the sync root. Patterns without a
//! `/` match any single segment. Braces and character classes follow
//! `globset` syntax.

use globset::{GlobBuilder, GlobMatcher};
use rsyncx_fs::RsyncxPath;

use crate::Result;

/// Exclusions shipped by default, mirroring common OS and tooling clutter.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "@eaDir/",
    ".Trash*/",
    ".Spotlight*/",
    ".fseventsd/",
    ".TemporaryItems/",
    ".cache/",
    ".idea/",
    "venv/",
    "VENV/",
    "menv/",
    "__pycache__/",
    "node_modules/",
    "dist/",
    "build/",
    ".DS_Store",
    "Thumbs.db",
    "*.pyc",
    "*.pyo",
    "*.tmp",
    "*.swp",
    "*.swo",
    "*.log",
];

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    matcher: GlobMatcher,
    dir_only: bool,
    anchored: bool,
}

impl Rule {
    fn parse(raw: &str) -> Result<Self> {
        let dir_only = raw.ends_with('/');
        let mut body = raw.trim_end_matches('/');
        let anchored_root = body.starts_with('/');
        body = body.trim_start_matches('/');
        if let Some(rest) = body.strip_prefix("**/") {
            body = rest;
        }
        let anchored = anchored_root || body.contains('/');

        let matcher = GlobBuilder::new(body)
            .literal_separator(true)
            .build()?
            .compile_matcher();

        Ok(Self {
            pattern: raw.to_string(),
            matcher,
            dir_only,
            anchored,
        })
    }

    /// `is_dir` tells whether the last segment names a directory; otherwise
    /// directory rules may only match proper prefixes.
    fn matches(&self, segments: &[&str], is_dir: bool) -> bool {
        let last = segments.len();
        let candidates = if self.dir_only && !is_dir {
            last.saturating_sub(1)
        } else {
            last
        };

        if self.anchored {
            (1..=candidates).any(|n| self.matcher.is_match(segments[..n].join("/")))
        } else {
            segments[..candidates]
                .iter()
                .any(|segment| self.matcher.is_match(segment))
        }
    }
}

/// A compiled set of exclude patterns.
///
/// The recycle bin directory and rsyncx temporary files are always excluded,
/// so archived content is never planned for transfer or deletion.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    rules: Vec<Rule>,
}

impl ExcludeFilter {
    /// Only the built-in reserved exclusions.
    pub fn reserved_only() -> Self {
        Self { rules: Vec::new() }
    }

    /// Compile the given patterns (in addition to the reserved exclusions).
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| Rule::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// [`DEFAULT_EXCLUDES`] plus `extra`.
    pub fn with_defaults<I, S>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect();
        patterns.extend(extra.into_iter().map(|p| p.as_ref().to_string()));
        Self::new(patterns)
    }

    /// Patterns in evaluation order, as written.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.pattern.as_str())
    }

    /// Whether a root-relative file path is excluded.
    pub fn is_excluded(&self, relative: &str) -> bool {
        self.excludes(relative, false)
    }

    /// Whether a root-relative directory, and everything below it, is
    /// excluded.
    pub fn is_excluded_dir(&self, relative: &str) -> bool {
        self.excludes(relative, true)
    }

    fn excludes(&self, relative: &str, is_dir: bool) -> bool {
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return !is_dir;
        }
        if segments[0] == RsyncxPath::TrashDir.as_str() && (is_dir || segments.len() > 1) {
            return true;
        }
        if segments
            .iter()
            .any(|s| s.starts_with(RsyncxPath::TempPrefix.as_str()))
        {
            return true;
        }
        self.rules.iter().any(|rule| rule.matches(&segments, is_dir))
    }
}

impl Default for ExcludeFilter {
    fn default() -> Self {
        Self::reserved_only()
    }
}

/// Parse an rsync-style filter file.
///
/// Lines of the form `- pattern` are excludes. Comments (`#`) and blank lines
/// are skipped; include rules (`+ pattern`) are not supported and ignored
/// with a warning.
pub fn parse_filter_file(content: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(pattern) = line.strip_prefix("- ") {
            patterns.push(pattern.trim().to_string());
        } else if line.starts_with("+ ") {
            tracing::warn!("Include rule '{}' is not supported and was ignored", line);
        } else {
            patterns.push(line.to_string());
        }
    }
    patterns
}
