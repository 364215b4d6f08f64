//! Scope predicates selecting the notes an operation applies to.

use crate::error::Result;
use crate::note::Note;
use crate::types::MetaArea;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;

/// How a key, value or tag argument is matched.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact string match.
    Exact(String),
    /// Regular expression matched against the full string.
    Pattern(Regex),
}

impl Matcher {
    pub fn exact(value: impl Into<String>) -> Self {
        Matcher::Exact(value.into())
    }

    /// Compile a pattern anchored at both ends.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Matcher::Pattern(Regex::new(&format!("^(?:{})$", pattern))?))
    }

    /// Build from a CLI argument.
    pub fn from_arg(arg: &str, regex: bool) -> Result<Self> {
        if regex {
            Self::pattern(arg)
        } else {
            Ok(Self::exact(arg))
        }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        match self {
            Matcher::Exact(s) => s == candidate,
            Matcher::Pattern(re) => re.is_match(candidate),
        }
    }

    /// Strings among `candidates` that match.
    pub fn select(&self, candidates: &[String]) -> Vec<String> {
        candidates
            .iter()
            .filter(|c| self.is_match(c))
            .cloned()
            .collect()
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(s) => write!(f, "{}", s),
            Matcher::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// A predicate on one note.
#[derive(Debug, Clone)]
pub enum NoteFilter {
    /// Regex searched anywhere in the note path.
    Path(Regex),
    /// The note is exactly this path.
    Document(PathBuf),
    /// A key (and optionally one of its values) present in either area.
    Key {
        key: Matcher,
        value: Option<Matcher>,
    },
    /// A tag present in the body. An exact tag also matches its children.
    Tag(Matcher),
}

impl NoteFilter {
    pub fn path(pattern: &str) -> Result<Self> {
        Ok(NoteFilter::Path(Regex::new(pattern)?))
    }

    pub fn matches(&self, note: &Note) -> bool {
        match self {
            NoteFilter::Path(re) => re.is_match(&note.path().to_string_lossy()),
            NoteFilter::Document(path) => note.path() == path,
            NoteFilter::Key { key, value } => {
                [MetaArea::Frontmatter, MetaArea::Inline].into_iter().any(|area| {
                    note.keys(area).iter().filter(|k| key.is_match(k)).any(|k| match value {
                        None => true,
                        Some(value) => note.values(area, k).iter().any(|v| value.is_match(v)),
                    })
                })
            }
            NoteFilter::Tag(matcher) => note.tags().iter().any(|tag| match matcher {
                Matcher::Exact(name) => {
                    tag == name
                        || tag
                            .strip_prefix(name.as_str())
                            .is_some_and(|rest| rest.starts_with('/'))
                }
                Matcher::Pattern(re) => re.is_match(tag),
            }),
        }
    }
}

/// A set of filters combined by intersection. No filters selects every
/// note.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    filters: Vec<NoteFilter>,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: NoteFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Scope of a single note.
    pub fn document(path: impl Into<PathBuf>) -> Self {
        Self::all().with(NoteFilter::Document(path.into()))
    }

    pub fn filters(&self) -> &[NoteFilter] {
        &self.filters
    }

    pub fn matches(&self, note: &Note) -> bool {
        self.filters.iter().all(|f| f.matches(note))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note() -> Note {
        Note::parse(
            "projects/alpha.md",
            "---\nstatus: [new, open]\n---\nowner:: sam\n#project/alpha\n",
        )
    }

    #[test]
    fn test_matcher_full_match() {
        let m = Matcher::pattern("sta.*").unwrap();
        assert!(m.is_match("status"));
        assert!(!m.is_match("a status"));
        assert!(Matcher::exact("x").is_match("x"));
        assert!(!Matcher::exact("x").is_match("xy"));
    }

    #[test]
    fn test_matcher_alternation_is_anchored() {
        let m = Matcher::pattern("a|b").unwrap();
        assert!(m.is_match("a"));
        assert!(!m.is_match("ab"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Matcher::pattern("(").is_err());
    }

    #[test]
    fn test_path_filter() {
        let n = note();
        assert!(NoteFilter::path("^projects/").unwrap().matches(&n));
        assert!(NoteFilter::path("alpha").unwrap().matches(&n));
        assert!(!NoteFilter::path("^alpha").unwrap().matches(&n));
    }

    #[test]
    fn test_key_value_filter() {
        let n = note();
        let key = |k: &str, v: Option<&str>| NoteFilter::Key {
            key: Matcher::exact(k),
            value: v.map(Matcher::exact),
        };
        assert!(key("status", None).matches(&n));
        assert!(key("status", Some("open")).matches(&n));
        assert!(key("owner", Some("sam")).matches(&n));
        assert!(!key("status", Some("closed")).matches(&n));
        assert!(!key("missing", None).matches(&n));
    }

    #[test]
    fn test_tag_filter() {
        let n = note();
        assert!(NoteFilter::Tag(Matcher::exact("project")).matches(&n));
        assert!(NoteFilter::Tag(Matcher::exact("project/alpha")).matches(&n));
        assert!(!NoteFilter::Tag(Matcher::exact("proj")).matches(&n));
        assert!(NoteFilter::Tag(Matcher::pattern("project/.*").unwrap()).matches(&n));
    }

    #[test]
    fn test_scope_intersection() {
        let n = note();
        assert!(Scope::all().matches(&n));
        let scope = Scope::all()
            .with(NoteFilter::path("projects").unwrap())
            .with(NoteFilter::Tag(Matcher::exact("other")));
        assert!(!scope.matches(&n));
        assert!(Scope::document("projects/alpha.md").matches(&n));
    }
}
