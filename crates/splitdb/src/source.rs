//! Source pane rendering and the `list` operation.
//!
//! A file is read through a [`LineCache`] and tokenized once per version.
//! Margin decoration is memoized on the breakpoint set and the current line,
//! so cursor movement and redraws only slice already-built lines.

use crate::error::FrontendError;
use crate::theme::{StyleTag, StyledLine};
use crate::ui::highlight::Highlighter;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Source lines of a file, with a version that changes on every re-read
pub trait LineCache {
    fn lines(&mut self, file: &Path) -> Result<(Rc<Vec<String>>, u64), FrontendError>;
}

#[derive(Debug)]
struct CachedFile {
    lines: Rc<Vec<String>>,
    size: u64,
    modified: Option<SystemTime>,
    version: u64,
}

/// Reads from disk, re-reading when size or modification time changed
#[derive(Debug, Default)]
pub struct FsLineCache {
    files: HashMap<PathBuf, CachedFile>,
    next_version: u64,
}

impl FsLineCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineCache for FsLineCache {
    fn lines(&mut self, file: &Path) -> Result<(Rc<Vec<String>>, u64), FrontendError> {
        let unavailable = |e: std::io::Error| FrontendError::FileUnavailable {
            path: file.to_path_buf(),
            reason: e.to_string(),
        };
        let meta = fs::metadata(file).map_err(unavailable)?;
        let size = meta.len();
        let modified = meta.modified().ok();

        if let Some(cached) = self.files.get(file)
            && cached.size == size
            && cached.modified == modified
        {
            return Ok((Rc::clone(&cached.lines), cached.version));
        }

        let content = fs::read_to_string(file).map_err(unavailable)?;
        let lines: Rc<Vec<String>> = Rc::new(content.lines().map(String::from).collect());
        self.next_version += 1;
        let version = self.next_version;
        debug!(file = %file.display(), lines = lines.len(), version, "loaded source file");

        self.files.insert(
            file.to_path_buf(),
            CachedFile {
                lines: Rc::clone(&lines),
                size,
                modified,
                version,
            },
        );
        Ok((lines, version))
    }
}

/// The three-cell margin plus right-aligned line number
pub fn margin(line_number: usize, is_break: bool, is_current: bool) -> StyledLine {
    let mut out = StyledLine::new();
    match (is_break, is_current) {
        (true, true) => {
            out.push(StyleTag::Break, "B");
            out.push(StyleTag::CurrentLine, "->");
        }
        (true, false) => out.push(StyleTag::Break, " B "),
        (false, true) => {
            out.push(StyleTag::CurrentLine, "->");
            out.push(StyleTag::Text, " ");
        }
        (false, false) => out.push(StyleTag::Text, "   "),
    }
    out.push(StyleTag::LineNumber, format!("{:>3} ", line_number));
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MarginKey {
    file: PathBuf,
    version: u64,
    breaks: BTreeSet<usize>,
    current: Option<usize>,
}

/// Renders a window of a source file with the breakpoint margin
pub struct SourceView<L: LineCache = FsLineCache> {
    cache: L,
    highlighter: Box<dyn Highlighter>,
    tokenized: HashMap<PathBuf, (u64, Rc<Vec<StyledLine>>)>,
    decorated: Option<(MarginKey, Rc<Vec<StyledLine>>)>,
    tokenize_passes: usize,
    margin_builds: usize,
}

impl SourceView<FsLineCache> {
    pub fn new(highlighter: Box<dyn Highlighter>) -> Self {
        Self::with_cache(FsLineCache::new(), highlighter)
    }
}

impl<L: LineCache> SourceView<L> {
    pub fn with_cache(cache: L, highlighter: Box<dyn Highlighter>) -> Self {
        Self {
            cache,
            highlighter,
            tokenized: HashMap::new(),
            decorated: None,
            tokenize_passes: 0,
            margin_builds: 0,
        }
    }

    /// Raw lines of `file`
    pub fn lines(&mut self, file: &Path) -> Result<Rc<Vec<String>>, FrontendError> {
        self.cache.lines(file).map(|(lines, _)| lines)
    }

    /// Number of lines in `file`, zero when unreadable
    pub fn line_count(&mut self, file: &Path) -> usize {
        self.lines(file).map(|l| l.len()).unwrap_or(0)
    }

    /// How many whole-file tokenizations have run
    pub fn tokenize_passes(&self) -> usize {
        self.tokenize_passes
    }

    /// How many times the margin was rebuilt
    pub fn margin_builds(&self) -> usize {
        self.margin_builds
    }

    fn tokenized(&mut self, file: &Path) -> Result<(Rc<Vec<StyledLine>>, u64), FrontendError> {
        let (lines, version) = self.cache.lines(file)?;
        if let Some((cached_version, tokens)) = self.tokenized.get(file)
            && *cached_version == version
        {
            return Ok((Rc::clone(tokens), version));
        }

        let text = lines.join("\n");
        let mut out = vec![StyledLine::new()];
        for (tag, fragment) in self.highlighter.tokenize(&text) {
            let mut parts = fragment.split('\n');
            if let Some(first) = parts.next()
                && !first.is_empty()
                && let Some(line) = out.last_mut()
            {
                line.push(tag, first);
            }
            for part in parts {
                let mut line = StyledLine::new();
                if !part.is_empty() {
                    line.push(tag, part);
                }
                out.push(line);
            }
        }
        out.truncate(lines.len());
        out.resize(lines.len(), StyledLine::new());

        self.tokenize_passes += 1;
        let out = Rc::new(out);
        self.tokenized
            .insert(file.to_path_buf(), (version, Rc::clone(&out)));
        Ok((out, version))
    }

    fn decorated(
        &mut self,
        file: &Path,
        breaks: &BTreeSet<usize>,
        current: Option<usize>,
    ) -> Result<Rc<Vec<StyledLine>>, FrontendError> {
        let (tokens, version) = self.tokenized(file)?;
        let key = MarginKey {
            file: file.to_path_buf(),
            version,
            breaks: breaks.clone(),
            current,
        };
        if let Some((cached_key, lines)) = &self.decorated
            && *cached_key == key
        {
            return Ok(Rc::clone(lines));
        }

        let lines: Vec<StyledLine> = tokens
            .iter()
            .enumerate()
            .map(|(i, body)| {
                let number = i + 1;
                let mut line = margin(number, breaks.contains(&number), current == Some(number));
                line.0.extend(body.0.iter().cloned());
                line
            })
            .collect();
        self.margin_builds += 1;
        let lines = Rc::new(lines);
        self.decorated = Some((key, Rc::clone(&lines)));
        Ok(lines)
    }

    /// Render the zero-based line `window` of `file`.
    ///
    /// An unreadable file renders as a single error line.
    pub fn render(
        &mut self,
        file: &Path,
        window: Range<usize>,
        breaks: &BTreeSet<usize>,
        current: Option<usize>,
    ) -> Vec<StyledLine> {
        match self.decorated(file, breaks, current) {
            Ok(lines) => {
                let end = window.end.min(lines.len());
                let start = window.start.min(end);
                lines[start..end].to_vec()
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "source unavailable");
                vec![StyledLine::tagged(StyleTag::Error, e.to_string())]
            }
        }
    }
}

/// Result of one `list` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub first: usize,
    pub last: usize,
    /// `(line number, text)` for every listed line that exists
    pub lines: Vec<(usize, String)>,
    /// The requested range ran past the end of the file
    pub eof: bool,
}

/// Tracks where the previous `list` stopped
#[derive(Debug, Clone, Default)]
pub struct Lister {
    last_listed: Option<usize>,
}

impl Lister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous listing, called on every new stop
    pub fn reset(&mut self) {
        self.last_listed = None;
    }

    pub fn last_listed(&self) -> Option<usize> {
        self.last_listed
    }

    /// List `lines` (1-based, inclusive range) according to `arg`
    pub fn list(
        &mut self,
        arg: &str,
        lines: &[String],
        current: usize,
    ) -> Result<Listing, FrontendError> {
        let arg = arg.trim();
        let parse = |s: &str| {
            s.trim()
                .parse::<usize>()
                .map_err(|_| FrontendError::ArgumentParse {
                    arg: arg.to_string(),
                })
        };

        let (first, last) = if !arg.is_empty() && arg != "." {
            match arg.split_once(',') {
                Some((a, b)) => {
                    let first = parse(a)?;
                    let mut last = parse(b)?;
                    if last < first {
                        last = last.saturating_add(first);
                    }
                    (first, last)
                }
                None => {
                    let first = parse(arg)?.saturating_sub(5).max(1);
                    (first, first.saturating_add(10))
                }
            }
        } else {
            let first = match (arg, self.last_listed) {
                ("", Some(previous)) => previous.saturating_add(1),
                _ => current.saturating_sub(5).max(1),
            };
            (first, first.saturating_add(10))
        };

        let end = last.min(lines.len());
        let listed: Vec<(usize, String)> = (first..=end)
            .filter(|n| *n >= 1)
            .map(|n| (n, lines[n - 1].clone()))
            .collect();
        self.last_listed = Some(end.max(first.saturating_sub(1)));

        Ok(Listing {
            first,
            last,
            lines: listed,
            eof: lines.len() < last,
        })
    }
}
