use crate::log_sink::LogSink;
use crate::registry::{CommentType, LangRegistry, RegistryError};
use log::Level;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Where the classifier stands between (and within) physical lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineState {
    #[default]
    Initial,
    Code,
    /// Inside a block comment opened by `block_open[opener]`.
    InBlockComment { opener: usize },
}

/// Outcome of a single transition on part of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<'l> {
    pub state: LineState,
    pub rest: &'l str,
    pub counted: bool,
    pub done: bool,
}

fn trim_blanks(s: &str) -> &str {
    s.trim_start_matches([' ', '\t'])
}

/// Earliest occurrence of any of `tokens` in `line`. Ties go to the token
/// listed first.
fn first_token<'t>(line: &str, tokens: &'t [String]) -> Option<(usize, usize, &'t str)> {
    let mut found: Option<(usize, usize, &str)> = None;
    for (i, token) in tokens.iter().enumerate() {
        if let Some(idx) = line.find(token.as_str())
            && found.is_none_or(|(best, _, _)| idx < best)
        {
            found = Some((idx, i, token));
        }
    }
    found
}

/// Pure transition function of the line classifier.
///
/// `line` is what is left of the current physical line, already trimmed of
/// leading spaces and tabs. Callers loop until [`Step::done`].
pub fn step<'l>(state: LineState, comments: &CommentType, line: &'l str) -> Step<'l> {
    if let LineState::InBlockComment { opener } = state {
        return match first_token(line, comments.closers(opener)) {
            Some((idx, _, token)) => Step {
                state: LineState::Code,
                rest: trim_blanks(&line[idx + token.len()..]),
                counted: false,
                done: false,
            },
            None => Step {
                state,
                rest: "",
                counted: false,
                done: true,
            },
        };
    }

    let inline_idx = first_token(line, &comments.line).map_or(line.len(), |(idx, _, _)| idx);
    if line.is_empty() || inline_idx == 0 {
        return Step {
            state: LineState::Code,
            rest: "",
            counted: false,
            done: true,
        };
    }

    match first_token(line, &comments.block_open) {
        Some((block_idx, opener, token)) if block_idx < inline_idx => Step {
            state: LineState::InBlockComment { opener },
            rest: trim_blanks(&line[block_idx + token.len()..]),
            counted: block_idx > 0,
            done: false,
        },
        _ => Step {
            state: LineState::Code,
            rest: "",
            counted: true,
            done: true,
        },
    }
}

/// Runs [`step`] over one physical line. Returns the state to carry into the
/// next line and whether this line is a line of code.
pub fn classify_line(state: LineState, comments: &CommentType, line: &str) -> (LineState, bool) {
    let mut current = Step {
        state,
        rest: trim_blanks(line),
        counted: false,
        done: false,
    };
    let mut counted = false;
    while !current.done {
        current = step(current.state, comments, current.rest);
        counted |= current.counted;
    }
    (current.state, counted)
}

#[derive(thiserror::Error, Debug)]
pub enum CountError {
    #[error(transparent)]
    Language(#[from] RegistryError),
    #[error("Reading {path:?} stopped after {loc} lines of {language}: {source}")]
    Io {
        language: String,
        loc: usize,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Counts the lines of code of one file, threading [`LineState`] from line
/// to line.
pub struct LocCounter<'a> {
    comments: &'a CommentType,
    sink: &'a dyn LogSink,
    state: LineState,
    loc: usize,
    lines: usize,
}

impl<'a> LocCounter<'a> {
    pub fn new(comments: &'a CommentType, sink: &'a dyn LogSink) -> Self {
        Self {
            comments,
            sink,
            state: LineState::Initial,
            loc: 0,
            lines: 0,
        }
    }

    pub fn loc(&self) -> usize {
        self.loc
    }

    pub fn push_line(&mut self, name: &str, line: &str) {
        self.lines += 1;
        let (state, counted) = classify_line(self.state, self.comments, line);
        self.state = state;
        if counted {
            self.loc += 1;
        }
        self.sink.log(
            Level::Trace,
            format_args!(
                "{name}:{} --> {}",
                self.lines,
                if counted { "Counted" } else { "Discarded" }
            ),
        );
    }

    /// Feeds every line of `reader`. On a read error the lines counted so far
    /// stay in [`LocCounter::loc`].
    pub fn count_reader<R: BufRead>(&mut self, name: &str, mut reader: R) -> std::io::Result<usize> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(self.loc);
            }
            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            self.push_line(name, &line);
        }
    }
}

/// Lines of code of one file, tagged with its language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCount {
    pub language: String,
    pub loc: usize,
}

pub fn count_file(
    path: &Path,
    registry: &LangRegistry,
    sink: &dyn LogSink,
) -> Result<FileCount, CountError> {
    let spec = registry.lookup_path(path)?;
    let name = path.display().to_string();
    sink.log(Level::Debug, format_args!("Counting {name} as {}", spec.name));

    let mut counter = LocCounter::new(&spec.comments, sink);
    let result = File::open(path)
        .and_then(|file| counter.count_reader(&name, BufReader::new(file)));
    match result {
        Ok(loc) => Ok(FileCount {
            language: spec.name.clone(),
            loc,
        }),
        Err(source) => Err(CountError::Io {
            language: spec.name.clone(),
            loc: counter.loc(),
            path: path.to_path_buf(),
            source,
        }),
    }
}
