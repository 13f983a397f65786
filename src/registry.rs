use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Cannot deduce a supported language from {0:?}")]
    UnsupportedLanguage(String),
    #[error("Extension {extension:?} of {language} is already claimed by {existing}")]
    DuplicateExtension {
        extension: String,
        language: String,
        existing: String,
    },
    #[error("Language {0} declares no extensions")]
    MissingExtension(String),
    #[error("Language {0} declares an empty comment token")]
    EmptyToken(String),
    #[error("Language {0} must declare both block comment start and end tokens, or neither")]
    UnbalancedBlockTokens(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LangId(usize);

/// Which end tokens may close a block comment opened by a given start token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosingRule {
    /// The start token read backwards is itself a declared end token, e.g.
    /// `(*` / `*)`. Only that token closes the comment.
    Reversed(String),
    /// Any declared end token closes the comment, e.g. `=begin` / `=end`.
    AnyDeclared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentType {
    pub line: Vec<String>,
    pub block_open: Vec<String>,
    pub block_close: Vec<String>,
    closing: Vec<ClosingRule>,
}

impl CommentType {
    pub fn new(line: Vec<String>, block_open: Vec<String>, block_close: Vec<String>) -> Self {
        let closing = block_open
            .iter()
            .map(|open| {
                let reversed: String = open.chars().rev().collect();
                if block_close.contains(&reversed) {
                    ClosingRule::Reversed(reversed)
                } else {
                    ClosingRule::AnyDeclared
                }
            })
            .collect();
        Self {
            line,
            block_open,
            block_close,
            closing,
        }
    }

    /// Tokens able to close a comment opened by `block_open[opener]`.
    pub fn closers(&self, opener: usize) -> &[String] {
        match self.closing.get(opener) {
            Some(ClosingRule::Reversed(token)) => std::slice::from_ref(token),
            _ => &self.block_close,
        }
    }

    pub fn closing_rule(&self, opener: usize) -> Option<&ClosingRule> {
        self.closing.get(opener)
    }

    fn tokens(&self) -> impl Iterator<Item = &String> {
        self.line
            .iter()
            .chain(self.block_open.iter())
            .chain(self.block_close.iter())
    }
}

/// Everything needed to count the lines of code of one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangSpec {
    pub name: String,
    pub extensions: Vec<String>,
    pub comments: CommentType,
}

impl LangSpec {
    pub fn new(name: String, extensions: Vec<String>, comments: CommentType) -> Self {
        Self {
            name,
            extensions,
            comments,
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.extensions.is_empty() {
            return Err(RegistryError::MissingExtension(self.name.clone()));
        }
        if self.comments.tokens().any(String::is_empty) {
            return Err(RegistryError::EmptyToken(self.name.clone()));
        }
        if self.comments.block_open.is_empty() != self.comments.block_close.is_empty() {
            return Err(RegistryError::UnbalancedBlockTokens(self.name.clone()));
        }
        Ok(())
    }
}

struct Builtin {
    name: &'static str,
    extensions: &'static [&'static str],
    line: &'static [&'static str],
    block_open: &'static [&'static str],
    block_close: &'static [&'static str],
}

const C_LINE: &[&str] = &["//"];
const C_OPEN: &[&str] = &["/*"];
const C_CLOSE: &[&str] = &["*/"];
const HASH: &[&str] = &["#"];
const NONE: &[&str] = &[];

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "Assembly",
        extensions: &["asm", "s", "S"],
        // NASM flavour; other assemblers differ
        line: &[";"],
        block_open: NONE,
        block_close: NONE,
    },
    Builtin {
        name: "C",
        extensions: &["c", "h"],
        line: C_LINE,
        block_open: C_OPEN,
        block_close: C_CLOSE,
    },
    Builtin {
        name: "C++",
        extensions: &["cc", "hh", "C", "H", "cpp", "hpp", "cxx", "hxx", "c++", "h++"],
        line: C_LINE,
        block_open: C_OPEN,
        block_close: C_CLOSE,
    },
    Builtin {
        name: "D",
        extensions: &["d"],
        line: &["//", "///"],
        block_open: &["/*", "/+"],
        block_close: &["*/", "+/"],
    },
    Builtin {
        name: "Dockerfile",
        extensions: &["Dockerfile", "dockerfile"],
        line: HASH,
        block_open: NONE,
        block_close: NONE,
    },
    Builtin {
        name: "Go",
        extensions: &["go"],
        line: C_LINE,
        block_open: C_OPEN,
        block_close: C_CLOSE,
    },
    Builtin {
        name: "Haskell",
        extensions: &["hs", "lhs"],
        line: &["--"],
        block_open: &["{-"],
        block_close: &["-}"],
    },
    Builtin {
        name: "HTML",
        extensions: &["html", "htm"],
        line: NONE,
        block_open: &["<!--"],
        block_close: &["-->"],
    },
    Builtin {
        name: "Java",
        extensions: &["java"],
        line: C_LINE,
        block_open: &["/*", "/**"],
        block_close: C_CLOSE,
    },
    Builtin {
        name: "Javascript",
        extensions: &["js"],
        line: C_LINE,
        block_open: C_OPEN,
        block_close: C_CLOSE,
    },
    Builtin {
        name: "Kotlin",
        extensions: &["kt", "kts"],
        line: C_LINE,
        block_open: C_OPEN,
        block_close: C_CLOSE,
    },
    Builtin {
        name: "Makefile",
        extensions: &["Makefile", "mk"],
        line: HASH,
        block_open: NONE,
        block_close: NONE,
    },
    Builtin {
        name: "Matlab",
        extensions: &["m"],
        line: &["%"],
        block_open: &["%{"],
        block_close: &["%}"],
    },
    Builtin {
        name: "OCaml",
        extensions: &["ml", "mli"],
        line: NONE,
        block_open: &["(*"],
        block_close: &["*)"],
    },
    Builtin {
        name: "PHP",
        extensions: &["php"],
        line: &["#", "//"],
        block_open: &["/*", "/**"],
        block_close: C_CLOSE,
    },
    Builtin {
        name: "Python",
        extensions: &["py"],
        line: HASH,
        block_open: &["\"\"\"", "'''"],
        block_close: &["\"\"\"", "'''"],
    },
    Builtin {
        name: "Ruby",
        extensions: &["rb"],
        line: HASH,
        block_open: &["=begin"],
        block_close: &["=end"],
    },
    Builtin {
        name: "Rust",
        extensions: &["rs", "rlib"],
        line: &["//", "///", "//!"],
        block_open: &["/*", "/**", "/*!"],
        block_close: C_CLOSE,
    },
    Builtin {
        name: "Shell",
        extensions: &["sh", "bash", "zsh", "ksh", "csh"],
        line: HASH,
        block_open: NONE,
        block_close: NONE,
    },
    Builtin {
        name: "SML",
        extensions: &["sml"],
        line: NONE,
        block_open: &["(*"],
        block_close: &["*)"],
    },
];

fn owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(ToString::to_string).collect()
}

impl From<&Builtin> for LangSpec {
    fn from(builtin: &Builtin) -> Self {
        LangSpec::new(
            builtin.name.to_string(),
            owned(builtin.extensions),
            CommentType::new(
                owned(builtin.line),
                owned(builtin.block_open),
                owned(builtin.block_close),
            ),
        )
    }
}

/// Basenames without an extension that still name a language.
const BASENAME_PREFIXES: &[&str] = &["Makefile", "Dockerfile"];

/// Returns the registry key of `path`: the text after the last `.` of the
/// file name, or a pseudo-extension such as `Makefile` for well-known
/// extension-less names.
pub fn language_key(path: &Path) -> Option<&str> {
    let base = path.file_name().and_then(OsStr::to_str)?;
    match base.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => BASENAME_PREFIXES
            .iter()
            .copied()
            .find(|prefix| base.starts_with(prefix)),
    }
}

/// Read-only after construction; shared by reference between walker tasks.
#[derive(Debug, Default)]
pub struct LangRegistry {
    entries: Vec<LangSpec>,
    map_ext_id: HashMap<String, LangId>,
}

impl LangRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut reg = LangRegistry::new();
        for builtin in BUILTINS {
            let spec = LangSpec::from(builtin);
            debug_assert!(spec.validate().is_ok(), "invalid builtin {}", spec.name);
            debug_assert!(
                spec.extensions
                    .iter()
                    .all(|ext| !reg.map_ext_id.contains_key(ext)),
                "builtin {} reuses an extension",
                spec.name
            );
            reg.add_entry(spec);
        }
        reg
    }

    fn add_entry(&mut self, spec: LangSpec) {
        let id = LangId(self.entries.len());
        for ext in &spec.extensions {
            self.map_ext_id.insert(ext.clone(), id);
        }
        self.entries.push(spec);
    }

    /// Adds `spec`, refusing any extension another language already claims.
    pub fn register(&mut self, spec: LangSpec) -> Result<(), RegistryError> {
        spec.validate()?;
        let mut seen = Vec::with_capacity(spec.extensions.len());
        for ext in &spec.extensions {
            let existing = match self.map_ext_id.get(ext) {
                Some(id) => Some(self.entries[id.0].name.clone()),
                None if seen.contains(&ext) => Some(spec.name.clone()),
                None => None,
            };
            if let Some(existing) = existing {
                return Err(RegistryError::DuplicateExtension {
                    extension: ext.clone(),
                    language: spec.name.clone(),
                    existing,
                });
            }
            seen.push(ext);
        }
        self.add_entry(spec);
        Ok(())
    }

    pub fn lookup(&self, key: &str) -> Result<&LangSpec, RegistryError> {
        self.map_ext_id
            .get(key)
            .map(|id| &self.entries[id.0])
            .ok_or_else(|| RegistryError::UnsupportedLanguage(key.to_string()))
    }

    pub fn lookup_path(&self, path: &Path) -> Result<&LangSpec, RegistryError> {
        let key = language_key(path).ok_or_else(|| {
            RegistryError::UnsupportedLanguage(path.to_string_lossy().into_owned())
        })?;
        self.lookup(key)
    }

    pub fn languages(&self) -> impl Iterator<Item = &LangSpec> {
        self.entries.iter()
    }
}
