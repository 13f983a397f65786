use crate::registry::{CommentType, LangRegistry, LangSpec, RegistryError};
use serde::{self, Deserialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid Config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid Config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Language name missing")]
    LanguageNameMissing,
    #[error("Comment not defined for {0}")]
    CommentsMissing(String),
    #[error("File extension not defined for {0}")]
    ExtensionMissing(String),
    #[error("Worker count must be at least 1")]
    InvalidJobs,
    #[error("Invalid Config: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CfgCommentType {
    #[serde(default)]
    pub(crate) inline: Vec<String>,
    #[serde(default)]
    pub(crate) block_start: Vec<String>,
    #[serde(default)]
    pub(crate) block_end: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CfgLangEntry {
    pub(crate) name: Option<String>,
    pub(crate) extensions: Option<Vec<String>>,
    pub(crate) comments: Option<CfgCommentType>,
}

impl TryFrom<CfgLangEntry> for LangSpec {
    type Error = ConfigError;

    fn try_from(cfg_lang: CfgLangEntry) -> Result<Self, Self::Error> {
        let name = match cfg_lang.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ConfigError::LanguageNameMissing),
        };
        let extensions = match cfg_lang.extensions {
            Some(extensions) if !extensions.is_empty() => extensions,
            _ => return Err(ConfigError::ExtensionMissing(name)),
        };
        let comments = match cfg_lang.comments {
            Some(c) => CommentType::new(c.inline, c.block_start, c.block_end),
            None => return Err(ConfigError::CommentsMissing(name)),
        };
        Ok(LangSpec::new(name, extensions, comments))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub jobs: Option<usize>,
    #[serde(default)]
    pub(crate) languages: Vec<CfgLangEntry>,
}

impl Config {
    pub fn load(cfg_path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(cfg_path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let cfg: Config = toml::from_str(text)?;
        cfg.validate_jobs()?;
        Ok(cfg)
    }

    fn validate_jobs(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidJobs);
        }
        Ok(())
    }

    /// Built-in languages plus the ones declared in this config.
    pub fn into_registry(self) -> Result<LangRegistry, ConfigError> {
        let mut reg = LangRegistry::builtin();
        for language in self.languages {
            reg.register(language.try_into()?)?;
        }
        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use crate::config_reader::{Config, ConfigError};
    use crate::registry::{ClosingRule, RegistryError};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_config_is_builtins() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.jobs, None);
        let reg = cfg.into_registry().unwrap();
        assert_eq!(reg.lookup("go").unwrap().name, "Go");
    }

    #[test]
    fn custom_language() {
        let cfg = Config::parse(
            r#"
            jobs = 3

            [[languages]]
            name = "Lua"
            extensions = ["lua"]
            [languages.comments]
            inline = ["--"]
            block_start = ["--[["]
            block_end = ["]]"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.jobs, Some(3));
        let reg = cfg.into_registry().unwrap();
        let lua = reg.lookup("lua").unwrap();
        assert_eq!(lua.name, "Lua");
        assert_eq!(lua.comments.line, ["--".to_string()]);
        assert_eq!(lua.comments.closing_rule(0), Some(&ClosingRule::AnyDeclared));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [[languages]]
            name = "Lisp"
            extensions = ["lisp", "el"]
            [languages.comments]
            inline = [";"]
            "#
        )
        .unwrap();
        let reg = Config::load(file.path()).unwrap().into_registry().unwrap();
        assert_eq!(reg.lookup("el").unwrap().name, "Lisp");
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = Config::load(&dir.path().join("absent.toml"));
        assert!(matches!(res, Err(ConfigError::Io(_))));
    }

    #[test]
    fn bad_toml() {
        assert!(matches!(Config::parse("jobs = ["), Err(ConfigError::Toml(_))));
        assert!(matches!(Config::parse("colour = 1"), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn zero_jobs() {
        assert!(matches!(Config::parse("jobs = 0"), Err(ConfigError::InvalidJobs)));
    }

    #[test]
    fn missing_fields() {
        let no_name = Config::parse("[[languages]]\nextensions = [\"x\"]\n[languages.comments]\n")
            .unwrap()
            .into_registry();
        assert!(matches!(no_name, Err(ConfigError::LanguageNameMissing)));

        let no_ext = Config::parse("[[languages]]\nname = \"X\"\n[languages.comments]\n")
            .unwrap()
            .into_registry();
        assert!(matches!(no_ext, Err(ConfigError::ExtensionMissing(n)) if n == "X"));

        let no_comments = Config::parse("[[languages]]\nname = \"X\"\nextensions = [\"x\"]\n")
            .unwrap()
            .into_registry();
        assert!(matches!(no_comments, Err(ConfigError::CommentsMissing(n)) if n == "X"));
    }

    #[test]
    fn clashing_extension() {
        let res = Config::parse(
            r#"
            [[languages]]
            name = "Objective-C"
            extensions = ["m"]
            [languages.comments]
            inline = ["//"]
            "#,
        )
        .unwrap()
        .into_registry();
        assert!(matches!(
            res,
            Err(ConfigError::Registry(RegistryError::DuplicateExtension { .. }))
        ));
    }
}
