use crate::results::{DirResult, FileResult, Summary};
use clap::ValueEnum;
use itertools::Itertools;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[value(alias = "yml")]
    Yaml,
    Json,
    Text,
    /// Rust debug formatting of the result
    Raw,
}

#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("Cannot render JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Renders the whole tree, or only its summary when `all` is false.
pub fn render(result: &DirResult, format: OutputFormat, all: bool) -> Result<String, OutputError> {
    let rendered = match (format, all) {
        (OutputFormat::Yaml, true) => serde_yaml::to_string(result)?,
        (OutputFormat::Yaml, false) => serde_yaml::to_string(&result.summary)?,
        (OutputFormat::Json, true) => serde_json::to_string_pretty(result)?,
        (OutputFormat::Json, false) => serde_json::to_string_pretty(&result.summary)?,
        (OutputFormat::Text, true) => text_tree(result),
        (OutputFormat::Text, false) => text_summary(&result.summary),
        (OutputFormat::Raw, true) => format!("{result:#?}"),
        (OutputFormat::Raw, false) => format!("{:#?}", result.summary),
    };
    Ok(rendered)
}

/// Languages sorted by descending count, then by name.
fn by_count(summary: &Summary) -> impl Iterator<Item = (&String, &usize)> {
    summary
        .iter()
        .sorted_by(|(la, a), (lb, b)| b.cmp(a).then_with(|| la.cmp(lb)))
}

fn text_summary(summary: &Summary) -> String {
    let width = summary
        .keys()
        .map(|lang| lang.chars().count())
        .max()
        .unwrap_or(0)
        .max("Total".len());
    let mut out = String::new();
    for (lang, loc) in by_count(summary) {
        let _ = writeln!(out, "{lang:<width$}  {loc:>9}");
    }
    let total: usize = summary.values().sum();
    let _ = writeln!(out, "{:-<1$}", "", width + 11);
    let _ = writeln!(out, "{:<width$}  {total:>9}", "Total");
    out
}

fn inline_counts(counts: &Summary) -> String {
    by_count(counts)
        .map(|(lang, loc)| format!("{lang}: {loc}"))
        .join(", ")
}

fn write_file(out: &mut String, file: &FileResult, depth: usize) {
    let _ = writeln!(
        out,
        "{:indent$}{} ({})",
        "",
        file.name,
        inline_counts(&file.loc_by_language),
        indent = depth * 2
    );
}

fn write_dir(out: &mut String, dir: &DirResult, depth: usize) {
    let _ = writeln!(
        out,
        "{:indent$}{}/ [{}]",
        "",
        dir.name,
        inline_counts(&dir.summary),
        indent = depth * 2
    );
    for sub in dir.subdirs.iter().sorted_by(|a, b| a.name.cmp(&b.name)) {
        write_dir(out, sub, depth + 1);
    }
    for file in dir.files.iter().sorted_by(|a, b| a.name.cmp(&b.name)) {
        write_file(out, file, depth + 1);
    }
}

fn text_tree(result: &DirResult) -> String {
    let mut out = String::new();
    write_dir(&mut out, result, 0);
    out
}
