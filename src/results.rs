use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lines of code per language name.
pub type Summary = BTreeMap<String, usize>;

fn add_into(summary: &mut Summary, counts: &Summary) {
    for (lang, loc) in counts {
        *summary.entry(lang.clone()).or_insert(0) += loc;
    }
}

/// Counting results of a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    pub name: String,
    #[serde(rename = "loc")]
    pub loc_by_language: Summary,
}

impl FileResult {
    pub fn new(name: String, language: String, loc: usize) -> Self {
        Self {
            name,
            loc_by_language: BTreeMap::from([(language, loc)]),
        }
    }
}

/// Counting results of a directory and everything under it.
///
/// `summary` always equals the sum of the `loc` of `files` and the
/// `summary` of `subdirs`. The order of `files` and `subdirs` follows the
/// order in which their tasks finished and is not stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subdirs: Vec<DirResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileResult>,
    pub summary: Summary,
}

impl DirResult {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A result standing for a single file given as a root.
    pub fn single_file(file: FileResult) -> Self {
        Self {
            name: file.name.clone(),
            subdirs: Vec::new(),
            summary: file.loc_by_language.clone(),
            files: vec![file],
        }
    }

    pub fn push_file(&mut self, file: FileResult) {
        add_into(&mut self.summary, &file.loc_by_language);
        self.files.push(file);
    }

    pub fn push_subdir(&mut self, dir: DirResult) {
        add_into(&mut self.summary, &dir.summary);
        self.subdirs.push(dir);
    }

    pub fn total_loc(&self) -> usize {
        self.summary.values().sum()
    }

    /// Checks the additivity of `summary` on this node and every node below.
    pub fn is_consistent(&self) -> bool {
        let mut expected = Summary::new();
        for file in &self.files {
            add_into(&mut expected, &file.loc_by_language);
        }
        for dir in &self.subdirs {
            add_into(&mut expected, &dir.summary);
        }
        expected == self.summary && self.subdirs.iter().all(DirResult::is_consistent)
    }

    pub fn find_subdir(&self, name: &str) -> Option<&DirResult> {
        self.subdirs.iter().find(|d| d.name == name)
    }

    pub fn find_file(&self, name: &str) -> Option<&FileResult> {
        self.files.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use crate::results::{DirResult, FileResult};

    #[test]
    fn merge_adds_per_language() {
        let mut sub = DirResult::empty("sub");
        sub.push_file(FileResult::new("b.py".into(), "Python".into(), 1));
        sub.push_file(FileResult::new("c.go".into(), "Go".into(), 4));

        let mut root = DirResult::empty("root");
        root.push_file(FileResult::new("a.go".into(), "Go".into(), 2));
        root.push_subdir(sub);

        assert_eq!(root.summary["Go"], 6);
        assert_eq!(root.summary["Python"], 1);
        assert_eq!(root.total_loc(), 7);
        assert!(root.is_consistent());
        assert_eq!(root.find_subdir("sub").unwrap().summary["Python"], 1);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let files = [
            FileResult::new("a.c".into(), "C".into(), 3),
            FileResult::new("b.rs".into(), "Rust".into(), 5),
            FileResult::new("c.c".into(), "C".into(), 7),
        ];
        let mut forward = DirResult::empty("d");
        files.iter().cloned().for_each(|f| forward.push_file(f));
        let mut backward = DirResult::empty("d");
        files.iter().rev().cloned().for_each(|f| backward.push_file(f));
        assert_eq!(forward.summary, backward.summary);
    }

    #[test]
    fn tampered_summary_is_inconsistent() {
        let mut root = DirResult::empty("root");
        root.push_file(FileResult::new("a.go".into(), "Go".into(), 2));
        root.summary.insert("Go".into(), 3);
        assert!(!root.is_consistent());
    }

    #[test]
    fn zero_counts_keep_the_language_key() {
        let mut root = DirResult::empty("root");
        root.push_file(FileResult::new("empty.go".into(), "Go".into(), 0));
        assert_eq!(root.summary.get("Go"), Some(&0));
    }

    #[test]
    fn single_file_shape() {
        let res = DirResult::single_file(FileResult::new("a.go".into(), "Go".into(), 2));
        assert_eq!(res.name, "a.go");
        assert_eq!(res.files.len(), 1);
        assert!(res.subdirs.is_empty());
        assert_eq!(res.summary["Go"], 2);
    }

    #[test]
    fn serialized_field_names() {
        let mut root = DirResult::empty("root");
        root.push_file(FileResult::new("a.go".into(), "Go".into(), 2));
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["name"], "root");
        assert_eq!(json["files"][0]["loc"]["Go"], 2);
        assert_eq!(json["summary"]["Go"], 2);
        assert!(json.get("subdirs").is_none());
    }
}
