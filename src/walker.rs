use crate::analysis::{CountError, count_file};
use crate::log_sink::{LogSink, NoopSink};
use crate::registry::LangRegistry;
use crate::results::{DirResult, FileResult};
use crossbeam_channel::Sender;
use log::Level;
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Directories with this name are never entered.
pub const SKIPPED_DIR: &str = ".git";
/// Name of the synthetic node wrapping several roots.
pub const TOTAL: &str = "TOTAL";

#[derive(thiserror::Error, Debug)]
pub enum WalkerError {
    #[error("Cannot build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Upper bound on files and directories processed at the same time.
    pub jobs: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            jobs: num_cpus::get(),
        }
    }
}

enum Child {
    Dir(PathBuf),
    File(PathBuf),
}

fn base_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Where a finished directory is merged.
#[derive(Clone, Copy)]
enum Parent {
    Root(usize),
    Dir(usize),
}

/// A directory whose children have not all reported back yet.
struct PendingDir {
    result: DirResult,
    parent: Parent,
    waiting: usize,
}

/// Sent by pool tasks back to the thread driving a traversal.
enum Event {
    Listed { dir: usize, children: Vec<Child> },
    Counted { dir: usize, file: Option<FileResult> },
    RootFile { root: usize, file: Option<FileResult> },
}

/// What to do with a root once it has been resolved and stat'ed.
enum RootKind {
    Done(DirResult),
    Dir(PathBuf, String),
    File(PathBuf),
}

struct RootSlot {
    given: String,
    start: Instant,
    result: Option<DirResult>,
}

/// State of one call to [`Walker::count_roots`].
///
/// Pool tasks only list a directory or count a file and send an [`Event`];
/// merging happens on the driving thread. A directory is merged into its
/// parent once its last child has reported, so nothing recurses with the
/// depth of the tree.
struct Traversal<'w> {
    walker: &'w Walker,
    tx: Sender<Event>,
    dirs: Vec<PendingDir>,
    roots: Vec<RootSlot>,
    in_flight: usize,
}

impl<'w> Traversal<'w> {
    fn new(walker: &'w Walker, tx: Sender<Event>) -> Self {
        Self {
            walker,
            tx,
            dirs: Vec::new(),
            roots: Vec::new(),
            in_flight: 0,
        }
    }

    fn open_dir(&mut self, name: String, parent: Parent) -> usize {
        self.dirs.push(PendingDir {
            result: DirResult::empty(name),
            parent,
            waiting: 0,
        });
        self.dirs.len() - 1
    }

    fn list<'s>(&mut self, scope: &Scope<'s>, dir: usize, path: PathBuf)
    where
        'w: 's,
    {
        let walker = self.walker;
        let tx = self.tx.clone();
        self.in_flight += 1;
        scope.spawn(move |_| {
            let children = walker.list_children(&path);
            // the receiver lives until every task has reported
            let _ = tx.send(Event::Listed { dir, children });
        });
    }

    fn count<'s>(&mut self, scope: &Scope<'s>, dir: usize, path: PathBuf)
    where
        'w: 's,
    {
        let walker = self.walker;
        let tx = self.tx.clone();
        self.in_flight += 1;
        scope.spawn(move |_| {
            let file = walker.count_one(&path);
            let _ = tx.send(Event::Counted { dir, file });
        });
    }

    fn count_root_file<'s>(&mut self, scope: &Scope<'s>, root: usize, path: PathBuf)
    where
        'w: 's,
    {
        let walker = self.walker;
        let tx = self.tx.clone();
        self.in_flight += 1;
        scope.spawn(move |_| {
            let file = walker.count_one(&path);
            let _ = tx.send(Event::RootFile { root, file });
        });
    }

    fn start_root<'s>(&mut self, scope: &Scope<'s>, root: &Path)
    where
        'w: 's,
    {
        let index = self.roots.len();
        self.roots.push(RootSlot {
            given: root.display().to_string(),
            start: Instant::now(),
            result: None,
        });
        match self.walker.resolve_root(root) {
            RootKind::Done(result) => self.finish_root(index, result),
            RootKind::File(path) => self.count_root_file(scope, index, path),
            RootKind::Dir(path, name) => {
                let dir = self.open_dir(name, Parent::Root(index));
                self.list(scope, dir, path);
            }
        }
    }

    fn handle<'s>(&mut self, scope: &Scope<'s>, event: Event)
    where
        'w: 's,
    {
        match event {
            Event::Listed { dir, children } => {
                self.dirs[dir].waiting = children.len();
                for child in children {
                    match child {
                        Child::Dir(path) => {
                            let sub = self.open_dir(base_name(&path), Parent::Dir(dir));
                            self.list(scope, sub, path);
                        }
                        Child::File(path) => self.count(scope, dir, path),
                    }
                }
                self.settle(dir);
            }
            Event::Counted { dir, file } => {
                if let Some(file) = file {
                    self.dirs[dir].result.push_file(file);
                }
                self.dirs[dir].waiting -= 1;
                self.settle(dir);
            }
            Event::RootFile { root, file } => {
                let given = &self.roots[root].given;
                let result =
                    file.map_or_else(|| DirResult::empty(given.clone()), DirResult::single_file);
                self.finish_root(root, result);
            }
        }
    }

    /// Merges `dir` upwards for as long as directories run out of children.
    fn settle(&mut self, mut dir: usize) {
        while self.dirs[dir].waiting == 0 {
            let result = std::mem::take(&mut self.dirs[dir].result);
            match self.dirs[dir].parent {
                Parent::Root(root) => {
                    self.finish_root(root, result);
                    return;
                }
                Parent::Dir(parent) => {
                    let pending = &mut self.dirs[parent];
                    pending.result.push_subdir(result);
                    pending.waiting -= 1;
                    dir = parent;
                }
            }
        }
    }

    fn finish_root(&mut self, root: usize, result: DirResult) {
        let slot = &mut self.roots[root];
        self.walker.sink.log(
            Level::Info,
            format_args!("Time elapsed for {:?}: {:?}", slot.given, slot.start.elapsed()),
        );
        slot.result = Some(result);
    }

    fn into_results(self) -> Vec<DirResult> {
        self.roots
            .into_iter()
            .map(|slot| slot.result.unwrap_or_else(|| DirResult::empty(slot.given)))
            .collect()
    }
}

/// Counts lines of code over file trees.
///
/// Listing a directory and counting a file are separate tasks on a pool of
/// [`WalkOptions::jobs`] threads; the calling thread merges their results
/// into the tree. Failures are logged to the sink and never abort sibling
/// work.
pub struct Walker {
    registry: LangRegistry,
    sink: Arc<dyn LogSink>,
    pool: ThreadPool,
}

impl Walker {
    pub fn new(registry: LangRegistry) -> Result<Self, WalkerError> {
        Self::with_options(registry, WalkOptions::default(), Arc::new(NoopSink))
    }

    pub fn with_options(
        registry: LangRegistry,
        options: WalkOptions,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, WalkerError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.jobs.max(1))
            .thread_name(|i| format!("loctree-{i}"))
            .build()?;
        Ok(Self {
            registry,
            sink,
            pool,
        })
    }

    pub fn jobs(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn count_lines_of_code(&self, root: impl AsRef<Path>) -> DirResult {
        let root = root.as_ref();
        self.count_paths(&[root])
            .into_iter()
            .next()
            .unwrap_or_else(|| DirResult::empty(root.display().to_string()))
    }

    /// Counts every root concurrently and wraps the results in a
    /// [`TOTAL`] node, keeping the roots in the given order.
    pub fn count_roots<P: AsRef<Path>>(&self, roots: &[P]) -> DirResult {
        let roots: Vec<&Path> = roots.iter().map(AsRef::as_ref).collect();
        let mut total = DirResult::empty(TOTAL);
        for result in self.count_paths(&roots) {
            total.push_subdir(result);
        }
        total
    }

    fn count_paths(&self, roots: &[&Path]) -> Vec<DirResult> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut traversal = Traversal::new(self, tx);
        // the closure runs on the calling thread, only spawned tasks use the pool
        self.pool.in_place_scope(|scope| {
            for root in roots {
                traversal.start_root(scope, root);
            }
            while traversal.in_flight > 0 {
                let Ok(event) = rx.recv() else { break };
                traversal.in_flight -= 1;
                traversal.handle(scope, event);
            }
        });
        traversal.into_results()
    }

    fn resolve_root(&self, root: &Path) -> RootKind {
        let given = root.display().to_string();
        let path = match std::path::absolute(root) {
            Ok(path) => path,
            Err(err) => {
                self.sink
                    .log(Level::Error, format_args!("Cannot resolve {given:?}: {err}"));
                return RootKind::Done(DirResult::empty(given));
            }
        };
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                self.sink
                    .log(Level::Error, format_args!("Cannot stat {}: {err}", path.display()));
                return RootKind::Done(DirResult::empty(given));
            }
        };

        if metadata.is_dir() {
            let name = path.display().to_string();
            if path.file_name().is_some_and(|n| n == SKIPPED_DIR) {
                self.sink.log(Level::Info, format_args!("Skipping {name}"));
                return RootKind::Done(DirResult::empty(name));
            }
            RootKind::Dir(path, name)
        } else if metadata.is_file() {
            RootKind::File(path)
        } else {
            self.sink.log(
                Level::Info,
                format_args!("Skipping non-regular and non-directory file {given:?}"),
            );
            RootKind::Done(DirResult::empty(given))
        }
    }

    /// Immediate children of `path`, without following symlinks.
    fn list_children(&self, path: &Path) -> Vec<Child> {
        let mut children = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    self.sink.log(Level::Error, format_args!("{err}"));
                    continue;
                }
            };
            let file_type = entry.file_type();
            if file_type.is_dir() {
                if entry.file_name() == SKIPPED_DIR {
                    self.sink
                        .log(Level::Info, format_args!("Skipping {}", entry.path().display()));
                    continue;
                }
                children.push(Child::Dir(entry.into_path()));
            } else if file_type.is_file() {
                children.push(Child::File(entry.into_path()));
            } else {
                self.sink.log(
                    Level::Info,
                    format_args!(
                        "Skipping non-regular and non-directory file {}",
                        entry.path().display()
                    ),
                );
            }
        }
        children
    }

    fn count_one(&self, path: &Path) -> Option<FileResult> {
        let name = base_name(path);
        match count_file(path, &self.registry, self.sink.as_ref()) {
            Ok(count) => Some(FileResult::new(name, count.language, count.loc)),
            Err(CountError::Language(err)) => {
                self.sink
                    .log(Level::Debug, format_args!("{}: {err}", path.display()));
                None
            }
            Err(CountError::Io {
                language,
                loc,
                source,
                ..
            }) => {
                self.sink.log(
                    Level::Error,
                    format_args!(
                        "Reading {} stopped after {loc} lines: {source}",
                        path.display()
                    ),
                );
                Some(FileResult::new(name, language, loc))
            }
        }
    }
}
