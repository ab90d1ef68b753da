use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mirror_tools::command::{CommandError, CommandOutput, CommandRunner, Invocation};
use mirror_tools::schedule::Clock;

/// Lays out a mirror tree and hands back its canonical root.
pub struct MirrorTree {
    _dir: tempfile::TempDir,
    pub root: PathBuf,
}

impl MirrorTree {
    pub fn new(repos: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        for repo in repos {
            fs::create_dir_all(root.join(repo).join("refs")).unwrap();
        }
        Self { _dir: dir, root }
    }

    pub fn repo(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn status_file(&self) -> PathBuf {
        self.root.join("status.json")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Sleep(Duration),
    Run(PathBuf),
}

/// Clock that advances only when slept on, and a runner that fails for a chosen
/// set of repositories. Both log into the same event list so tests can check
/// the interleaving of pauses and updates.
pub struct Harness {
    now: Cell<i64>,
    pub events: RefCell<Vec<Event>>,
    failing: Vec<PathBuf>,
}

impl Harness {
    pub fn new(now: i64) -> Self {
        Self {
            now: Cell::new(now),
            events: RefCell::new(vec![]),
            failing: vec![],
        }
    }

    pub fn failing(mut self, repo: impl AsRef<Path>) -> Self {
        self.failing.push(repo.as_ref().to_path_buf());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }
}

impl Clock for Harness {
    fn now(&self) -> i64 {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.events.borrow_mut().push(Event::Sleep(duration));
        self.now.set(self.now.get() + duration.as_secs() as i64);
    }
}

impl CommandRunner for Harness {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        self.events
            .borrow_mut()
            .push(Event::Run(invocation.working_dir.clone()));
        self.now.set(self.now.get() + 1);
        if self.failing.contains(&invocation.working_dir) {
            Err(CommandError::Failed {
                program: invocation.program_name(),
                code: Some(128),
            })
        } else {
            Ok(CommandOutput::default())
        }
    }
}
