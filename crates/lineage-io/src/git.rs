//! Revision history backed by the `git` binary.
//!
//! Revisions are commit shas; content hashes are git object ids (blob ids
//! for files, tree ids for directories). The first-parent chain from `HEAD`
//! is treated as the linear project history.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use lineage_core::id::RevisionId;
use lineage_core::path::normalize;
use lineage_core::provider::{
    Change, ChangeKind, Commit, ProviderError, ProviderResult, RevisionHistory, TreeEntry,
};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct GitHistory {
    root: PathBuf,
}

impl GitHistory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open `root`, failing unless it is inside a git work tree.
    pub fn open(root: impl Into<PathBuf>) -> ProviderResult<Self> {
        let history = Self::new(root);
        let out = history.run("open", &["rev-parse", "--is-inside-work-tree"])?;
        if !out.status.success() {
            return Err(ProviderError::new(
                "open",
                format!(
                    "{} is not a git work tree: {}",
                    history.root.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ));
        }
        Ok(history)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, op: &str, args: &[&str]) -> ProviderResult<Output> {
        trace!(op, ?args, "git");
        Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .map_err(|err| ProviderError::new(op, format!("git execution failed: {err}")))
    }

    /// Stdout of a command that must succeed.
    fn stdout(&self, op: &str, args: &[&str]) -> ProviderResult<String> {
        let out = self.run(op, args)?;
        if !out.status.success() {
            return Err(ProviderError::new(
                op,
                format!(
                    "git {} failed: {}",
                    args.first().copied().unwrap_or(""),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    /// Trimmed stdout, or `None` when git exits non-zero (object missing).
    fn lookup(&self, op: &str, args: &[&str]) -> ProviderResult<Option<String>> {
        let out = self.run(op, args)?;
        if !out.status.success() {
            return Ok(None);
        }
        let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
        Ok(if s.is_empty() { None } else { Some(s) })
    }
}

/// `<rev>:<path>`, or the root tree for `.`.
fn object_spec(revision: &RevisionId, path: &str) -> String {
    let path = normalize(path);
    if path == "." {
        format!("{revision}^{{tree}}")
    } else {
        format!("{revision}:{path}")
    }
}

impl RevisionHistory for GitHistory {
    fn commits(&self, since: Option<&RevisionId>) -> ProviderResult<Vec<Commit>> {
        if self.tip()?.is_none() {
            return Ok(Vec::new());
        }
        let range = match since {
            Some(rev) => format!("{rev}..HEAD"),
            None => "HEAD".to_string(),
        };
        let out = self.stdout(
            "commits",
            &["log", "--reverse", "--first-parent", "--format=%H %P %ct", &range],
        )?;
        let mut commits = Vec::new();
        for line in out.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (Some(sha), Some(ts)) = (fields.first(), fields.last()) else {
                continue;
            };
            let parent = if fields.len() > 2 {
                Some(RevisionId::new(fields[1]))
            } else {
                None
            };
            let seconds: u64 = ts.parse().map_err(|_| {
                ProviderError::new("commits", format!("bad commit timestamp '{ts}'"))
            })?;
            commits.push(Commit {
                revision: RevisionId::new(*sha),
                parent,
                timestamp_ms: seconds * 1_000,
            });
        }
        Ok(commits)
    }

    fn changes(&self, revision: &RevisionId) -> ProviderResult<Vec<Change>> {
        let out = self.stdout(
            "changes",
            &[
                "diff-tree",
                "--no-commit-id",
                "--no-renames",
                "-r",
                "--root",
                "--name-status",
                "-z",
                revision.as_str(),
            ],
        )?;
        let mut changes = Vec::new();
        let mut fields = out.split('\0').filter(|f| !f.is_empty());
        while let (Some(status), Some(path)) = (fields.next(), fields.next()) {
            let kind = match status.chars().next() {
                Some('A') => ChangeKind::Added,
                Some('D') => ChangeKind::Deleted,
                _ => ChangeKind::Modified,
            };
            changes.push(Change {
                path: normalize(path),
                kind,
            });
        }
        Ok(changes)
    }

    fn content_hash(&self, revision: &RevisionId, path: &str) -> ProviderResult<Option<String>> {
        let spec = object_spec(revision, path);
        self.lookup("content_hash", &["rev-parse", "--verify", "--quiet", &spec])
    }

    fn previous_revision(
        &self,
        path: &str,
        revision: &RevisionId,
    ) -> ProviderResult<Option<RevisionId>> {
        let path = normalize(path);
        Ok(self
            .lookup(
                "previous_revision",
                &["log", "-1", "--format=%H", revision.as_str(), "--", &path],
            )?
            .map(RevisionId::new))
    }

    fn parent(&self, revision: &RevisionId) -> ProviderResult<Option<RevisionId>> {
        let spec = format!("{revision}^1");
        Ok(self
            .lookup("parent", &["rev-parse", "--verify", "--quiet", &spec])?
            .map(RevisionId::new))
    }

    fn is_ancestor(&self, ancestor: &RevisionId, descendant: &RevisionId) -> ProviderResult<bool> {
        let out = self.run(
            "is_ancestor",
            &["merge-base", "--is-ancestor", ancestor.as_str(), descendant.as_str()],
        )?;
        match out.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(ProviderError::new(
                "is_ancestor",
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            )),
        }
    }

    fn children(&self, revision: &RevisionId, dir: &str) -> ProviderResult<Option<Vec<TreeEntry>>> {
        let dir = normalize(dir);
        let spec = object_spec(revision, &dir);
        let out = self.run("children", &["ls-tree", "-z", &spec])?;
        if !out.status.success() {
            return Ok(None);
        }
        let listing = String::from_utf8_lossy(&out.stdout);
        let mut entries = Vec::new();
        for record in listing.split('\0').filter(|r| !r.is_empty()) {
            // "<mode> <type> <object>\t<name>"
            let Some((meta, name)) = record.split_once('\t') else {
                continue;
            };
            let is_dir = match meta.split(' ').nth(1) {
                Some("tree") => true,
                Some("blob") => false,
                _ => continue,
            };
            let path = if dir == "." {
                name.to_string()
            } else {
                format!("{dir}/{name}")
            };
            entries.push(TreeEntry { path, is_dir });
        }
        Ok(Some(entries))
    }

    fn read(&self, revision: &RevisionId, path: &str) -> ProviderResult<Option<Vec<u8>>> {
        let spec = object_spec(revision, path);
        let out = self.run("read", &["show", &spec])?;
        Ok(out.status.success().then_some(out.stdout))
    }

    fn tip(&self) -> ProviderResult<Option<RevisionId>> {
        Ok(self
            .lookup("tip", &["rev-parse", "--verify", "--quiet", "HEAD"])?
            .map(RevisionId::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("lineage-git-{}-{}", label, nanos));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn run_git(root: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(args)
            .status()
            .expect("run git");
        assert!(
            status.success(),
            "git command failed: git -C {:?} {:?}",
            root,
            args
        );
    }

    fn init_repo(label: &str) -> PathBuf {
        let root = temp_dir(label);
        run_git(&root, &["init", "-q"]);
        run_git(&root, &["config", "user.email", "test@example.org"]);
        run_git(&root, &["config", "user.name", "Test"]);
        root
    }

    fn commit_all(root: &Path, message: &str) {
        run_git(root, &["add", "-A"]);
        run_git(root, &["commit", "-q", "-m", message]);
    }

    #[test]
    fn open_rejects_non_repo() {
        if !git_available() {
            return;
        }
        let root = temp_dir("non-repo");
        assert!(GitHistory::open(&root).is_err());
    }

    #[test]
    fn walks_commits_and_changes() {
        if !git_available() {
            return;
        }
        let root = init_repo("walk");
        std::fs::create_dir_all(root.join("data")).unwrap();
        std::fs::write(root.join("data/a.txt"), "1").unwrap();
        std::fs::write(root.join("b.txt"), "2").unwrap();
        commit_all(&root, "first");
        std::fs::write(root.join("data/a.txt"), "1b").unwrap();
        std::fs::remove_file(root.join("b.txt")).unwrap();
        commit_all(&root, "second");

        let h = GitHistory::open(&root).unwrap();
        let commits = h.commits(None).unwrap();
        assert_eq!(commits.len(), 2);
        let (r1, r2) = (&commits[0].revision, &commits[1].revision);
        assert_eq!(commits[1].parent.as_ref(), Some(r1));
        assert_eq!(h.parent(r1).unwrap(), None);
        assert_eq!(h.commits(Some(r1)).unwrap().len(), 1);

        let mut changes = h.changes(r2).unwrap();
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(changes[0].path, "b.txt");
        assert_eq!(changes[0].kind, ChangeKind::Deleted);
        assert_eq!(changes[1].kind, ChangeKind::Modified);

        assert!(h.content_hash(r2, "b.txt").unwrap().is_none());
        assert!(h.content_hash(r1, "b.txt").unwrap().is_some());
        assert_eq!(h.previous_revision("b.txt", r2).unwrap().as_ref(), Some(r2));
        assert!(h.is_ancestor(r1, r2).unwrap());
        assert!(!h.is_ancestor(r2, r1).unwrap());

        let entries = h.children(r2, "data").unwrap().unwrap();
        assert_eq!(entries, vec![TreeEntry { path: "data/a.txt".into(), is_dir: false }]);
        assert!(h.children(r2, "data/a.txt").unwrap().is_none());
        assert_eq!(h.read(r1, "b.txt").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn empty_repo_has_no_commits() {
        if !git_available() {
            return;
        }
        let root = init_repo("empty");
        let h = GitHistory::open(&root).unwrap();
        assert!(h.tip().unwrap().is_none());
        assert!(h.commits(None).unwrap().is_empty());
    }
}
