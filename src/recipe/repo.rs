// src/recipe/repo.rs

//! Source repositories
//!
//! A [`Repository`] knows how to materialize a recipe's source tree in a
//! target directory, report a hash identifying the snapshot it would build,
//! and discard build products afterwards.

use crate::error::{Error, Result};
use crate::recipe::archive::{self, ArchiveFormat};
use crate::recipe::format::RepoSpec;
use crate::shell::Shell;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Marker file recording which archive checksum a tree was unpacked from
const ARCHIVE_MARKER: &str = ".archive";

/// Hash reported by [`Dummy`] repositories
pub const DUMMY_HASH: &str = "dummy_hash";

/// Default branch for git repos with neither tag nor branch
const DEFAULT_BRANCH: &str = "master";

/// Default branch for mercurial repos with neither tag nor branch
const HG_DEFAULT_BRANCH: &str = "default";

pub trait Repository: fmt::Debug {
    /// Make `target` hold this repository's current snapshot
    fn fetch(&self, target: &Path) -> Result<()>;

    /// Identifier of the snapshot `fetch` would produce
    fn cur_hash(&self, target: &Path) -> Result<String>;

    /// Discard build products in `target`
    fn clean(&self, target: &Path) -> Result<()>;

    /// One-line summary for `display`
    fn describe(&self) -> String;
}

/// Build a repository from its recipe declaration
pub fn from_spec(spec: &RepoSpec, timeout: Duration) -> Box<dyn Repository> {
    match spec {
        RepoSpec::Git { url, tag, branch } => {
            let reference = match (tag, branch) {
                (Some(tag), _) => GitRef::Tag(tag.clone()),
                (None, Some(branch)) => GitRef::Branch(branch.clone()),
                (None, None) => GitRef::Branch(DEFAULT_BRANCH.to_string()),
            };
            Box::new(Git::new(url, reference).with_timeout(timeout))
        }
        RepoSpec::Hg { url, tag, branch } => {
            let reference = match (tag, branch) {
                (Some(tag), _) => GitRef::Tag(tag.clone()),
                (None, Some(branch)) => GitRef::Branch(branch.clone()),
                (None, None) => GitRef::Branch(HG_DEFAULT_BRANCH.to_string()),
            };
            Box::new(Hg::new(url, reference).with_timeout(timeout))
        }
        RepoSpec::Archive { url, checksum } => Box::new(Archive::new(url, checksum)),
        RepoSpec::Dummy => Box::new(Dummy),
    }
}

/// Remove a directory tree, tolerating absence
pub(crate) fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::IoError(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Quote a string for `sh -c`
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    /// Fixed revision; never moves
    Tag(String),
    /// Tracked branch; fast-forwarded on every fetch
    Branch(String),
}

impl GitRef {
    fn name(&self) -> &str {
        match self {
            Self::Tag(name) | Self::Branch(name) => name,
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "tag: {}", tag),
            Self::Branch(branch) => write!(f, "branch: {}", branch),
        }
    }
}

/// Git repository fetched with the `git` CLI
#[derive(Debug, Clone)]
pub struct Git {
    uri: String,
    reference: GitRef,
    timeout: Duration,
}

impl Git {
    pub fn new(uri: &str, reference: GitRef) -> Self {
        Self {
            uri: uri.to_string(),
            reference,
            timeout: crate::shell::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn reference(&self) -> &GitRef {
        &self.reference
    }

    fn shell(&self, dir: &Path) -> Shell {
        Shell::new().in_dir(dir).with_timeout(self.timeout)
    }

    /// True iff `target` is a clone of this repository
    fn is_ready(&self, target: &Path) -> bool {
        if !target.join(".git").exists() {
            return false;
        }
        self.shell(target)
            .run("git remote get-url origin")
            .is_ok_and(|out| out.stdout.trim() == self.uri)
    }

    fn clone_into(&self, target: &Path) -> Result<()> {
        remove_tree(target)?;
        let parent = target
            .parent()
            .ok_or_else(|| Error::IoError(format!("No parent for {}", target.display())))?;
        fs::create_dir_all(parent)?;

        info!("Cloning {} ({})", self.uri, self.reference);
        self.shell(parent).run(&format!(
            "git clone --recursive -b {} {} {}",
            quote(self.reference.name()),
            quote(&self.uri),
            quote(&target.to_string_lossy())
        ))?;
        Ok(())
    }

    fn update(&self, target: &Path) -> Result<()> {
        let shell = self.shell(target);
        match &self.reference {
            GitRef::Tag(tag) => {
                shell.run(&format!("git checkout {}", quote(tag)))?;
            }
            GitRef::Branch(branch) => {
                debug!("Fast-forwarding {} to origin/{}", target.display(), branch);
                shell.run(&format!("git checkout {}", quote(branch)))?;
                shell.run(&format!("git fetch origin {}", quote(branch)))?;
                shell.run("git merge --ff-only FETCH_HEAD")?;
            }
        }
        Ok(())
    }
}

impl Repository for Git {
    fn fetch(&self, target: &Path) -> Result<()> {
        if self.is_ready(target) {
            self.update(target)
        } else {
            self.clone_into(target)
        }
    }

    fn cur_hash(&self, target: &Path) -> Result<String> {
        self.fetch(target)?;
        let output = self.shell(target).run("git rev-parse HEAD")?;
        Ok(output.stdout.trim().to_string())
    }

    fn clean(&self, target: &Path) -> Result<()> {
        if target.join(".git").exists() {
            self.shell(target).run("git clean -f -d")?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Git: {}, uri: {}", self.reference, self.uri)
    }
}

/// Mercurial repository fetched with the `hg` CLI
#[derive(Debug, Clone)]
pub struct Hg {
    uri: String,
    reference: GitRef,
    timeout: Duration,
}

impl Hg {
    pub fn new(uri: &str, reference: GitRef) -> Self {
        Self {
            uri: uri.to_string(),
            reference,
            timeout: crate::shell::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn shell(&self, dir: &Path) -> Shell {
        Shell::new().in_dir(dir).with_timeout(self.timeout)
    }

    /// True iff `target` was cloned from this repository
    fn is_ready(&self, target: &Path) -> bool {
        fs::read_to_string(target.join(".hg/hgrc"))
            .is_ok_and(|hgrc| hgrc.lines().any(|line| line.contains(&self.uri)))
    }

    fn clone_into(&self, target: &Path) -> Result<()> {
        remove_tree(target)?;
        let parent = target
            .parent()
            .ok_or_else(|| Error::IoError(format!("No parent for {}", target.display())))?;
        fs::create_dir_all(parent)?;

        info!("Cloning {} ({})", self.uri, self.reference);
        self.shell(parent).run(&format!(
            "hg clone -u {} {} {}",
            quote(self.reference.name()),
            quote(&self.uri),
            quote(&target.to_string_lossy())
        ))?;
        Ok(())
    }

    fn update(&self, target: &Path) -> Result<()> {
        let shell = self.shell(target);
        match &self.reference {
            GitRef::Tag(tag) => {
                shell.run(&format!("hg update {}", quote(tag)))?;
            }
            GitRef::Branch(branch) => {
                debug!("Pulling {} into {}", branch, target.display());
                shell.run(&format!("hg pull -b {}", quote(branch)))?;
                shell.run(&format!("hg update {}", quote(branch)))?;
            }
        }
        Ok(())
    }
}

impl Repository for Hg {
    fn fetch(&self, target: &Path) -> Result<()> {
        if self.is_ready(target) {
            self.update(target)
        } else {
            self.clone_into(target)
        }
    }

    fn cur_hash(&self, target: &Path) -> Result<String> {
        self.fetch(target)?;
        let output = self.shell(target).run("hg log -r . --template '{node}'")?;
        Ok(output.stdout.trim().to_string())
    }

    /// Delete files mercurial does not track
    fn clean(&self, target: &Path) -> Result<()> {
        if !target.join(".hg").exists() {
            return Ok(());
        }
        let output = self.shell(target).run("hg status --unknown --no-status")?;
        for path in output.stdout.lines().filter(|line| !line.is_empty()) {
            let path = target.join(path);
            debug!("Removing untracked {}", path.display());
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Hg: {}, uri: {}", self.reference, self.uri)
    }
}

/// Source tarball with a pinned sha256 checksum
#[derive(Debug, Clone)]
pub struct Archive {
    uri: String,
    checksum: String,
}

impl Archive {
    pub fn new(uri: &str, checksum: &str) -> Self {
        Self {
            uri: uri.to_string(),
            checksum: checksum.to_string(),
        }
    }

    fn is_ready(&self, target: &Path) -> bool {
        fs::read_to_string(target.join(ARCHIVE_MARKER))
            .is_ok_and(|marker| marker.trim() == self.checksum)
    }
}

impl Repository for Archive {
    fn fetch(&self, target: &Path) -> Result<()> {
        if self.is_ready(target) {
            debug!("Archive already unpacked at {}", target.display());
            return Ok(());
        }

        remove_tree(target)?;
        let parent = target
            .parent()
            .ok_or_else(|| Error::IoError(format!("No parent for {}", target.display())))?;
        fs::create_dir_all(parent)?;

        let filename = archive::archive_filename(&self.uri);
        let format = ArchiveFormat::detect(&filename)?;

        let staging = tempfile::Builder::new()
            .prefix(".fetch-")
            .tempdir_in(parent)?;
        let download = staging.path().join(&filename);

        archive::fetch_file(&self.uri, &download)?;
        archive::verify_file_checksum(&download, &self.checksum)?;

        let unpacked = staging.path().join("unpacked");
        archive::extract_archive(&download, format, &unpacked)?;
        let root = archive::source_root(&unpacked)?;

        fs::rename(&root, target)?;
        fs::write(target.join(ARCHIVE_MARKER), &self.checksum)?;
        info!("Unpacked {} into {}", filename, target.display());
        Ok(())
    }

    fn cur_hash(&self, _target: &Path) -> Result<String> {
        Ok(self
            .checksum
            .strip_prefix("sha256:")
            .unwrap_or(&self.checksum)
            .to_string())
    }

    fn clean(&self, target: &Path) -> Result<()> {
        remove_tree(target)
    }

    fn describe(&self) -> String {
        format!("Archive: {}, {}", self.uri, self.checksum)
    }
}

/// Empty source tree
#[derive(Debug, Clone, Copy, Default)]
pub struct Dummy;

impl Repository for Dummy {
    fn fetch(&self, target: &Path) -> Result<()> {
        fs::create_dir_all(target)?;
        Ok(())
    }

    fn cur_hash(&self, _target: &Path) -> Result<String> {
        Ok(DUMMY_HASH.to_string())
    }

    fn clean(&self, target: &Path) -> Result<()> {
        remove_tree(target)
    }

    fn describe(&self) -> String {
        "Dummy".to_string()
    }
}
