// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::{bail, Result};
use git2::{IndexEntry, IndexTime, Repository, RepositoryInitOptions};
use std::{
    env,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

pub(crate) struct RepoFixture {
    repo: Repository,
}

impl RepoFixture {
    pub(crate) fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(path.as_ref(), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(Self { repo })
    }

    pub(crate) fn stage_and_commit(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
    ) -> Result<()> {
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: contents.as_ref().len() as u32,
            id: self.repo.blob(contents.as_ref().as_bytes())?,
            flags: 0,
            flags_extended: 0,
            path: filename.as_ref().as_os_str().to_string_lossy().into_owned().as_bytes().to_vec(),
        };

        // INVARIANT: Always use new tree produced by index after staging new entry.
        let mut index = self.repo.index()?;
        index.add_frombuffer(&entry, contents.as_ref().as_bytes())?;
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        // INVARIANT: Always determine latest parent commits to append to.
        let signature = self.repo.signature()?;
        let mut parents = Vec::new();
        if let Some(parent) = self.repo.head().ok().map(|head| head.target().unwrap()) {
            parents.push(self.repo.find_commit(parent)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        // INVARIANT: Commit to HEAD by appending to obtained parent commits.
        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            format!("chore: add {:?}", filename.as_ref()).as_ref(),
            &tree,
            &parents,
        )?;

        Ok(())
    }
}

/// Upstream project, its fork on a remote named origin, and a working clone
/// of that fork carrying feature branches.
///
/// Layout relative to the current directory:
///
/// - `upstream/`: upstream project with `package.json` at version 1.2.0.
/// - `origin.git/`: bare fork remote.
/// - `work/`: clone of `origin.git` with `upstream` registered as a remote.
pub(crate) struct ForkFixture {
    pub(crate) upstream: RepoFixture,
    pub(crate) work: PathBuf,
    pub(crate) origin: PathBuf,
}

impl ForkFixture {
    pub(crate) fn new() -> Result<Self> {
        let cwd = env::current_dir()?;
        let upstream = RepoFixture::new(cwd.join("upstream"))?;
        upstream.stage_and_commit("package.json", r#"{ "version": "1.2.0" }"#)?;
        upstream.stage_and_commit("README.md", "upstream project\n")?;

        let origin = cwd.join("origin.git");
        let work = cwd.join("work");
        git(&cwd, ["clone", "--bare", "upstream", "origin.git"])?;
        git(&cwd, ["clone", "origin.git", "work"])?;
        git(&work, ["config", "user.name", "John Doe"])?;
        git(&work, ["config", "user.email", "john@doe.com"])?;
        git(&work, ["config", "commit.gpgsign", "false"])?;
        git(&work, ["config", "tag.gpgsign", "false"])?;
        git(&work, ["config", "merge.ff", "true"])?;
        git(
            &work,
            [
                OsStr::new("remote"),
                OsStr::new("add"),
                OsStr::new("upstream"),
                cwd.join("upstream").as_os_str(),
            ],
        )?;

        // INVARIANT: Keep fork configuration untracked and out of status.
        fs::write(work.join(".git/info/exclude"), "fork.yaml\n")?;

        Ok(Self {
            upstream,
            work,
            origin,
        })
    }

    /// Create feature branch off of base with one commit, and push it.
    pub(crate) fn feature(&self, name: &str, base: &str, file: &str, contents: &str) -> Result<()> {
        git(&self.work, ["checkout", "-b", name, base])?;
        fs::write(self.work.join(file), contents)?;
        git(&self.work, ["add", file])?;
        let message = format!("feat: add {file}");
        git(&self.work, ["commit", "-m", message.as_str()])?;
        git(&self.work, ["push", "origin", name])?;
        git(&self.work, ["checkout", "main"])?;

        Ok(())
    }

    pub(crate) fn write_config(&self, contents: &str) -> Result<()> {
        fs::write(self.work.join("fork.yaml"), contents)?;
        Ok(())
    }

    /// Commit identifier of reference in working clone.
    pub(crate) fn local_commit(&self, reference: &str) -> Option<String> {
        resolve(&self.work, reference)
    }

    /// Commit identifier of reference in fork remote.
    pub(crate) fn origin_commit(&self, reference: &str) -> Option<String> {
        resolve(&self.origin, reference)
    }
}

fn resolve(path: &Path, reference: &str) -> Option<String> {
    let repo = Repository::open(path).ok()?;
    let object = repo.revparse_single(reference).ok()?;
    let commit = object.peel_to_commit().ok()?;
    Some(commit.id().to_string())
}

pub(crate) fn git(
    dir: impl AsRef<Path>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir.as_ref())
        .args(args)
        .output()?;
    if !output.status.success() {
        bail!(
            "git failed in {}: {}",
            dir.as_ref().display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
