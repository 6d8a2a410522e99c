//! Thin wrapper over the `git` executable for one checkout.

use crate::error::{Result, SeoError};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct Git {
    bin: PathBuf,
    repo: PathBuf,
    author: Option<(String, String)>,
}

impl Git {
    pub fn open(repo: impl Into<PathBuf>) -> Result<Self> {
        let bin = which::which("git").map_err(|_| SeoError::GitNotFound)?;
        Ok(Self {
            bin,
            repo: repo.into(),
            author: None,
        })
    }

    /// Commit as `name <email>` instead of the repository's configured user.
    pub fn with_author(mut self, name: Option<&str>, email: Option<&str>) -> Self {
        if let (Some(name), Some(email)) = (name, email) {
            self.author = Some((name.to_string(), email.to_string()));
        }
        self
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.current_dir(&self.repo);
        if let Some((name, email)) = &self.author {
            cmd.arg("-c")
                .arg(format!("user.name={name}"))
                .arg("-c")
                .arg(format!("user.email={email}"));
        }
        cmd
    }

    fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let label = args
            .first()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = self.command().args(&args).output().map_err(|e| SeoError::Git {
            command: label.clone(),
            stderr: e.to_string(),
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SeoError::Git {
                command: label,
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Absolute path of the working tree root.
    pub fn toplevel(&self) -> Result<PathBuf> {
        self.run(["rev-parse", "--show-toplevel"]).map(PathBuf::from)
    }

    pub fn current_branch(&self) -> Result<String> {
        self.run(["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn checkout(&self, branch: &str) -> Result<()> {
        self.run(["checkout", branch]).map(|_| ())
    }

    /// Fast-forward `branch` from `remote`; never creates a merge commit.
    pub fn pull_ff(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(["pull", "--ff-only", remote, branch]).map(|_| ())
    }

    pub fn create_branch(&self, name: &str) -> Result<()> {
        self.run(["checkout", "-b", name]).map(|_| ())
    }

    pub fn add(&self, files: &[PathBuf]) -> Result<()> {
        let mut args = vec![std::ffi::OsString::from("add"), "--".into()];
        args.extend(files.iter().map(|f| f.as_os_str().to_os_string()));
        self.run(args).map(|_| ())
    }

    /// Commit exactly `files` and return the new commit id. Anything else
    /// already staged stays staged and out of the commit.
    pub fn commit(&self, message: &str, files: &[PathBuf]) -> Result<String> {
        let mut args = vec![
            std::ffi::OsString::from("commit"),
            "-m".into(),
            message.into(),
            "--only".into(),
            "--".into(),
        ];
        args.extend(files.iter().map(|f| f.as_os_str().to_os_string()));
        self.run(args)?;
        self.run(["rev-parse", "HEAD"])
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(["push", "-u", remote, branch]).map(|_| ())
    }

    pub fn delete_branch(&self, name: &str) -> Result<()> {
        self.run(["branch", "-D", name]).map(|_| ())
    }

    pub fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<()> {
        self.run(["push", remote, "--delete", name]).map(|_| ())
    }

    /// The URL as configured, without `insteadOf` rewriting.
    pub fn remote_url(&self, remote: &str) -> Result<String> {
        let key = format!("remote.{remote}.url");
        self.run(["config", "--get", key.as_str()])
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        let reference = format!("refs/heads/{name}");
        self.run(["rev-parse", "--verify", "--quiet", reference.as_str()])
            .is_ok()
    }
}
