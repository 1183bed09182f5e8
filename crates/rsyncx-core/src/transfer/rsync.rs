//! Transport for SSH remotes, driven through the `ssh` and `rsync` binaries
//!
//! Listing runs `find` on the server; each pull and push is one
//! `rsync -a --relative` invocation so failures stay per path; remote
//! archiving is a `mv` into `<remote_root>/_trash/<group>/<partition>/`.

use std::path::Path;
use std::process::{Command, Output};

use chrono::{DateTime, Utc};
use rsyncx_fs::{NormalizedPath, RsyncxPath};

use super::{ActionOutcome, TransferContext, TransferExecutor, missing_root, not_remote};
use crate::group::{RemoteLocation, SshTarget};
use crate::listing::FileListing;
use crate::plan::{PlanAction, SyncMode};
use crate::trash::Partition;
use crate::{Error, Result};

/// Exit status of the listing script when the root is missing and must exist.
const MISSING_ROOT_EXIT: i32 = 44;

/// Quote a string for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Runs `ssh`/`rsync`, optionally wrapped in `sshpass -e`.
#[derive(Debug, Clone)]
pub struct RsyncTransport {
    ssh_program: String,
    rsync_program: String,
}

impl Default for RsyncTransport {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            rsync_program: "rsync".to_string(),
        }
    }
}

impl RsyncTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the binaries used (e.g. absolute paths).
    pub fn with_programs(ssh: impl Into<String>, rsync: impl Into<String>) -> Self {
        Self {
            ssh_program: ssh.into(),
            rsync_program: rsync.into(),
        }
    }

    fn target<'a>(ctx: &'a TransferContext<'_>) -> Result<&'a SshTarget> {
        match &ctx.endpoint.location {
            RemoteLocation::Ssh(target) => Ok(target),
            other => Err(Error::Transfer {
                message: format!("{} is not an SSH endpoint", other),
            }),
        }
    }

    fn ssh_options(target: &SshTarget) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            target.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
        ];
        if let Some(identity) = &target.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args
    }

    /// Start a command, wrapped in `sshpass -e` when a password is configured.
    fn base_command(&self, target: &SshTarget, program: &str) -> Result<Command> {
        let Some(var) = &target.password_env else {
            return Ok(Command::new(program));
        };
        let password = std::env::var(var).map_err(|_| Error::Transfer {
            message: format!("password variable '{}' is not set", var),
        })?;
        let mut cmd = Command::new("sshpass");
        cmd.arg("-e").arg(program).env("SSHPASS", password);
        Ok(cmd)
    }

    /// `ssh ... user@host <remote command>`
    pub fn ssh_command(&self, target: &SshTarget, remote_command: &str) -> Result<Command> {
        let mut cmd = self.base_command(target, &self.ssh_program)?;
        cmd.args(Self::ssh_options(target))
            .arg(format!("{}@{}", target.user, target.host))
            .arg(remote_command);
        Ok(cmd)
    }

    /// `rsync -a -s --relative -e "ssh ..." <source> <destination>`
    pub fn rsync_command(
        &self,
        target: &SshTarget,
        source: &str,
        destination: &str,
    ) -> Result<Command> {
        self.rsync_with(target, &["-a", "-s", "--relative"], source, destination)
    }

    fn rsync_with(
        &self,
        target: &SshTarget,
        flags: &[&str],
        source: &str,
        destination: &str,
    ) -> Result<Command> {
        let ssh = std::iter::once(self.ssh_program.clone())
            .chain(Self::ssh_options(target).iter().map(|a| shell_quote(a)))
            .collect::<Vec<_>>()
            .join(" ");
        let mut cmd = self.base_command(target, &self.rsync_program)?;
        cmd.args(flags).arg("-e").arg(ssh).arg(source).arg(destination);
        Ok(cmd)
    }

    /// Remote command printing `path\tmtime\tsize` for every regular file.
    ///
    /// A missing root prints nothing when `missing_ok`, and otherwise exits
    /// with a dedicated status.
    pub fn list_script(root: &str, missing_ok: bool) -> String {
        let root = shell_quote(root);
        let missing = if missing_ok {
            "exit 0".to_string()
        } else {
            format!("exit {}", MISSING_ROOT_EXIT)
        };
        format!(
            "[ -d {root} ] || {missing}; find {root} -type f -printf '%P\\t%T@\\t%s\\n'",
            root = root,
            missing = missing
        )
    }

    /// Remote command archiving `relative` into the given bin partition.
    ///
    /// Re-running it after success is a no-op; identical content already in
    /// the bin just drops the leftover source; a differing entry gets a
    /// numbered sibling.
    pub fn archive_script(
        root: &str,
        group: &str,
        partition: &Partition,
        relative: &NormalizedPath,
    ) -> String {
        let root = root.trim_end_matches('/');
        let source = shell_quote(&format!("{}/{}", root, relative));
        let destination = format!(
            "{}/{}/{}/{}/{}",
            root,
            RsyncxPath::TrashDir,
            group,
            partition,
            relative
        );
        let parent = destination
            .rsplit_once('/')
            .map(|(parent, _)| parent.to_string())
            .unwrap_or_else(|| destination.clone());
        let destination = shell_quote(&destination);

        format!(
            "src={src}; dst={dst}; \
             if [ ! -e \"$src\" ]; then [ -e \"$dst\" ] && echo \"$dst\" && exit 0; exit 3; fi; \
             mkdir -p {parent} || exit 4; \
             d=\"$dst\"; n=0; \
             while [ -e \"$d\" ]; do \
             if cmp -s \"$src\" \"$d\"; then rm -f \"$src\" && echo \"$d\"; exit $?; fi; \
             n=$((n+1)); d=\"$dst~$n\"; done; \
             mv \"$src\" \"$d\" && echo \"$d\"",
            src = source,
            dst = destination,
            parent = shell_quote(&parent)
        )
    }

    fn remote_bin_dir(target: &SshTarget, group: &str) -> String {
        format!(
            "{}/{}/{}",
            target.root.trim_end_matches('/'),
            RsyncxPath::TrashDir,
            group
        )
    }

    fn apply_one(
        &self,
        ctx: &TransferContext<'_>,
        target: &SshTarget,
        action: &PlanAction,
    ) -> ActionOutcome {
        let root = target.root.trim_end_matches('/');
        let local_root = ctx.group.local_root.display().to_string();
        let remote = |path: &str| format!("{}@{}:{}", target.user, target.host, path);

        let command = match action {
            PlanAction::Pull(path) => self.rsync_command(
                target,
                &remote(&format!("{}/./{}", root, path)),
                &format!("{}/", local_root.trim_end_matches('/')),
            ),
            PlanAction::Push(path) => self.rsync_command(
                target,
                &format!("{}/./{}", local_root.trim_end_matches('/'), path),
                &remote(&format!("{}/", root)),
            ),
            PlanAction::TrashRemote(path) => self.ssh_command(
                target,
                &Self::archive_script(root, &ctx.group.name, ctx.partition, path),
            ),
            other => return not_remote(other),
        };

        match command.and_then(run) {
            Ok(output) if matches!(action, PlanAction::TrashRemote(_)) => {
                let location = String::from_utf8_lossy(&output.stdout).trim().to_string();
                ActionOutcome::archived(action.clone(), remote(&location))
            }
            Ok(_) => ActionOutcome::done(action.clone()),
            Err(e) => {
                tracing::warn!("{} failed: {}", action, e);
                ActionOutcome::failed(action.clone(), e.to_string())
            }
        }
    }
}

fn spawn(cmd: &mut Command) -> Result<Output> {
    tracing::debug!("Running {:?}", cmd.get_program());
    cmd.output().map_err(|e| Error::Transfer {
        message: format!("cannot run {:?}: {}", cmd.get_program(), e),
    })
}

fn run(mut cmd: Command) -> Result<Output> {
    let output = spawn(&mut cmd)?;
    checked(&cmd, output)
}

fn checked(cmd: &Command, output: Output) -> Result<Output> {
    if !output.status.success() {
        return Err(Error::Transfer {
            message: format!(
                "{:?} exited with {}: {}",
                cmd.get_program(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output)
}

impl TransferExecutor for RsyncTransport {
    fn list(&self, ctx: &TransferContext<'_>) -> Result<FileListing> {
        let target = Self::target(ctx)?;
        let script = Self::list_script(&target.root, ctx.mode == SyncMode::FirstSync);
        let mut cmd = self.ssh_command(target, &script)?;
        let output = spawn(&mut cmd)?;
        if output.status.code() == Some(MISSING_ROOT_EXIT) {
            return missing_root(ctx);
        }
        let output = checked(&cmd, output)?;
        let mut listing = FileListing::parse_find_output(&String::from_utf8_lossy(&output.stdout));
        listing.retain_included(ctx.filter);
        Ok(listing)
    }

    fn ensure_root(&self, ctx: &TransferContext<'_>) -> Result<()> {
        let target = Self::target(ctx)?;
        run(self.ssh_command(target, &format!("mkdir -p {}", shell_quote(&target.root)))?)?;
        Ok(())
    }

    fn fetch_bin(&self, ctx: &TransferContext<'_>, destination: &Path) -> Result<()> {
        let target = Self::target(ctx)?;
        std::fs::create_dir_all(destination).map_err(|e| rsyncx_fs::Error::io(destination, e))?;
        let source = format!(
            "{}@{}:{}/",
            target.user,
            target.host,
            Self::remote_bin_dir(target, &ctx.group.name)
        );
        let destination = format!("{}/", destination.display().to_string().trim_end_matches('/'));
        run(self.rsync_with(
            target,
            &["-a", "-s", "--ignore-missing-args"],
            &source,
            &destination,
        )?)?;
        Ok(())
    }

    fn apply(&self, ctx: &TransferContext<'_>, actions: &[PlanAction]) -> Vec<ActionOutcome> {
        let target = match Self::target(ctx) {
            Ok(target) => target,
            Err(e) => {
                return actions
                    .iter()
                    .map(|a| ActionOutcome::failed(a.clone(), e.to_string()))
                    .collect();
            }
        };
        actions
            .iter()
            .map(|action| self.apply_one(ctx, target, action))
            .collect()
    }

    fn purge(
        &self,
        ctx: &TransferContext<'_>,
        older_than: Option<DateTime<Utc>>,
    ) -> Result<Vec<Partition>> {
        let target = Self::target(ctx)?;
        let bin = Self::remote_bin_dir(target, &ctx.group.name);
        let listing = format!(
            "if [ -d {bin} ]; then ls -1 {bin}; fi",
            bin = shell_quote(&bin)
        );
        let output = run(self.ssh_command(target, &listing)?)?;

        let doomed: Vec<Partition> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|name| Partition::parse(name.trim()))
            .filter(|p| match (older_than, p.created_at()) {
                (Some(cutoff), Some(created)) => created < cutoff,
                _ => true,
            })
            .collect();
        if doomed.is_empty() {
            return Ok(doomed);
        }

        let paths = doomed
            .iter()
            .map(|p| shell_quote(&format!("{}/{}", bin, p)))
            .collect::<Vec<_>>()
            .join(" ");
        run(self.ssh_command(target, &format!("rm -rf {}", paths))?)?;
        tracing::info!("Purged {} remote bin partitions for '{}'", doomed.len(), ctx.group.name);
        Ok(doomed)
    }
}
