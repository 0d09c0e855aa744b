use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use kdb_core::{DomainName, HostId};
use kdb_source::{HostSession, HypervisorSource, SourceError};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct VirshSource {
    user: String,
    key: PathBuf,
    program: PathBuf,
}

impl VirshSource {
    pub fn new(user: impl Into<String>, key: impl Into<PathBuf>) -> Self {
        Self { user: user.into(), key: key.into(), program: PathBuf::from("virsh") }
    }

    /// Use a different `virsh` executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Connection URI for `host`. The key file is only passed along when it
    /// exists; otherwise ssh falls back to its own defaults.
    pub fn uri(&self, host: &HostId) -> String {
        let uri = format!("qemu+ssh://{}@{}/system", self.user, host);
        if self.key.is_file() {
            format!("{}?keyfile={}", uri, self.key.display())
        } else {
            uri
        }
    }
}

fn run(program: &Path, uri: &str, args: &[&str]) -> Result<Vec<u8>, String> {
    debug!("running {} --connect {} {:?}", program.display(), uri, args);
    let out = Command::new(program)
        .args(["--readonly", "--connect", uri])
        .args(args)
        .output()
        .map_err(|e| format!("run {}: {}", program.display(), e))?;
    if !out.status.success() {
        return Err(format!(
            "{} {:?} failed ({}): {}",
            program.display(),
            args,
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        ));
    }
    Ok(out.stdout)
}

impl HypervisorSource for VirshSource {
    fn open(&self, host: &HostId) -> Result<Box<dyn HostSession>, SourceError> {
        let uri = self.uri(host);
        // each virsh call connects on its own; this one proves the host answers
        run(&self.program, &uri, &["uri"])
            .map_err(|reason| SourceError::Connectivity { host: host.clone(), reason })?;
        Ok(Box::new(VirshSession { host: host.clone(), uri, program: self.program.clone() }))
    }
}

struct VirshSession {
    host: HostId,
    uri: String,
    program: PathBuf,
}

impl HostSession for VirshSession {
    fn host(&self) -> &HostId {
        &self.host
    }

    /// Running domains only.
    fn list_domain_names(&self) -> Result<BTreeSet<DomainName>, SourceError> {
        let out = run(&self.program, &self.uri, &["list", "--name"])
            .map_err(|reason| SourceError::Connectivity { host: self.host.clone(), reason })?;
        parse_names(&String::from_utf8_lossy(&out))
            .map_err(|source| SourceError::InvalidName { host: self.host.clone(), source })
    }

    fn fetch_config(&self, domain: &DomainName) -> Result<Vec<u8>, SourceError> {
        run(&self.program, &self.uri, &["dumpxml", domain.as_str()]).map_err(|reason| SourceError::Fetch {
            host: self.host.clone(),
            domain: domain.clone(),
            reason,
        })
    }

    fn close(self: Box<Self>) -> Result<(), SourceError> {
        Ok(())
    }
}

fn parse_names(listing: &str) -> Result<BTreeSet<DomainName>, kdb_core::NameError> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(DomainName::parse)
        .collect()
}
