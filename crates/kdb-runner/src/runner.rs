use anyhow::{Context, Result};
use kdb_core::{DomainName, HostId, RunId};
use kdb_source::{HostSession, HypervisorSource, SessionGuard};
use kdb_source_virsh::VirshSource;
use kdb_tree::{RetentionTree, WriteOutcome};
use tracing::{debug, info, info_span, warn};

use crate::{Config, DomainOutcome, HostOutcome, RunReport};

pub struct Runner {
    pub tree: RetentionTree,
    pub source: Box<dyn HypervisorSource>,
    pub run_id: RunId,
}

impl Runner {
    pub fn new(tree: RetentionTree, source: Box<dyn HypervisorSource>) -> Self {
        Self { tree, source, run_id: RunId::new() }
    }

    /// Runner talking to every host through `virsh` with the configured account.
    pub fn open(tree: RetentionTree, cfg: &Config) -> Self {
        let source = VirshSource::new(cfg.account.user.clone(), cfg.key_path());
        Self::new(tree, Box::new(source))
    }

    /// Backs up every host in order. Host and domain failures are recorded in
    /// the report and never stop the run.
    pub fn run(&self, hosts: &[HostId]) -> RunReport {
        let span = info_span!("run", run_id = %self.run_id);
        let _enter = span.enter();
        info!("backing up {} hosts into {}", hosts.len(), self.tree.root().display());

        let mut report = RunReport::new(self.run_id.clone());
        for host in hosts {
            let outcome = self.backup_host(host);
            report.hosts.push((host.clone(), outcome));
        }
        info!("{}", report.summary());
        report
    }

    /// Rotates only after the host has answered, so an unreachable host keeps
    /// its current generation in place.
    pub fn backup_host(&self, host: &HostId) -> HostOutcome {
        let span = info_span!("host", host = %host);
        let _enter = span.enter();

        let session = match self.source.open(host) {
            Ok(session) => SessionGuard::new(session),
            Err(e) => {
                warn!("skipping host: {}", e);
                return HostOutcome::Skipped(e.to_string());
            }
        };
        let names = match session.list_domain_names() {
            Ok(names) => names,
            Err(e) => {
                warn!("skipping host: {}", e);
                return HostOutcome::Skipped(e.to_string());
            }
        };

        let rotation = match self.tree.rotate_host(host) {
            Ok(rotation) => rotation,
            Err(e) => {
                warn!("rotation failed, not writing: {}", e);
                return HostOutcome::Failed(e.to_string());
            }
        };
        info!(
            "{} domains listed; {} files quarantined, {} discarded",
            names.len(),
            rotation.moved.len(),
            rotation.discarded.len()
        );

        let mut domains = Vec::with_capacity(names.len());
        for name in names {
            let outcome = match self.backup_domain(&*session, &name) {
                Ok(written) => {
                    debug!("{} ({:?})", written.path.display(), written.previous);
                    DomainOutcome::Written(written.previous)
                }
                Err(e) => {
                    let reason = format!("{:#}", e);
                    warn!("domain {} failed: {}", name, reason);
                    DomainOutcome::Failed(reason)
                }
            };
            domains.push((name, outcome));
        }

        if let Err(e) = session.close() {
            warn!("closing session failed: {}", e);
        }
        HostOutcome::Completed { quarantined: rotation.moved.len(), discarded: rotation.discarded.len(), domains }
    }

    fn backup_domain(&self, session: &dyn HostSession, name: &DomainName) -> Result<WriteOutcome> {
        let config = session.fetch_config(name).with_context(|| format!("fetch {}", name))?;
        let written = self
            .tree
            .write(session.host(), name, &config)
            .with_context(|| format!("store {}", name))?;
        Ok(written)
    }
}
