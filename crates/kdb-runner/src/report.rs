use kdb_core::{DomainName, HostId, RunId};
use kdb_tree::PreviousGeneration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainOutcome {
    Written(PreviousGeneration),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOutcome {
    /// Rotated and every listed domain attempted.
    Completed {
        quarantined: usize,
        discarded: usize,
        domains: Vec<(DomainName, DomainOutcome)>,
    },
    /// Never reached; its backups were left untouched.
    Skipped(String),
    /// Reached, but rotation failed so nothing was written.
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub hosts: Vec<(HostId, HostOutcome)>,
}

impl RunReport {
    pub fn new(run_id: RunId) -> Self {
        Self { run_id, hosts: Vec::new() }
    }

    pub fn has_failures(&self) -> bool {
        self.hosts.iter().any(|(_, outcome)| match outcome {
            HostOutcome::Completed { domains, .. } => {
                domains.iter().any(|(_, d)| matches!(d, DomainOutcome::Failed(_)))
            }
            HostOutcome::Skipped(_) | HostOutcome::Failed(_) => true,
        })
    }

    pub fn outcome(&self, host: &HostId) -> Option<&HostOutcome> {
        self.hosts.iter().find(|(h, _)| h == host).map(|(_, o)| o)
    }

    pub fn summary(&self) -> String {
        let (mut completed, mut skipped, mut failed) = (0, 0, 0);
        let (mut written, mut changed, mut domain_failures) = (0, 0, 0);
        for (_, outcome) in &self.hosts {
            match outcome {
                HostOutcome::Completed { domains, .. } => {
                    completed += 1;
                    for (_, d) in domains {
                        match d {
                            DomainOutcome::Written(prev) => {
                                written += 1;
                                if *prev != PreviousGeneration::Unchanged {
                                    changed += 1;
                                }
                            }
                            DomainOutcome::Failed(_) => domain_failures += 1,
                        }
                    }
                }
                HostOutcome::Skipped(_) => skipped += 1,
                HostOutcome::Failed(_) => failed += 1,
            }
        }
        format!(
            "{} hosts ({} completed, {} skipped, {} failed); {} domains written ({} new or changed), {} failed",
            self.hosts.len(),
            completed,
            skipped,
            failed,
            written,
            changed,
            domain_failures
        )
    }
}
