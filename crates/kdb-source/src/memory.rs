use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use kdb_core::{DomainName, HostId};

use crate::error::SourceError;
use crate::traits::{HostSession, HypervisorSource};

/// In-memory hypervisor source for tests. Each `open` snapshots the host's
/// domains, so later edits to the source do not leak into open sessions.
#[derive(Default, Clone)]
pub struct InMemorySource {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    hosts: BTreeMap<HostId, HostState>,
    open_sessions: usize,
    opened_total: usize,
}

#[derive(Clone, Default)]
struct HostState {
    unreachable: Option<String>,
    domains: BTreeMap<DomainName, Vec<u8>>,
    broken: BTreeSet<DomainName>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(self, host: &HostId, domain: &DomainName, config: impl Into<Vec<u8>>) -> Self {
        self.set_domain(host, domain, config);
        self
    }

    pub fn set_domain(&self, host: &HostId, domain: &DomainName, config: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().unwrap();
        let state = inner.hosts.entry(host.clone()).or_default();
        state.domains.insert(domain.clone(), config.into());
    }

    pub fn remove_domain(&self, host: &HostId, domain: &DomainName) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(state) = inner.hosts.get_mut(host) {
            state.domains.remove(domain);
        }
    }

    /// Registers an empty, reachable host.
    pub fn with_host(self, host: &HostId) -> Self {
        self.inner.lock().unwrap().hosts.entry(host.clone()).or_default();
        self
    }

    pub fn unreachable(self, host: &HostId, reason: &str) -> Self {
        self.set_unreachable(host, Some(reason));
        self
    }

    pub fn set_unreachable(&self, host: &HostId, reason: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        inner.hosts.entry(host.clone()).or_default().unreachable = reason.map(str::to_string);
    }

    /// Listed, but every fetch of it fails.
    pub fn broken_domain(self, host: &HostId, domain: &DomainName) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let state = inner.hosts.entry(host.clone()).or_default();
            state.domains.entry(domain.clone()).or_default();
            state.broken.insert(domain.clone());
        }
        self
    }

    pub fn open_sessions(&self) -> usize {
        self.inner.lock().unwrap().open_sessions
    }

    pub fn opened_total(&self) -> usize {
        self.inner.lock().unwrap().opened_total
    }
}

impl HypervisorSource for InMemorySource {
    fn open(&self, host: &HostId) -> Result<Box<dyn HostSession>, SourceError> {
        let mut inner = self.inner.lock().unwrap();
        let state = match inner.hosts.get(host) {
            Some(state) => state.clone(),
            None => {
                return Err(SourceError::Connectivity { host: host.clone(), reason: "unknown host".into() });
            }
        };
        if let Some(reason) = state.unreachable {
            return Err(SourceError::Connectivity { host: host.clone(), reason });
        }
        inner.open_sessions += 1;
        inner.opened_total += 1;
        Ok(Box::new(InMemorySession {
            host: host.clone(),
            domains: state.domains,
            broken: state.broken,
            source: Arc::clone(&self.inner),
        }))
    }
}

struct InMemorySession {
    host: HostId,
    domains: BTreeMap<DomainName, Vec<u8>>,
    broken: BTreeSet<DomainName>,
    source: Arc<Mutex<Inner>>,
}

impl HostSession for InMemorySession {
    fn host(&self) -> &HostId {
        &self.host
    }

    fn list_domain_names(&self) -> Result<BTreeSet<DomainName>, SourceError> {
        Ok(self.domains.keys().cloned().collect())
    }

    fn fetch_config(&self, domain: &DomainName) -> Result<Vec<u8>, SourceError> {
        if self.broken.contains(domain) {
            return Err(SourceError::Fetch {
                host: self.host.clone(),
                domain: domain.clone(),
                reason: "simulated failure".into(),
            });
        }
        self.domains.get(domain).cloned().ok_or_else(|| SourceError::UnknownDomain {
            host: self.host.clone(),
            domain: domain.clone(),
        })
    }

    fn close(self: Box<Self>) -> Result<(), SourceError> {
        let mut inner = self.source.lock().unwrap();
        inner.open_sessions = inner.open_sessions.saturating_sub(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::SessionGuard;

    fn host(s: &str) -> HostId {
        HostId::parse(s).unwrap()
    }

    fn dom(s: &str) -> DomainName {
        DomainName::parse(s).unwrap()
    }

    #[test]
    fn sessions_see_a_snapshot() {
        let h = host("h");
        let src = InMemorySource::new().with_domain(&h, &dom("vm1"), "<a/>");
        let session = src.open(&h).unwrap();
        src.set_domain(&h, &dom("vm2"), "<b/>");

        let names = session.list_domain_names().unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec![dom("vm1")]);
        assert_eq!(session.fetch_config(&dom("vm1")).unwrap(), b"<a/>");
        assert!(matches!(session.fetch_config(&dom("vm2")), Err(SourceError::UnknownDomain { .. })));
        session.close().unwrap();
    }

    #[test]
    fn unreachable_host_is_a_connectivity_error() {
        let h = host("down");
        let src = InMemorySource::new().unreachable(&h, "no route to host");
        let err = src.open(&h).err().unwrap();
        assert!(err.is_connectivity());
        assert_eq!(src.open_sessions(), 0);
    }

    #[test]
    fn guard_closes_on_drop() {
        let h = host("h");
        let src = InMemorySource::new().with_host(&h);
        {
            let guard = SessionGuard::new(src.open(&h).unwrap());
            assert_eq!(guard.host(), &h);
            assert_eq!(src.open_sessions(), 1);
        }
        assert_eq!(src.open_sessions(), 0);

        let guard = SessionGuard::new(src.open(&h).unwrap());
        guard.close().unwrap();
        assert_eq!(src.open_sessions(), 0);
        assert_eq!(src.opened_total(), 2);
    }
}
