use std::collections::BTreeSet;

use kdb_core::{DomainName, HostId};

use crate::error::SourceError;

/// Something that can open read-only sessions to virtualization hosts.
pub trait HypervisorSource: Send + Sync {
    fn open(&self, host: &HostId) -> Result<Box<dyn HostSession>, SourceError>;
}

/// An open session to one host. Release it with [`HostSession::close`].
pub trait HostSession: Send {
    fn host(&self) -> &HostId;

    /// Snapshot of the domain names the host reports right now.
    fn list_domain_names(&self) -> Result<BTreeSet<DomainName>, SourceError>;

    /// Full configuration description of one domain, opaque bytes.
    fn fetch_config(&self, domain: &DomainName) -> Result<Vec<u8>, SourceError>;

    fn close(self: Box<Self>) -> Result<(), SourceError>;
}
