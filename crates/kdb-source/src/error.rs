use kdb_core::{DomainName, HostId, NameError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The host could not be reached or refused the session.
    #[error("cannot reach {host}: {reason}")]
    Connectivity { host: HostId, reason: String },
    #[error("{host} has no domain named {domain}")]
    UnknownDomain { host: HostId, domain: DomainName },
    #[error("fetching {domain} from {host} failed: {reason}")]
    Fetch { host: HostId, domain: DomainName, reason: String },
    #[error("{host} reported an unusable domain name: {source}")]
    InvalidName {
        host: HostId,
        #[source]
        source: NameError,
    },
}

impl SourceError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SourceError::Connectivity { .. })
    }
}
