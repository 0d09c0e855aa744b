use std::fmt;

use thiserror::Error;

use crate::layout::{CONFIG_SUFFIX, QUARANTINE_DIR};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("{kind} name is empty")]
    Empty { kind: &'static str },
    #[error("{kind} name {name:?} is not a single path component")]
    NotAComponent { kind: &'static str, name: String },
    #[error("host name {0:?} collides with the quarantine directory")]
    Reserved(String),
}

/// Both names end up as a single directory or file name under the backup root.
fn check_component(kind: &'static str, name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty { kind });
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        return Err(NameError::NotAComponent { kind, name: name.to_string() });
    }
    Ok(())
}

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

name_newtype!(HostId);
name_newtype!(DomainName);

impl HostId {
    pub fn parse(s: impl Into<String>) -> Result<Self, NameError> {
        let s = s.into();
        check_component("host", &s)?;
        if s == QUARANTINE_DIR {
            return Err(NameError::Reserved(s));
        }
        Ok(Self(s))
    }
}

impl DomainName {
    pub fn parse(s: impl Into<String>) -> Result<Self, NameError> {
        let s = s.into();
        check_component("domain", &s)?;
        Ok(Self(s))
    }

    /// `<name>.xml`, the file holding this domain's configuration.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, CONFIG_SUFFIX)
    }

    /// Inverse of [`DomainName::file_name`]; `None` for anything else.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(CONFIG_SUFFIX)?;
        Self::parse(stem).ok()
    }
}
