use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use url::Url;

use crate::error::FetchError;

/// Location of a resource held by some remote repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RemoteResource(Url);

impl RemoteResource {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn parse(text: &str) -> Result<Self, FetchError> {
        text.parse()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    /// Scheme in lower case, the key handlers are registered under.
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn into_url(self) -> Url {
        self.0
    }
}

impl FromStr for RemoteResource {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
            .map(Self)
            .map_err(|e| FetchError::InvalidUrl(format!("{s}: {e}")))
    }
}

impl From<Url> for RemoteResource {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl fmt::Display for RemoteResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a handler knows about a remote resource.
///
/// `Unavailable` stands for both "not found" and "found but with unusable
/// metadata", so callers never mistake an empty answer for success.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RemoteResourceInfo {
    Available {
        len: u64,
        last_modified: Option<SystemTime>,
        content_type: Option<String>,
    },
    #[default]
    Unavailable,
}

impl RemoteResourceInfo {
    /// Build from a reported length; unknown, zero or negative lengths are
    /// `Unavailable`.
    pub fn from_len(
        len: Option<i64>,
        last_modified: Option<SystemTime>,
        content_type: Option<String>,
    ) -> Self {
        match len {
            Some(len) if len > 0 => Self::Available {
                len: len as u64,
                last_modified,
                content_type,
            },
            _ => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Available { len, .. } => Some(*len),
            Self::Unavailable => None,
        }
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        match self {
            Self::Available { last_modified, .. } => *last_modified,
            Self::Unavailable => None,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Available { content_type, .. } => content_type.as_deref(),
            Self::Unavailable => None,
        }
    }
}
