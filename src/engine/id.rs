//! # Application identity.
//!
//! Every registered application is assigned an [`ApplicationId`] at registration
//! time. The id is immutable, unique within one environment, used as the lookup
//! key for all later operations, and never reused after removal.
//!
//! Id production is pluggable through [`ApplicationIdBuilder`]; the default
//! builder combines the environment name, the configured application name and a
//! random suffix, so repeated registrations of the same topology never collide.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Conf;
use crate::error::EnvError;

/// Configuration key read by [`DefaultApplicationIdBuilder`] for the
/// application's logical name.
pub const APPLICATION_NAME_CONFIG: &str = "application.name";

/// Immutable identity of one application within an environment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(String);

impl ApplicationId {
    /// Wraps a raw id string.
    pub fn new(id: impl Into<String>) -> Self {
        ApplicationId(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApplicationId {
    fn from(id: &str) -> Self {
        ApplicationId(id.to_owned())
    }
}

impl From<String> for ApplicationId {
    fn from(id: String) -> Self {
        ApplicationId(id)
    }
}

/// Produces a new [`ApplicationId`] from the environment name and the
/// application's effective configuration.
///
/// Failures here propagate to the caller of `add_topology`; unlike interceptor
/// failures they are never swallowed.
pub trait ApplicationIdBuilder: Send + Sync + 'static {
    /// Builds a fresh id.
    fn build(&self, environment: &str, conf: &Conf) -> Result<ApplicationId, EnvError>;
}

/// Default identity scheme: `<environment>-<application.name>-<random suffix>`.
///
/// All segments are sanitized to `[a-z0-9._-]`. The 8-character random suffix
/// keeps ids unique when the same topology is registered more than once.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultApplicationIdBuilder;

impl DefaultApplicationIdBuilder {
    fn sanitize(raw: &str) -> String {
        raw.to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl ApplicationIdBuilder for DefaultApplicationIdBuilder {
    fn build(&self, environment: &str, conf: &Conf) -> Result<ApplicationId, EnvError> {
        if environment.is_empty() {
            return Err(EnvError::IdBuild {
                reason: "environment name is empty".into(),
            });
        }
        let name = conf.get_str(APPLICATION_NAME_CONFIG).unwrap_or("streams");
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!(
            "{}-{}-{}",
            Self::sanitize(environment),
            Self::sanitize(name),
            &suffix[..8]
        );
        Ok(ApplicationId(id))
    }
}
