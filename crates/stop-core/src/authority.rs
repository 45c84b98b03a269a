//! The namespace every resource URI of this store lives under.
//!
//! The authority is derived from the hosting package so the same store can be
//! embedded in several builds or flavours without address clashes.

use std::fmt;

use serde::{Deserialize, Serialize};

const AUTHORITY_SUFFIX: &str = ".database.provider.game";

/// Identity of the process hosting the store, i.e. its package name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessIdentity(pub String);

impl From<&str> for ProcessIdentity {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for ProcessIdentity {
  fn from(s: String) -> Self { Self(s) }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
  /// Pure function of the package identity; call it on every store
  /// construction rather than caching a value from another identity.
  pub fn resolve(identity: &ProcessIdentity) -> Self {
    Self(format!("{}{AUTHORITY_SUFFIX}", identity.0))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Authority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn authority_follows_package() {
    let a = Authority::resolve(&"com.aware.app.stop".into());
    assert_eq!(a.as_str(), "com.aware.app.stop.database.provider.game");

    let b = Authority::resolve(&"org.example.flavour".into());
    assert_eq!(b.as_str(), "org.example.flavour.database.provider.game");
    assert_ne!(a, b);
  }
}
