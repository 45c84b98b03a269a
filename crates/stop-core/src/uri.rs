//! Resource URIs and the router that maps them onto tables.
//!
//! Addresses take the form `content://<authority>/<table>[/<id>]`. A URI
//! without an id addresses the whole table (collection scope); one with a
//! numeric id addresses a single row (item scope).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::{
  authority::Authority,
  schema::{self, TableDescriptor},
  Error, Result,
};

pub const SCHEME: &str = "content";

// ─── ResourceUri ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
  scheme:    String,
  authority: String,
  segments:  Vec<String>,
}

impl ResourceUri {
  /// Parse a URI string. Query and fragment components are ignored.
  ///
  /// The path must already be in normal form: `.` and `..` segments (encoded
  /// or not) and anything else the parser would rewrite are rejected, so the
  /// segments routed are exactly the segments written.
  pub fn parse(s: &str) -> Result<Self> {
    let invalid = |reason: String| Error::InvalidUri { uri: s.to_owned(), reason };
    let url = Url::parse(s).map_err(|e| invalid(e.to_string()))?;
    if url.path() != raw_path(s) {
      return Err(invalid("path is not in normal form".to_owned()));
    }
    let authority = url
      .host_str()
      .ok_or_else(|| invalid("missing authority".to_owned()))?;
    let segments = url
      .path_segments()
      .map(|segs| segs.map(str::to_owned).collect())
      .unwrap_or_default();
    Ok(Self {
      scheme: url.scheme().to_owned(),
      authority: authority.to_owned(),
      segments,
    })
  }

  /// `content://<authority>/<table>`
  pub fn collection(authority: &Authority, table: &str) -> Self {
    Self {
      scheme:    SCHEME.to_owned(),
      authority: authority.as_str().to_owned(),
      segments:  vec![table.to_owned()],
    }
  }

  /// This URI with `id` appended as a trailing path segment.
  pub fn with_id(&self, id: i64) -> Self { self.child(&id.to_string()) }

  /// This URI with `segment` appended verbatim as one path segment. No
  /// splitting or normalisation happens, so a segment containing `/`, `?`,
  /// `#` or dots simply fails to route.
  pub fn child(&self, segment: &str) -> Self {
    let mut uri = self.clone();
    uri.segments.push(segment.to_owned());
    uri
  }

  pub fn scheme(&self) -> &str { &self.scheme }

  pub fn authority(&self) -> &str { &self.authority }

  pub fn segments(&self) -> &[String] { &self.segments }

  /// The URI with its last segment removed.
  pub fn parent(&self) -> Option<Self> {
    let (_, rest) = self.segments.split_last()?;
    Some(Self {
      scheme:    self.scheme.clone(),
      authority: self.authority.clone(),
      segments:  rest.to_vec(),
    })
  }

  /// True when `self` equals `other` or is one of its ancestors.
  pub fn is_prefix_of(&self, other: &ResourceUri) -> bool {
    self.scheme == other.scheme
      && self.authority == other.authority
      && other.segments.starts_with(&self.segments)
  }
}

impl fmt::Display for ResourceUri {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}://{}", self.scheme, self.authority)?;
    for seg in &self.segments {
      write!(f, "/{seg}")?;
    }
    Ok(())
  }
}

impl FromStr for ResourceUri {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl Serialize for ResourceUri {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ResourceUri {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    Self::parse(&s).map_err(serde::de::Error::custom)
  }
}

// ─── Routing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  Collection,
  Item(i64),
}

/// The outcome of routing a URI: which table, and how much of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
  pub table: &'static TableDescriptor,
  pub scope: Scope,
}

impl Route {
  pub fn item_id(&self) -> Option<i64> {
    match self.scope {
      Scope::Item(id) => Some(id),
      Scope::Collection => None,
    }
  }

  pub fn mime_type(&self) -> &'static str {
    schema::mime_type(self.table, self.item_id().is_some())
  }
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
  /// `<table>`
  Dir(&'static TableDescriptor),
  /// `<table>/#`
  Item(&'static TableDescriptor),
}

/// Matches URIs against the two patterns registered per table.
#[derive(Debug, Clone)]
pub struct UriRouter {
  authority: Authority,
  patterns:  Vec<Pattern>,
}

impl UriRouter {
  pub fn new(authority: Authority) -> Self {
    let patterns = schema::all()
      .flat_map(|t| [Pattern::Dir(t), Pattern::Item(t)])
      .collect();
    Self { authority, patterns }
  }

  pub fn authority(&self) -> &Authority { &self.authority }

  /// Resolve `uri` to a table and scope, or fail with
  /// [`Error::UnknownUri`].
  pub fn route(&self, uri: &ResourceUri) -> Result<Route> {
    let unknown = || Error::UnknownUri(uri.to_string());

    if uri.scheme() != SCHEME || uri.authority() != self.authority.as_str() {
      return Err(unknown());
    }

    self
      .patterns
      .iter()
      .find_map(|p| match (*p, uri.segments()) {
        (Pattern::Dir(t), [name]) if name == t.name => {
          Some(Route { table: t, scope: Scope::Collection })
        }
        (Pattern::Item(t), [name, id]) if name == t.name => {
          parse_id(id).map(|id| Route { table: t, scope: Scope::Item(id) })
        }
        _ => None,
      })
      .ok_or_else(unknown)
  }

  pub fn collection_uri(&self, table: &TableDescriptor) -> ResourceUri {
    table.collection_uri(&self.authority)
  }
}

/// The path of `s` exactly as written: everything after the authority up to
/// the query or fragment.
fn raw_path(s: &str) -> &str {
  let rest = s.split_once("://").map_or(s, |(_, rest)| rest);
  let rest = &rest[..rest.find(['?', '#']).unwrap_or(rest.len())];
  rest.find('/').map_or("", |i| &rest[i..])
}

/// The numeric wildcard: one or more ASCII digits that fit an `i64`.
fn parse_id(segment: &str) -> Option<i64> {
  if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  segment.parse().ok()
}
