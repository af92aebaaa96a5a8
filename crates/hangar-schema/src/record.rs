//! Catalog entries and install records.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::types::ModId;

/// One installable version of a mod, as published in the repository bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModRecord {
    /// Logical mod name shared by all of its versions.
    pub identifier: String,

    /// Loosely structured version string (see [`crate::version`]).
    pub version: String,

    /// Display name; falls back to the identifier when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// One-line summary.
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Long-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Authors, accepted as a single string or a list.
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<String>,

    /// Licenses, accepted as a single string or a list.
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub license: Vec<String>,

    /// Exact game version this release targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksp_version: Option<String>,

    /// Lowest game version this release supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksp_version_min: Option<String>,

    /// Highest game version this release supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksp_version_max: Option<String>,

    /// Hard dependencies, in declaration order.
    #[serde(default, deserialize_with = "relationships", skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<Relationship>,

    /// Soft dependencies shown to the operator.
    #[serde(default, deserialize_with = "relationships", skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<Relationship>,

    /// Optional companions shown to the operator.
    #[serde(default, deserialize_with = "relationships", skip_serializing_if = "Vec::is_empty")]
    pub suggests: Vec<Relationship>,

    /// Virtual names this mod satisfies in addition to its identifier.
    #[serde(default, deserialize_with = "relationships", skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<Relationship>,

    /// File placement directives. `None` selects the `GameData/` convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<Vec<InstallDirective>>,

    /// Package or metapackage.
    #[serde(default)]
    pub kind: ModKind,

    /// Archive URL; absent only for metapackages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,

    /// Advertised archive size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_size: Option<u64>,

    /// Auxiliary links (homepage, repository, bug tracker...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, serde_json::Value>,
}

/// Reference to another mod by identifier or `provides` alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Identifier or alias.
    pub name: String,
}

impl Relationship {
    /// Create a relationship naming `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Whether a record carries an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModKind {
    /// Regular mod with a downloadable archive (default).
    #[default]
    Package,
    /// Pure dependency bundle; nothing to download or copy.
    Metapackage,
    /// Any kind this version of hangar does not know about.
    #[serde(other)]
    Other,
}

/// How one group of archive files is selected and where it lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDirective", into = "RawDirective")]
pub struct InstallDirective {
    /// Which archive paths the directive selects.
    pub matcher: Matcher,
    /// Directory, relative to the game directory, that receives the files.
    pub install_to: String,
}

/// The single selection rule of an [`InstallDirective`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Archive paths starting with this prefix.
    File(String),
    /// Archive paths whose directory contains this substring.
    Find(String),
    /// Archive paths matching this regular expression.
    FindRegexp(String),
}

/// Errors raised while validating an [`InstallDirective`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DirectiveError {
    /// None of `file`, `find`, `find_regexp` was given.
    #[error("install directive needs one of file, find or find_regexp")]
    MissingMatcher,

    /// More than one matcher was given.
    #[error("install directive has more than one of file, find and find_regexp")]
    AmbiguousMatcher,

    /// `install_to` was empty.
    #[error("install directive has an empty install_to")]
    EmptyTarget,
}

#[derive(Serialize, Deserialize)]
struct RawDirective {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    find: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    find_regexp: Option<String>,
    install_to: String,
}

impl TryFrom<RawDirective> for InstallDirective {
    type Error = DirectiveError;

    fn try_from(raw: RawDirective) -> Result<Self, Self::Error> {
        let matcher = match (raw.file, raw.find, raw.find_regexp) {
            (Some(file), None, None) => Matcher::File(file),
            (None, Some(find), None) => Matcher::Find(find),
            (None, None, Some(pattern)) => Matcher::FindRegexp(pattern),
            (None, None, None) => return Err(DirectiveError::MissingMatcher),
            _ => return Err(DirectiveError::AmbiguousMatcher),
        };
        if raw.install_to.is_empty() {
            return Err(DirectiveError::EmptyTarget);
        }
        Ok(Self {
            matcher,
            install_to: raw.install_to,
        })
    }
}

impl From<InstallDirective> for RawDirective {
    fn from(directive: InstallDirective) -> Self {
        let mut raw = RawDirective {
            file: None,
            find: None,
            find_regexp: None,
            install_to: directive.install_to,
        };
        match directive.matcher {
            Matcher::File(file) => raw.file = Some(file),
            Matcher::Find(find) => raw.find = Some(find),
            Matcher::FindRegexp(pattern) => raw.find_regexp = Some(pattern),
        }
        raw
    }
}

/// Why a bundle entry was refused at ingest.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    /// The entry is not valid JSON or does not fit the record shape.
    #[error("invalid mod record: {0}")]
    Json(#[from] serde_json::Error),

    /// The entry is a JSON value other than an object.
    #[error("entry is not a JSON object")]
    NotAnObject,

    /// The entry is a repository-level document, not a mod.
    #[error("entry is a '{0}' document, not a mod record")]
    NotAModRecord(&'static str),

    /// A required field is empty.
    #[error("empty field: {0}")]
    EmptyField(&'static str),

    /// A package without a download URL.
    #[error("'{0}' has no download URL")]
    MissingDownload(String),

    /// The identifier contains the id separator.
    #[error("identifier '{0}' contains the reserved separator")]
    ReservedSeparator(String),
}

/// Top-level keys marking documents that share the bundle but are not mods.
const FOREIGN_DOCUMENT_KEYS: [&str; 2] = ["repositories", "builds"];

impl ModRecord {
    /// Parse and validate one bundle entry.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] when the bytes are not a JSON object with the
    /// record shape, when the entry is a repository or builds document, or
    /// when [`ModRecord::validate`] fails.
    pub fn from_json(bytes: &[u8]) -> Result<Self, IngestError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let object = value.as_object().ok_or(IngestError::NotAnObject)?;
        if let Some(key) = FOREIGN_DOCUMENT_KEYS
            .into_iter()
            .find(|key| object.contains_key(*key))
        {
            return Err(IngestError::NotAModRecord(key));
        }

        let record: ModRecord = serde_json::from_value(value)?;
        record.validate()?;
        Ok(record)
    }

    /// Check the invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.identifier.is_empty() {
            return Err(IngestError::EmptyField("identifier"));
        }
        if self.version.is_empty() {
            return Err(IngestError::EmptyField("version"));
        }
        if self.identifier.contains(crate::ID_SEPARATOR) {
            return Err(IngestError::ReservedSeparator(self.identifier.clone()));
        }
        if self.kind != ModKind::Metapackage && self.download.is_none() {
            return Err(IngestError::MissingDownload(self.identifier.clone()));
        }
        Ok(())
    }

    /// The unique catalog key.
    pub fn id(&self) -> ModId {
        ModId::new(&self.identifier, &self.version)
    }

    /// Display name, or the identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }

    /// Whether this record carries nothing to download.
    pub fn is_metapackage(&self) -> bool {
        self.kind == ModKind::Metapackage
    }

    /// Identifier followed by every `provides` alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.identifier.as_str())
            .chain(self.provides.iter().map(|p| p.name.as_str()))
    }

    /// Whether the record answers to `name` by identifier or alias.
    pub fn answers_to(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }
}

/// Bookkeeping for one installed (or installing) mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    /// The installed catalog entry.
    pub id: ModId,
    /// Files copied into the game directory; `None` while the install is in flight.
    pub files: Option<Vec<String>>,
    /// Unix timestamp of the commit.
    pub installed_at: Option<i64>,
}

impl InstallRecord {
    /// Whether the install has not committed yet.
    pub fn is_pending(&self) -> bool {
        self.files.is_none()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Relationship lists hold objects with a `name`, bare strings (the usual
/// `provides` form), or groups such as `any_of` that carry no name. Unnamed
/// entries are skipped.
fn relationships<'de, D>(deserializer: D) -> Result<Vec<Relationship>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRelationship {
        Bare(String),
        Named { name: String },
        Unnamed(serde_json::Value),
    }

    let raw = Vec::<RawRelationship>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|entry| match entry {
            RawRelationship::Bare(name) | RawRelationship::Named { name } => {
                Some(Relationship { name })
            }
            RawRelationship::Unnamed(_) => None,
        })
        .collect())
}
