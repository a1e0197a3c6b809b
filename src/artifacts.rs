//! Artifact manifest staging and package requirement validation.
//!
//! Sessions accept a dependency manifest listing packages to install on
//! the driver and executors. Before staging, the client parses each
//! requirement and rejects sets whose combined version specifiers are
//! unsatisfiable, so a bad manifest fails fast instead of during remote
//! installation.
//!
//! The version scheme does not support epochs or ranges over local, pre,
//! or post-release suffixes. Exact string matching is available via
//! `===`, and plain release triples work for every operator (even when
//! minor or patch components are missing).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, SparkConnectError};

/// Version comparison operators accepted in requirement strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    /// `~=` compatible release
    Compatible,
    /// `==` prefix match over the release triple
    Matching,
    /// `!=` exclusion
    Excluding,
    /// `<=`
    Leq,
    /// `>=`
    Geq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `===` exact string match
    Exact,
}

impl VersionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionOp::Compatible => "~=",
            VersionOp::Matching => "==",
            VersionOp::Excluding => "!=",
            VersionOp::Leq => "<=",
            VersionOp::Geq => ">=",
            VersionOp::Lt => "<",
            VersionOp::Gt => ">",
            VersionOp::Exact => "===",
        }
    }

    /// Split a specifier into operator and version text.
    ///
    /// Longest operators match first so `===` is not read as `==`.
    fn split(spec: &str) -> Option<(VersionOp, &str)> {
        const OPS: [(&str, VersionOp); 8] = [
            ("===", VersionOp::Exact),
            ("~=", VersionOp::Compatible),
            ("==", VersionOp::Matching),
            ("!=", VersionOp::Excluding),
            ("<=", VersionOp::Leq),
            (">=", VersionOp::Geq),
            ("<", VersionOp::Lt),
            (">", VersionOp::Gt),
        ];
        for (text, op) in OPS {
            if let Some(rest) = spec.strip_prefix(text) {
                return Some((op, rest));
            }
        }
        None
    }
}

/// A single version constraint, e.g. `>=2.28.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub op: VersionOp,
    pub version: String,
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// A parsed package requirement, e.g. `requests>=2.28.0,<3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub specifiers: Vec<Specifier>,
}

impl Requirement {
    /// Parse a requirement string.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let name_end = raw
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'))
            .unwrap_or(raw.len());
        let name = &raw[..name_end];
        if name.is_empty() {
            return Err(SparkConnectError::InvalidRequirement(raw.to_string()));
        }

        let rest = raw[name_end..].trim();
        let mut specifiers = Vec::new();
        if !rest.is_empty() {
            for part in rest.split(',') {
                let part = part.trim();
                let (op, version) = VersionOp::split(part)
                    .ok_or_else(|| SparkConnectError::InvalidRequirement(raw.to_string()))?;
                let version = version.trim();
                if version.is_empty() {
                    return Err(SparkConnectError::InvalidRequirement(raw.to_string()));
                }
                specifiers.push(Specifier {
                    op,
                    version: version.to_string(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            specifiers,
        })
    }

    /// A requirement without any specifier installs "whatever is latest".
    pub fn is_pinned(&self) -> bool {
        !self.specifiers.is_empty()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (i, spec) in self.specifiers.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{spec}")?;
        }
        Ok(())
    }
}

/// A release version of up to three numeric components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionTriple {
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
}

impl VersionTriple {
    /// Parse the leading release components of a version string.
    ///
    /// Suffix segments (`1.0.post1`, `2.1rc1`) are ignored beyond their
    /// numeric prefix, matching release-only comparison; a trailing `.*`
    /// is dropped so `==1.0.*` behaves like a prefix match.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.strip_suffix(".*").unwrap_or(raw);
        let mut components = Vec::new();
        for segment in raw.split('.') {
            let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() || digits.len() != segment.len() {
                // Stop at the first non-numeric segment; a leading numeric
                // prefix of a mixed segment still counts (e.g. "2rc1").
                if !digits.is_empty() {
                    components.push(digits.parse::<u64>().map_err(|_| {
                        SparkConnectError::InvalidRequirement(raw.to_string())
                    })?);
                }
                break;
            }
            components.push(
                digits
                    .parse::<u64>()
                    .map_err(|_| SparkConnectError::InvalidRequirement(raw.to_string()))?,
            );
        }

        match components.len() {
            0 => Err(SparkConnectError::InvalidRequirement(raw.to_string())),
            1 => Ok(Self {
                major: components[0],
                minor: None,
                patch: None,
            }),
            2 => Ok(Self {
                major: components[0],
                minor: Some(components[1]),
                patch: None,
            }),
            3 => Ok(Self {
                major: components[0],
                minor: Some(components[1]),
                patch: Some(components[2]),
            }),
            _ => Err(SparkConnectError::InvalidRequirement(raw.to_string())),
        }
    }

    /// Compare at triple granularity, missing components counting as 0.
    fn cmp_release(&self, other: &Self) -> Ordering {
        let key = |v: &Self| (v.major, v.minor.unwrap_or(0), v.patch.unwrap_or(0));
        key(self).cmp(&key(other))
    }

    /// Bump the smallest defined component.
    ///
    /// This turns an inclusive bound into an exclusive one (and vice
    /// versa) at the granularity the version was written in.
    fn bump(&self) -> Self {
        match (self.minor, self.patch) {
            (Some(minor), Some(patch)) => Self {
                major: self.major,
                minor: Some(minor),
                patch: Some(patch + 1),
            },
            (Some(minor), None) => Self {
                major: self.major,
                minor: Some(minor + 1),
                patch: None,
            },
            (None, _) => Self {
                major: self.major + 1,
                minor: None,
                patch: None,
            },
        }
    }

    /// Upper bound of a `~=` compatible-release span.
    fn bump_compatible(&self) -> Result<Self> {
        match (self.minor, self.patch) {
            (None, _) => Err(SparkConnectError::InvalidRequirement(
                "~= compatibility operator cannot be used with major-only version".to_string(),
            )),
            (Some(_), None) => Ok(Self {
                major: self.major + 1,
                minor: None,
                patch: None,
            }),
            (Some(minor), Some(_)) => Ok(Self {
                major: self.major,
                minor: Some(minor + 1),
                patch: None,
            }),
        }
    }
}

/// A half-open span of versions: inclusive lower, exclusive upper.
/// `None` bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
struct VersionSpan {
    lower: Option<VersionTriple>,
    upper: Option<VersionTriple>,
}

impl VersionSpan {
    fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    fn contains(&self, version: &VersionTriple) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(lower) => version.cmp_release(lower) != Ordering::Less,
        };
        let below_upper = match &self.upper {
            None => true,
            Some(upper) => version.cmp_release(upper) == Ordering::Less,
        };
        above_lower && below_upper
    }

    /// Intersect two spans; `None` when they don't overlap.
    fn intersect(&self, other: &Self) -> Option<Self> {
        let lower = match (self.lower, other.lower) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(if a.cmp_release(&b) == Ordering::Less { b } else { a }),
        };
        let upper = match (self.upper, other.upper) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(if a.cmp_release(&b) == Ordering::Less { a } else { b }),
        };
        if let (Some(lower), Some(upper)) = (&lower, &upper) {
            if lower.cmp_release(upper) != Ordering::Less {
                return None;
            }
        }
        Some(Self { lower, upper })
    }
}

/// The set of versions admitted by a collection of specifiers.
#[derive(Debug, Clone, PartialEq)]
enum VersionSet {
    /// No constraint seen yet.
    All,
    /// Unsatisfiable.
    Empty,
    /// Exact string pin (`===`).
    Exact(String),
    /// Disjoint union of spans.
    Spans(Vec<VersionSpan>),
}

impl VersionSet {
    fn is_empty(&self) -> bool {
        matches!(self, VersionSet::Empty)
    }

    fn from_specifier(spec: &Specifier) -> Result<Self> {
        if spec.op == VersionOp::Exact {
            return Ok(VersionSet::Exact(spec.version.clone()));
        }
        let version = VersionTriple::parse(&spec.version)?;
        let spans = match spec.op {
            VersionOp::Compatible => vec![VersionSpan {
                lower: Some(version),
                upper: Some(version.bump_compatible()?),
            }],
            VersionOp::Matching => vec![VersionSpan {
                lower: Some(version),
                upper: Some(version.bump()),
            }],
            VersionOp::Excluding => vec![
                VersionSpan {
                    lower: None,
                    upper: Some(version),
                },
                VersionSpan {
                    lower: Some(version.bump()),
                    upper: None,
                },
            ],
            VersionOp::Leq => vec![VersionSpan {
                lower: None,
                upper: Some(version.bump()),
            }],
            VersionOp::Geq => vec![VersionSpan {
                lower: Some(version),
                upper: None,
            }],
            VersionOp::Lt => vec![VersionSpan {
                lower: None,
                upper: Some(version),
            }],
            VersionOp::Gt => vec![VersionSpan {
                lower: Some(version.bump()),
                upper: None,
            }],
            VersionOp::Exact => unreachable!(),
        };
        Ok(VersionSet::Spans(spans))
    }

    fn intersect(self, other: Self) -> Result<Self> {
        use VersionSet::*;
        Ok(match (self, other) {
            (All, set) | (set, All) => set,
            (Empty, _) | (_, Empty) => Empty,
            (Exact(a), Exact(b)) => {
                if a == b {
                    Exact(a)
                } else {
                    Empty
                }
            }
            (Exact(pin), Spans(spans)) | (Spans(spans), Exact(pin)) => {
                let version = VersionTriple::parse(&pin)?;
                if spans.iter().any(|span| span.contains(&version)) {
                    Exact(pin)
                } else {
                    Empty
                }
            }
            (Spans(a), Spans(b)) => {
                let mut joined = Vec::new();
                for left in &a {
                    for right in &b {
                        if let Some(span) = left.intersect(right) {
                            joined.push(span);
                        }
                    }
                }
                if joined.is_empty() {
                    Empty
                } else {
                    Spans(joined)
                }
            }
        })
    }
}

/// Verify that the combined specifiers of every package admit at least
/// one version.
///
/// Returns the names of unsatisfiable packages, in first-seen order, as
/// an [`SparkConnectError::InconsistentRequirements`] error.
pub fn check_consistency<'a, I>(requirements: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Requirement>,
{
    let mut sets: BTreeMap<String, VersionSet> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();

    for requirement in requirements {
        let entry = sets
            .entry(requirement.name.clone())
            .or_insert_with(|| {
                order.push(requirement.name.clone());
                VersionSet::All
            })
            .clone();
        let mut merged = entry;
        for spec in &requirement.specifiers {
            merged = merged.intersect(VersionSet::from_specifier(spec)?)?;
        }
        sets.insert(requirement.name.clone(), merged);
    }

    let broken: Vec<String> = order
        .into_iter()
        .filter(|name| sets.get(name).is_some_and(VersionSet::is_empty))
        .collect();

    if broken.is_empty() {
        Ok(())
    } else {
        Err(SparkConnectError::InconsistentRequirements(broken))
    }
}

/// Wire format of a staged dependency manifest.
#[derive(Serialize)]
struct DepsFile {
    #[serde(rename = "client-version")]
    client_version: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    packages: Vec<String>,
}

/// A validated set of package requirements ready to stage for a session.
#[derive(Debug, Clone)]
pub struct ArtifactManifest {
    requirements: Vec<Requirement>,
}

impl ArtifactManifest {
    /// Parse and validate a set of requirement strings.
    pub fn new<I, S>(packages: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requirements = packages
            .into_iter()
            .map(|raw| Requirement::parse(raw.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        if requirements.iter().any(|req| !req.is_pinned()) {
            info!("it is recommended to pin the version of the package");
        }
        check_consistency(&requirements)?;

        Ok(Self { requirements })
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Write the dependency manifest for `session_uuid` under `dir` and
    /// return its path.
    ///
    /// Every call picks a fresh file name; the upload rejects a file it
    /// has already seen.
    pub fn stage(&self, session_uuid: &str, dir: &Path) -> Result<PathBuf> {
        const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..6)
            .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
            .collect();

        let deps = DepsFile {
            client_version: env!("CARGO_PKG_VERSION"),
            kind: "PYPI",
            packages: self.requirements.iter().map(|r| r.to_string()).collect(),
        };

        let path = dir.join(format!(".deps-{session_uuid}-{suffix}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(&deps)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement(raw: &str) -> Requirement {
        Requirement::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_plain_name() {
        let req = requirement("pandas");
        assert_eq!(req.name, "pandas");
        assert!(req.specifiers.is_empty());
        assert!(!req.is_pinned());
    }

    #[test]
    fn test_parse_with_specifiers() {
        let req = requirement("requests>=2.28.0,<3");
        assert_eq!(req.name, "requests");
        assert_eq!(req.specifiers.len(), 2);
        assert_eq!(req.specifiers[0].op, VersionOp::Geq);
        assert_eq!(req.specifiers[0].version, "2.28.0");
        assert_eq!(req.specifiers[1].op, VersionOp::Lt);
        assert!(req.is_pinned());
    }

    #[test]
    fn test_parse_exact_not_confused_with_matching() {
        let req = requirement("spacy===3.8.4");
        assert_eq!(req.specifiers[0].op, VersionOp::Exact);
        assert_eq!(req.specifiers[0].version, "3.8.4");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Requirement::parse("").is_err());
        assert!(Requirement::parse(">=1.0").is_err());
        assert!(Requirement::parse("numpy=>=1.0").is_err());
        assert!(Requirement::parse("numpy==").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let req = requirement("torch~=2.1,!=2.1.1");
        assert_eq!(req.to_string(), "torch~=2.1,!=2.1.1");
    }

    #[test]
    fn test_version_parse_release_only() {
        assert_eq!(
            VersionTriple::parse("1.0.post1").unwrap(),
            VersionTriple::parse("1.0").unwrap()
        );
        assert_eq!(
            VersionTriple::parse("1.0.*").unwrap(),
            VersionTriple::parse("1.0").unwrap()
        );
        assert!(VersionTriple::parse("abc").is_err());
        assert!(VersionTriple::parse("1.2.3.4").is_err());
    }

    #[test]
    fn test_consistent_set() {
        let reqs = vec![
            requirement("requests>2.28.0"),
            requirement("numpy>1.0"),
            requirement("scipy>1.0"),
            requirement("pandas"),
        ];
        assert!(check_consistency(&reqs).is_ok());
    }

    #[test]
    fn test_disjoint_ranges_are_inconsistent() {
        let reqs = vec![requirement("requests>2.28.0"), requirement("requests<2.10")];
        let err = check_consistency(&reqs).unwrap_err();
        match err {
            SparkConnectError::InconsistentRequirements(names) => {
                assert_eq!(names, vec!["requests".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_conflicting_pins_are_inconsistent() {
        // Release-only comparison: 1.0.post1 is the 1.0 series, which
        // cannot also be 1.1.1.
        let reqs = vec![
            requirement("numpy==1.0.post1"),
            requirement("numpy==1.1.1"),
        ];
        assert!(check_consistency(&reqs).is_err());
    }

    #[test]
    fn test_exclusion_splits_range() {
        let reqs = vec![requirement("torch>=2.0,<3"), requirement("torch!=2.1")];
        assert!(check_consistency(&reqs).is_ok());

        let pinned_out = vec![requirement("torch==2.1"), requirement("torch!=2.1")];
        assert!(check_consistency(&pinned_out).is_err());
    }

    #[test]
    fn test_compatible_release_span() {
        let ok = vec![requirement("lib~=1.4"), requirement("lib==1.9")];
        assert!(check_consistency(&ok).is_ok());

        let out_of_span = vec![requirement("lib~=1.4"), requirement("lib==2.0")];
        assert!(check_consistency(&out_of_span).is_err());
    }

    #[test]
    fn test_compatible_requires_minor() {
        let reqs = vec![requirement("lib~=2")];
        assert!(check_consistency(&reqs).is_err());
    }

    #[test]
    fn test_exact_pin_against_span() {
        let ok = vec![requirement("lib===1.2.3"), requirement("lib>=1.0")];
        assert!(check_consistency(&ok).is_ok());

        let bad = vec![requirement("lib===1.2.3"), requirement("lib>=2.0")];
        assert!(check_consistency(&bad).is_err());
    }

    #[test]
    fn test_exact_pins_must_match() {
        let bad = vec![requirement("lib===1.2.3"), requirement("lib===1.2.4")];
        assert!(check_consistency(&bad).is_err());
    }

    #[test]
    fn test_broken_names_in_first_seen_order() {
        let reqs = vec![
            requirement("zlib>2"),
            requirement("zlib<1"),
            requirement("alpha>3"),
            requirement("alpha<2"),
        ];
        match check_consistency(&reqs).unwrap_err() {
            SparkConnectError::InconsistentRequirements(names) => {
                assert_eq!(names, vec!["zlib".to_string(), "alpha".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_manifest_rejects_inconsistent() {
        let result = ArtifactManifest::new(["requests>2.28.0", "requests<2.10"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_manifest_stage_writes_deps_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ArtifactManifest::new(["spacy==3.8.4", "torch"]).unwrap();

        let path = manifest.stage("0000-1111", dir.path()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(".deps-0000-1111-"));

        let content = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["type"], "PYPI");
        assert_eq!(json["packages"][0], "spacy==3.8.4");
        assert_eq!(json["packages"][1], "torch");
        assert!(json["client-version"].is_string());
    }

    #[test]
    fn test_manifest_stage_unique_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ArtifactManifest::new(["torch"]).unwrap();

        let a = manifest.stage("u", dir.path()).unwrap();
        let b = manifest.stage("u", dir.path()).unwrap();
        assert_ne!(a, b);
    }
}
