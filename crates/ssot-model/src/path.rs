//! Hierarchical SSOT addresses
//!
//! A company record is a four-level tree: domain (L1) → sub-domain (L2) →
//! field (L3) → leaf value (L4). Upstream agents send addresses in the
//! loose [`RawTargetPath`] shape together with a [`TargetLevel`];
//! [`TargetPath::resolve`] turns the pair into a [`TargetPath`] whose
//! variant fixes the depth, so a depth/level mismatch cannot survive
//! resolution.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Address depth being written
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetLevel {
    /// Domain level (category)
    #[serde(rename = "L1C")]
    L1C,
    /// Sub-domain level
    L2,
    /// Field level
    L3,
    /// Leaf value level
    L4,
}

impl TargetLevel {
    /// All levels, shallowest first
    pub const ALL: [TargetLevel; 4] = [
        TargetLevel::L1C,
        TargetLevel::L2,
        TargetLevel::L3,
        TargetLevel::L4,
    ];

    /// Number of path segments at this level
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TargetLevel::L1C => 1,
            TargetLevel::L2 => 2,
            TargetLevel::L3 => 3,
            TargetLevel::L4 => 4,
        }
    }

    /// Level for a segment count
    #[inline]
    #[must_use]
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(TargetLevel::L1C),
            2 => Some(TargetLevel::L2),
            3 => Some(TargetLevel::L3),
            4 => Some(TargetLevel::L4),
            _ => None,
        }
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TargetLevel::L1C => "L1C",
            TargetLevel::L2 => "L2",
            TargetLevel::L3 => "L3",
            TargetLevel::L4 => "L4",
        }
    }
}

impl Display for TargetLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address as sent on the wire
///
/// `l1` is always expected; `l2`..`l4` are present up to the target level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawTargetPath {
    /// Domain
    #[serde(default)]
    pub l1: String,
    /// Sub-domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2: Option<String>,
    /// Field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l3: Option<String>,
    /// Leaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l4: Option<String>,
}

impl RawTargetPath {
    /// Domain-only address
    #[inline]
    #[must_use]
    pub fn domain(l1: impl Into<String>) -> Self {
        Self {
            l1: l1.into(),
            ..Self::default()
        }
    }

    /// Add the sub-domain segment
    #[inline]
    #[must_use]
    pub fn with_l2(mut self, l2: impl Into<String>) -> Self {
        self.l2 = Some(l2.into());
        self
    }

    /// Add the field segment
    #[inline]
    #[must_use]
    pub fn with_l3(mut self, l3: impl Into<String>) -> Self {
        self.l3 = Some(l3.into());
        self
    }

    /// Add the leaf segment
    #[inline]
    #[must_use]
    pub fn with_l4(mut self, l4: impl Into<String>) -> Self {
        self.l4 = Some(l4.into());
        self
    }
}

/// Resolved address, one variant per level
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "level")]
pub enum TargetPath {
    /// L1 domain
    #[serde(rename = "L1C")]
    Domain {
        /// Domain
        l1: String,
    },
    /// L2 sub-domain
    #[serde(rename = "L2")]
    SubDomain {
        /// Domain
        l1: String,
        /// Sub-domain
        l2: String,
    },
    /// L3 field
    #[serde(rename = "L3")]
    Field {
        /// Domain
        l1: String,
        /// Sub-domain
        l2: String,
        /// Field
        l3: String,
    },
    /// L4 leaf value
    #[serde(rename = "L4")]
    Leaf {
        /// Domain
        l1: String,
        /// Sub-domain
        l2: String,
        /// Field
        l3: String,
        /// Leaf
        l4: String,
    },
}

impl TargetPath {
    /// Resolve a wire address against its declared level
    ///
    /// # Errors
    /// - [`PathError::EmptyDomain`] when `l1` is empty or blank
    /// - [`PathError::BlankSegment`] when a populated segment is blank
    /// - [`PathError::Gap`] when a segment is present without its parent
    /// - [`PathError::DepthMismatch`] when the populated depth differs from `level`
    pub fn resolve(raw: &RawTargetPath, level: TargetLevel) -> Result<Self, PathError> {
        let l1 = raw.l1.trim();
        if l1.is_empty() {
            return Err(PathError::EmptyDomain);
        }

        let tail = [
            (TargetLevel::L2, raw.l2.as_deref()),
            (TargetLevel::L3, raw.l3.as_deref()),
            (TargetLevel::L4, raw.l4.as_deref()),
        ];

        let mut segments = vec![l1.to_string()];
        let mut first_missing: Option<TargetLevel> = None;

        for (seg_level, segment) in tail {
            match segment {
                None => {
                    first_missing.get_or_insert(seg_level);
                }
                Some(value) => {
                    if let Some(missing) = first_missing {
                        return Err(PathError::Gap {
                            missing,
                            present: seg_level,
                        });
                    }
                    let value = value.trim();
                    if value.is_empty() {
                        return Err(PathError::BlankSegment(seg_level));
                    }
                    segments.push(value.to_string());
                }
            }
        }

        if segments.len() != level.depth() {
            return Err(PathError::DepthMismatch {
                level,
                depth: segments.len(),
            });
        }

        Self::from_segments(segments).ok_or(PathError::DepthMismatch { level, depth: 0 })
    }

    /// Build from 1..=4 segments
    #[must_use]
    pub fn from_segments(segments: Vec<String>) -> Option<Self> {
        let mut it = segments.into_iter();
        let path = match (it.next(), it.next(), it.next(), it.next(), it.next()) {
            (Some(l1), None, None, None, None) => Self::Domain { l1 },
            (Some(l1), Some(l2), None, None, None) => Self::SubDomain { l1, l2 },
            (Some(l1), Some(l2), Some(l3), None, None) => Self::Field { l1, l2, l3 },
            (Some(l1), Some(l2), Some(l3), Some(l4), None) => Self::Leaf { l1, l2, l3, l4 },
            _ => return None,
        };
        Some(path)
    }

    /// Domain-only path
    #[inline]
    #[must_use]
    pub fn domain(l1: impl Into<String>) -> Self {
        Self::Domain { l1: l1.into() }
    }

    /// Level of this path
    #[inline]
    #[must_use]
    pub fn level(&self) -> TargetLevel {
        match self {
            Self::Domain { .. } => TargetLevel::L1C,
            Self::SubDomain { .. } => TargetLevel::L2,
            Self::Field { .. } => TargetLevel::L3,
            Self::Leaf { .. } => TargetLevel::L4,
        }
    }

    /// Segments, domain first
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Domain { l1 } => vec![l1.as_str()],
            Self::SubDomain { l1, l2 } => vec![l1.as_str(), l2.as_str()],
            Self::Field { l1, l2, l3 } => vec![l1.as_str(), l2.as_str(), l3.as_str()],
            Self::Leaf { l1, l2, l3, l4 } => {
                vec![l1.as_str(), l2.as_str(), l3.as_str(), l4.as_str()]
            }
        }
    }

    /// Domain segment
    #[inline]
    #[must_use]
    pub fn l1(&self) -> &str {
        match self {
            Self::Domain { l1 }
            | Self::SubDomain { l1, .. }
            | Self::Field { l1, .. }
            | Self::Leaf { l1, .. } => l1,
        }
    }

    /// Deepest named segment
    #[inline]
    #[must_use]
    pub fn leaf_key(&self) -> &str {
        match self {
            Self::Domain { l1 } => l1,
            Self::SubDomain { l2, .. } => l2,
            Self::Field { l3, .. } => l3,
            Self::Leaf { l4, .. } => l4,
        }
    }

    /// Parent path (none for a domain)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Domain { .. } => None,
            Self::SubDomain { l1, .. } => Some(Self::Domain { l1: l1.clone() }),
            Self::Field { l1, l2, .. } => Some(Self::SubDomain {
                l1: l1.clone(),
                l2: l2.clone(),
            }),
            Self::Leaf { l1, l2, l3, .. } => Some(Self::Field {
                l1: l1.clone(),
                l2: l2.clone(),
                l3: l3.clone(),
            }),
        }
    }

    /// All strict ancestors, shallowest first
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            out.push(path);
        }
        out.reverse();
        out
    }

    /// Child path one level deeper (none for a leaf)
    #[must_use]
    pub fn child(&self, key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        match self {
            Self::Domain { l1 } => Some(Self::SubDomain {
                l1: l1.clone(),
                l2: key,
            }),
            Self::SubDomain { l1, l2 } => Some(Self::Field {
                l1: l1.clone(),
                l2: l2.clone(),
                l3: key,
            }),
            Self::Field { l1, l2, l3 } => Some(Self::Leaf {
                l1: l1.clone(),
                l2: l2.clone(),
                l3: l3.clone(),
                l4: key,
            }),
            Self::Leaf { .. } => None,
        }
    }

    /// Check if this path is a prefix of (or equal to) another
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        let mine = self.segments();
        let theirs = other.segments();
        mine.len() <= theirs.len() && mine[..] == theirs[..mine.len()]
    }

    /// Convert back to the wire shape
    #[must_use]
    pub fn to_raw(&self) -> RawTargetPath {
        let mut segments = self.segments().into_iter().map(str::to_string);
        RawTargetPath {
            l1: segments.next().unwrap_or_default(),
            l2: segments.next(),
            l3: segments.next(),
            l4: segments.next(),
        }
    }
}

impl Display for TargetPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join(" / "))
    }
}

/// Address resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// `l1` missing or blank
    #[error("target_path.l1 must not be empty")]
    EmptyDomain,

    /// Populated segment is blank
    #[error("target_path segment at {0} is blank")]
    BlankSegment(TargetLevel),

    /// Deeper segment present while a shallower one is missing
    #[error("target_path has {present} set but {missing} is missing")]
    Gap {
        /// First missing level
        missing: TargetLevel,
        /// Deeper level that was populated anyway
        present: TargetLevel,
    },

    /// Populated depth does not match the declared level
    #[error("target_path depth {depth} does not match target_level {level}")]
    DepthMismatch {
        /// Declared level
        level: TargetLevel,
        /// Populated segment count
        depth: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> TargetPath {
        TargetPath::resolve(
            &RawTargetPath::domain("Financials")
                .with_l2("Funding")
                .with_l3("Rounds")
                .with_l4("Latest"),
            TargetLevel::L4,
        )
        .unwrap()
    }

    #[test]
    fn resolve_each_level() {
        let raw = RawTargetPath::domain("Financials");
        assert_eq!(
            TargetPath::resolve(&raw, TargetLevel::L1C).unwrap(),
            TargetPath::domain("Financials")
        );

        let raw = raw.with_l2("Funding");
        let path = TargetPath::resolve(&raw, TargetLevel::L2).unwrap();
        assert_eq!(path.level(), TargetLevel::L2);
        assert_eq!(path.leaf_key(), "Funding");

        assert_eq!(leaf().level(), TargetLevel::L4);
        assert_eq!(leaf().segments(), vec!["Financials", "Funding", "Rounds", "Latest"]);
    }

    #[test]
    fn resolve_rejects_empty_domain() {
        let raw = RawTargetPath::domain("   ");
        assert_eq!(
            TargetPath::resolve(&raw, TargetLevel::L1C),
            Err(PathError::EmptyDomain)
        );
    }

    #[test]
    fn resolve_rejects_depth_mismatch() {
        let raw = RawTargetPath::domain("Financials").with_l2("Funding");
        assert_eq!(
            TargetPath::resolve(&raw, TargetLevel::L3),
            Err(PathError::DepthMismatch {
                level: TargetLevel::L3,
                depth: 2
            })
        );
        assert!(TargetPath::resolve(&raw, TargetLevel::L1C).is_err());
    }

    #[test]
    fn resolve_rejects_gaps_and_blank_segments() {
        let raw = RawTargetPath::domain("Financials").with_l3("Rounds");
        assert_eq!(
            TargetPath::resolve(&raw, TargetLevel::L3),
            Err(PathError::Gap {
                missing: TargetLevel::L2,
                present: TargetLevel::L3
            })
        );

        let raw = RawTargetPath::domain("Financials").with_l2(" ");
        assert_eq!(
            TargetPath::resolve(&raw, TargetLevel::L2),
            Err(PathError::BlankSegment(TargetLevel::L2))
        );
    }

    #[test]
    fn parent_and_ancestors() {
        let path = leaf();
        assert_eq!(path.parent().unwrap().level(), TargetLevel::L3);

        let ancestors = path.ancestors();
        assert_eq!(ancestors.len(), 3);
        assert_eq!(ancestors[0], TargetPath::domain("Financials"));
        assert!(ancestors.iter().all(|a| a.is_prefix_of(&path)));
        assert!(TargetPath::domain("Financials").ancestors().is_empty());
    }

    #[test]
    fn child_round_trips_through_parent() {
        let field = leaf().parent().unwrap();
        assert_eq!(field.child("Latest"), Some(leaf()));
        assert!(leaf().child("deeper").is_none());
    }

    #[test]
    fn raw_conversion() {
        let raw = leaf().to_raw();
        assert_eq!(raw.l1, "Financials");
        assert_eq!(raw.l4.as_deref(), Some("Latest"));
        assert_eq!(TargetPath::resolve(&raw, TargetLevel::L4).unwrap(), leaf());
    }

    #[test]
    fn display_joins_segments() {
        assert_eq!(leaf().to_string(), "Financials / Funding / Rounds / Latest");
    }

    #[test]
    fn level_wire_names() {
        assert_eq!(serde_json::to_string(&TargetLevel::L1C).unwrap(), "\"L1C\"");
        let level: TargetLevel = serde_json::from_str("\"L4\"").unwrap();
        assert_eq!(level, TargetLevel::L4);
    }

    #[test]
    fn resolved_path_serializes_with_level_tag() {
        let json = serde_json::to_value(TargetPath::domain("Team")).unwrap();
        assert_eq!(json["level"], "L1C");
        assert_eq!(json["l1"], "Team");
    }
}
