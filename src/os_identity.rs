//! Type-safe OS identity for the engine.
//!
//! This module replaces stringly-typed OS detection results with proper Rust
//! enums that provide compile-time validation and exhaustive matching. The
//! identity is resolved by an external probe (or read from a plan file) and
//! is the sole branching input for every other component — nothing else in
//! the engine is OS-aware.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum OsFamily {
    #[default]
    #[strum(serialize = "linux")]
    Linux,
}

/// Distribution within the family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Distro {
    #[default]
    #[strum(serialize = "rocky")]
    Rocky,
    #[strum(serialize = "alma")]
    Alma,
    #[strum(serialize = "rhel")]
    Rhel,
}

/// Platform tag: the repo-compatibility generation the distro ships as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PlatformTag {
    /// Recognized but unsupported: el7 predates dnf.
    #[strum(serialize = "el7")]
    El7,
    #[strum(serialize = "el8")]
    El8,
    #[default]
    #[strum(serialize = "el9")]
    El9,
}

/// Target machine architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum Architecture {
    #[default]
    #[strum(serialize = "x86_64")]
    X86_64,
    #[strum(serialize = "aarch64")]
    Aarch64,
}

/// Immutable description of the target operating system.
///
/// Constructed once from probe results or a plan file, then shared read-only.
/// The `(distro, platform_tag)` pair must be a recognized combination; an
/// unrecognized pair fails at resolver time, not later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsIdentity {
    pub family: OsFamily,
    pub distro: Distro,
    pub platform_tag: PlatformTag,
    pub major_version: u32,
    pub minor_version: u32,
    pub architecture: Architecture,
}

impl OsIdentity {
    /// Create an identity for the given distro/platform with version numbers.
    pub fn new(
        distro: Distro,
        platform_tag: PlatformTag,
        major_version: u32,
        minor_version: u32,
        architecture: Architecture,
    ) -> Self {
        Self {
            family: OsFamily::Linux,
            distro,
            platform_tag,
            major_version,
            minor_version,
            architecture,
        }
    }

    /// Whether this `(distro, platform_tag)` pair is in the supported
    /// enumeration. The resolver is total over exactly this set.
    pub fn is_supported(&self) -> bool {
        match (self.distro, self.platform_tag) {
            (Distro::Rocky, PlatformTag::El8 | PlatformTag::El9) => true,
            (Distro::Alma, PlatformTag::El8 | PlatformTag::El9) => true,
            (Distro::Rhel, PlatformTag::El8 | PlatformTag::El9) => true,
            (_, PlatformTag::El7) => false,
        }
    }

    /// Short human-readable label, e.g. `rocky 9.4 (el9, x86_64)`.
    pub fn label(&self) -> String {
        format!(
            "{} {}.{} ({}, {})",
            self.distro, self.major_version, self.minor_version, self.platform_tag, self.architecture
        )
    }
}

impl Default for OsIdentity {
    fn default() -> Self {
        Self::new(Distro::Rocky, PlatformTag::El9, 9, 0, Architecture::X86_64)
    }
}

impl std::fmt::Display for OsIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_distro_roundtrip() {
        for s in ["rocky", "alma", "rhel"] {
            let d = Distro::from_str(s).expect("should parse");
            assert_eq!(d.to_string(), s);
        }
    }

    #[test]
    fn test_platform_tag_parse() {
        assert_eq!(PlatformTag::from_str("el9").unwrap(), PlatformTag::El9);
        assert_eq!(PlatformTag::from_str("el8").unwrap(), PlatformTag::El8);
        assert!(PlatformTag::from_str("buster").is_err());
    }

    #[test]
    fn test_default_identity_is_supported() {
        assert!(OsIdentity::default().is_supported());
    }

    #[test]
    fn test_el7_is_not_supported() {
        let os = OsIdentity::new(Distro::Rhel, PlatformTag::El7, 7, 9, Architecture::X86_64);
        assert!(!os.is_supported());
    }

    #[test]
    fn test_label_format() {
        let os = OsIdentity::new(Distro::Rocky, PlatformTag::El9, 9, 4, Architecture::X86_64);
        assert_eq!(os.label(), "rocky 9.4 (el9, x86_64)");
    }

    #[test]
    fn test_identity_serde_roundtrip() {
        let os = OsIdentity::new(Distro::Alma, PlatformTag::El8, 8, 10, Architecture::Aarch64);
        let json = serde_json::to_string(&os).unwrap();
        let back: OsIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(os, back);
    }
}
