//! Capability resolver: abstract verbs to OS-specific command text.
//!
//! Translates the engine's package/service verbs into the concrete shell
//! fragments for a given [`OsIdentity`]. This is the only OS-aware component;
//! everything above it deals in abstract operations.
//!
//! # Design
//!
//! - **Closed dispatch**: `PlatformResolver` is a tagged enum, not a trait
//!   object. The set of supported platforms is small and closed; adding one
//!   means adding a variant here and nowhere else.
//! - **Total or fail**: every verb resolves to a non-empty command for every
//!   supported `(distro, platform_tag)` pair. Anything outside that set gets
//!   `EngineError::UnsupportedPlatform` — never a guessed default.
//! - **Pure logic**: no I/O, no side effects — only string synthesis.

use crate::error::{EngineError, Result};
use crate::os_identity::OsIdentity;

/// Resolver for a concrete platform, dispatched by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformResolver {
    /// Enterprise Linux family: dnf for packages, systemd for services.
    El(ElResolver),
}

/// Select the resolver for an OS identity.
///
/// Fails with [`EngineError::UnsupportedPlatform`] when the identity is
/// outside the supported enumeration. This failure is not recoverable
/// locally; callers must surface it rather than substitute a default.
pub fn resolver_for(os: &OsIdentity) -> Result<PlatformResolver> {
    if !os.is_supported() {
        return Err(EngineError::unsupported(format!(
            "{}/{} on {}",
            os.family, os.distro, os.platform_tag
        )));
    }
    Ok(PlatformResolver::El(ElResolver))
}

impl PlatformResolver {
    pub fn install_package(&self, name: &str) -> String {
        match self {
            Self::El(r) => r.install_package(name),
        }
    }

    pub fn remove_package(&self, name: &str) -> String {
        match self {
            Self::El(r) => r.remove_package(name),
        }
    }

    pub fn update_packages(&self) -> String {
        match self {
            Self::El(r) => r.update_packages(),
        }
    }

    pub fn enable_repo(&self, id: &str) -> String {
        match self {
            Self::El(r) => r.enable_repo(id),
        }
    }

    pub fn disable_repo(&self, id: &str) -> String {
        match self {
            Self::El(r) => r.disable_repo(id),
        }
    }

    pub fn enable_service(&self, name: &str) -> String {
        match self {
            Self::El(r) => r.enable_service(name),
        }
    }

    pub fn disable_service(&self, name: &str) -> String {
        match self {
            Self::El(r) => r.disable_service(name),
        }
    }

    pub fn start_service(&self, name: &str) -> String {
        match self {
            Self::El(r) => r.start_service(name),
        }
    }

    pub fn stop_service(&self, name: &str) -> String {
        match self {
            Self::El(r) => r.stop_service(name),
        }
    }
}

/// dnf + systemctl command synthesis for EL-family systems (el8/el9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElResolver;

impl ElResolver {
    pub fn install_package(&self, name: &str) -> String {
        format!("dnf install -y {}", name)
    }

    pub fn remove_package(&self, name: &str) -> String {
        format!("dnf remove -y {}", name)
    }

    pub fn update_packages(&self) -> String {
        "dnf update -y".to_string()
    }

    pub fn enable_repo(&self, id: &str) -> String {
        format!("dnf config-manager --set-enabled {}", id)
    }

    pub fn disable_repo(&self, id: &str) -> String {
        format!("dnf config-manager --set-disabled {}", id)
    }

    // `enable --now` and `disable --now` also start/stop the unit so a
    // freshly converged node does not need a reboot to pick services up.
    pub fn enable_service(&self, name: &str) -> String {
        format!("systemctl enable --now {}", name)
    }

    pub fn disable_service(&self, name: &str) -> String {
        format!("systemctl disable --now {}", name)
    }

    pub fn start_service(&self, name: &str) -> String {
        format!("systemctl start {}", name)
    }

    pub fn stop_service(&self, name: &str) -> String {
        format!("systemctl stop {}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os_identity::{Architecture, Distro, OsIdentity, PlatformTag};
    use strum::IntoEnumIterator;

    #[test]
    fn test_el_verbs() {
        let r = resolver_for(&OsIdentity::default()).expect("el9 should resolve");
        assert_eq!(r.install_package("munge"), "dnf install -y munge");
        assert_eq!(r.remove_package("munge"), "dnf remove -y munge");
        assert_eq!(r.update_packages(), "dnf update -y");
        assert_eq!(r.enable_repo("epel"), "dnf config-manager --set-enabled epel");
        assert_eq!(r.disable_repo("epel"), "dnf config-manager --set-disabled epel");
        assert_eq!(r.enable_service("slurmd"), "systemctl enable --now slurmd");
        assert_eq!(r.disable_service("slurmd"), "systemctl disable --now slurmd");
        assert_eq!(r.start_service("munge"), "systemctl start munge");
        assert_eq!(r.stop_service("munge"), "systemctl stop munge");
    }

    #[test]
    fn test_resolver_total_over_supported_pairs() {
        for distro in Distro::iter() {
            for tag in PlatformTag::iter() {
                let os = OsIdentity::new(distro, tag, 9, 0, Architecture::X86_64);
                if !os.is_supported() {
                    continue;
                }
                let r = resolver_for(&os).expect("supported pair must resolve");
                for cmd in [
                    r.install_package("pkg"),
                    r.remove_package("pkg"),
                    r.update_packages(),
                    r.enable_repo("repo"),
                    r.disable_repo("repo"),
                    r.enable_service("svc"),
                    r.disable_service("svc"),
                    r.start_service("svc"),
                    r.stop_service("svc"),
                ] {
                    assert!(!cmd.is_empty(), "verb resolved to empty command");
                }
            }
        }
    }

    #[test]
    fn test_unsupported_platform_fails() {
        let os = OsIdentity::new(Distro::Rocky, PlatformTag::El7, 7, 9, Architecture::X86_64);
        let err = resolver_for(&os).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::UnsupportedPlatform(_)));
    }
}
