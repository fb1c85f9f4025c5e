//! Collection-time gating: which parametrized cases apply to the appliance
//! under test. Everything here is pure and runs before any fixture setup.

use miqapi::api::CollectionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Cloud,
    Infra,
}

impl ProviderKind {
    /// Derives the kind from a provider record `type` such as
    /// `ManageIQ::Providers::Amazon::CloudManager`.
    pub fn from_provider_type(provider_type: &str) -> Option<Self> {
        if provider_type.ends_with("CloudManager") {
            Some(ProviderKind::Cloud)
        } else if provider_type.ends_with("InfraManager") {
            Some(ProviderKind::Infra)
        } else {
            None
        }
    }

    /// Collection holding this provider's VMs
    pub fn vm_collection(&self) -> CollectionName {
        match self {
            ProviderKind::Cloud => CollectionName::Instances,
            ProviderKind::Infra => CollectionName::Vms,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Cloud => f.write_str("cloud"),
            ProviderKind::Infra => f.write_str("infra"),
        }
    }
}

/// Collections the custom-attributes suite is parametrized over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionName {
    Providers,
    Instances,
    Vms,
}

impl CollectionName {
    pub const ALL: [CollectionName; 3] = [
        CollectionName::Providers,
        CollectionName::Instances,
        CollectionName::Vms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Providers => "providers",
            CollectionName::Instances => "instances",
            CollectionName::Vms => "vms",
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            CollectionName::Providers => CollectionKind::Providers,
            CollectionName::Instances => CollectionKind::Instances,
            CollectionName::Vms => CollectionKind::Vms,
        }
    }

    pub fn added_in_59(&self) -> bool {
        matches!(self, CollectionName::Instances | CollectionName::Vms)
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionName::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown collection `{}`", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unsupported { version: Version },
    CollectionTooNew { collection: CollectionName, version: Version },
    CloudOnly,
    InfraOnly,
    DetailDeleteUnfixed { version: Version },
    Blocked { id: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unsupported { version } => {
                write!(f, "custom attributes REST API needs 5.8, appliance is {}", version)
            }
            SkipReason::CollectionTooNew {
                collection,
                version,
            } => write!(f, "`{}` needs 5.9, appliance is {}", collection, version),
            SkipReason::CloudOnly => f.write_str("`instances` exists only for cloud providers"),
            SkipReason::InfraOnly => f.write_str("`vms` exists only for infra providers"),
            SkipReason::DetailDeleteUnfixed { version } => write!(
                f,
                "DELETE on attribute detail is broken before 5.9, appliance is {}",
                version
            ),
            SkipReason::Blocked { id } => write!(f, "blocked by BZ {}", id),
        }
    }
}

/// Whether a custom-attributes case on `collection` does not apply
pub fn uncollect(
    version: &Version,
    provider: ProviderKind,
    collection: CollectionName,
) -> Option<SkipReason> {
    if *version < Version::release(&[5, 8]) {
        return Some(SkipReason::Unsupported {
            version: version.clone(),
        });
    }
    if *version < Version::release(&[5, 9]) && collection.added_in_59() {
        return Some(SkipReason::CollectionTooNew {
            collection,
            version: version.clone(),
        });
    }
    match (provider, collection) {
        (ProviderKind::Infra, CollectionName::Instances) => Some(SkipReason::CloudOnly),
        (ProviderKind::Cloud, CollectionName::Vms) => Some(SkipReason::InfraOnly),
        _ => None,
    }
}

/// `uncollect` plus the pre-5.9 rule for deleting through the DELETE verb (BZ 1422596)
pub fn uncollect_detail_delete(
    version: &Version,
    provider: ProviderKind,
    collection: CollectionName,
) -> Option<SkipReason> {
    if *version < Version::release(&[5, 9]) {
        return Some(SkipReason::DetailDeleteUnfixed {
            version: version.clone(),
        });
    }
    uncollect(version, provider, collection)
}

/// A known appliance defect excluding cases on some streams.
///
/// The blocker is open on every stream listed in `forced_streams`. While open
/// it blocks the named `cases` on the listed `collections`; an empty
/// `collections` list blocks the cases everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    pub id: u32,
    pub forced_streams: Vec<String>,
    pub cases: Vec<String>,
    #[serde(default)]
    pub collections: Vec<CollectionName>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Blocker {
    pub fn is_open(&self, version: &Version) -> bool {
        let stream = version.stream();
        self.forced_streams.iter().any(|s| *s == stream)
    }

    pub fn blocks(&self, version: &Version, case: &str, collection: CollectionName) -> bool {
        self.is_open(version)
            && self.cases.iter().any(|c| c == case)
            && (self.collections.is_empty() || self.collections.contains(&collection))
    }
}

/// Blockers shipped with the harness when the configuration names none
pub fn default_blockers() -> Vec<Blocker> {
    vec![Blocker {
        id: 1516762,
        forced_streams: vec!["5.9".to_string(), "upstream".to_string()],
        cases: vec![
            "test_bad_section_edit".to_string(),
            "test_bad_section_add".to_string(),
        ],
        collections: vec![CollectionName::Vms, CollectionName::Instances],
        description: Some("invalid section accepted on VM and instance attributes".to_string()),
    }]
}

/// First blocker excluding `case` on `collection`
pub fn blocked_by<'a>(
    blockers: &'a [Blocker],
    version: &Version,
    case: &str,
    collection: CollectionName,
) -> Option<&'a Blocker> {
    blockers
        .iter()
        .find(|b| b.blocks(version, case, collection))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn nothing_runs_before_58() {
        for collection in CollectionName::ALL {
            for kind in [ProviderKind::Cloud, ProviderKind::Infra] {
                assert!(matches!(
                    uncollect(&v("5.7.3"), kind, collection),
                    Some(SkipReason::Unsupported { .. })
                ));
            }
        }
    }

    #[test]
    fn only_providers_run_on_58() {
        assert_eq!(
            uncollect(&v("5.8.1"), ProviderKind::Infra, CollectionName::Providers),
            None
        );
        assert!(matches!(
            uncollect(&v("5.8.1"), ProviderKind::Infra, CollectionName::Vms),
            Some(SkipReason::CollectionTooNew { .. })
        ));
        assert!(matches!(
            uncollect(&v("5.8.1"), ProviderKind::Cloud, CollectionName::Instances),
            Some(SkipReason::CollectionTooNew { .. })
        ));
    }

    #[test]
    fn vm_collections_follow_provider_kind() {
        let version = v("5.9.0.22");
        assert_eq!(
            uncollect(&version, ProviderKind::Cloud, CollectionName::Instances),
            None
        );
        assert_eq!(
            uncollect(&version, ProviderKind::Cloud, CollectionName::Vms),
            Some(SkipReason::InfraOnly)
        );
        assert_eq!(
            uncollect(&version, ProviderKind::Infra, CollectionName::Vms),
            None
        );
        assert_eq!(
            uncollect(&version, ProviderKind::Infra, CollectionName::Instances),
            Some(SkipReason::CloudOnly)
        );
        assert_eq!(
            uncollect(&v("master"), ProviderKind::Infra, CollectionName::Providers),
            None
        );
    }

    #[test]
    fn detail_delete_needs_59_even_for_providers() {
        assert!(matches!(
            uncollect_detail_delete(&v("5.8.2"), ProviderKind::Infra, CollectionName::Providers),
            Some(SkipReason::DetailDeleteUnfixed { .. })
        ));
        assert_eq!(
            uncollect_detail_delete(&v("5.9.1"), ProviderKind::Infra, CollectionName::Providers),
            None
        );
    }

    #[test]
    fn default_blocker_spares_providers() {
        let blockers = default_blockers();
        let version = v("5.9.0.22");
        let blocked = |case: &str, collection| {
            blocked_by(&blockers, &version, case, collection).is_some()
        };
        assert!(blocked("test_bad_section_add", CollectionName::Vms));
        assert!(blocked("test_bad_section_edit", CollectionName::Instances));
        assert!(!blocked("test_bad_section_add", CollectionName::Providers));
        assert!(!blocked("test_add", CollectionName::Vms));
    }

    #[test]
    fn blocker_closed_on_other_streams() {
        let blockers = default_blockers();
        let case = "test_bad_section_add";
        let blocked =
            |version: &str| blocked_by(&blockers, &v(version), case, CollectionName::Vms).is_some();
        assert!(!blocked("5.8.3"));
        assert!(blocked("master"));
    }

    #[test]
    fn blocker_without_collections_blocks_everywhere() {
        let blocker = Blocker {
            id: 1,
            forced_streams: vec!["5.10".to_string()],
            cases: vec!["test_edit".to_string()],
            collections: vec![],
            description: None,
        };
        assert!(blocker.blocks(&v("5.10.1"), "test_edit", CollectionName::Providers));
        assert!(!blocker.blocks(&v("5.10.1"), "test_add", CollectionName::Providers));
    }

    #[test]
    fn provider_kind_from_type() {
        assert_eq!(
            ProviderKind::from_provider_type("ManageIQ::Providers::Amazon::CloudManager"),
            Some(ProviderKind::Cloud)
        );
        assert_eq!(
            ProviderKind::from_provider_type("ManageIQ::Providers::Vmware::InfraManager"),
            Some(ProviderKind::Infra)
        );
        assert_eq!(
            ProviderKind::from_provider_type("ManageIQ::Providers::Kubernetes::ContainerManager"),
            None
        );
    }
}
