use std::fmt;

use sha1::{Digest, Sha1};
use uguid::{guid, Guid};

use crate::crawler::{ApiKey, TargetFramework};

/// Namespace of the name-based feature IDs.
const FEATURE_NAMESPACE: Guid = guid!("4f0b8c6e-2b9a-4d51-9c3e-6f1d2a7b90c4");

/// One feature-adoption fact reported by a collector.
///
/// Two facts are equal when both the variant and its parameter are equal, so a collector's
/// result set holds every API or framework at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureUsage {
    /// The module relies on nullable reference type annotations.
    UsesNullableReferenceTypes,
    /// The module defines a `ref struct`.
    DefinesAnyRefStructs,
    /// The module defines a `ref` field.
    DefinesAnyRefFields,
    /// An interface of the module has a method with a body.
    DefinesAnyDefaultInterfaceMembers,
    /// An interface of the module has a `static virtual` member.
    DefinesAnyVirtualStaticInterfaceMembers,
    /// An interface of the module overrides the external interface method.
    Dim(ApiKey),
    /// A type of the module derives from or implements the external type.
    DerivesFrom(ApiKey),
    /// The external exception constructor is used in `throw new`.
    ExceptionThrow(ApiKey),
    /// The external exception type is caught.
    ExceptionCatch(ApiKey),
    /// The external field is read.
    FieldRead(ApiKey),
    /// The external field is written.
    FieldWrite(ApiKey),
    /// The module targets the framework.
    TargetFramework(TargetFramework),
}

impl FeatureUsage {
    /// The variant name, e.g. `DerivesFrom`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            FeatureUsage::UsesNullableReferenceTypes => "UsesNullableReferenceTypes",
            FeatureUsage::DefinesAnyRefStructs => "DefinesAnyRefStructs",
            FeatureUsage::DefinesAnyRefFields => "DefinesAnyRefFields",
            FeatureUsage::DefinesAnyDefaultInterfaceMembers => "DefinesAnyDefaultInterfaceMembers",
            FeatureUsage::DefinesAnyVirtualStaticInterfaceMembers => {
                "DefinesAnyVirtualStaticInterfaceMembers"
            }
            FeatureUsage::Dim(_) => "Dim",
            FeatureUsage::DerivesFrom(_) => "DerivesFrom",
            FeatureUsage::ExceptionThrow(_) => "ExceptionThrow",
            FeatureUsage::ExceptionCatch(_) => "ExceptionCatch",
            FeatureUsage::FieldRead(_) => "FieldRead",
            FeatureUsage::FieldWrite(_) => "FieldWrite",
            FeatureUsage::TargetFramework(_) => "TargetFramework",
        }
    }

    /// The API this fact is about, if it has one.
    #[must_use]
    pub fn api(&self) -> Option<&ApiKey> {
        match self {
            FeatureUsage::Dim(key)
            | FeatureUsage::DerivesFrom(key)
            | FeatureUsage::ExceptionThrow(key)
            | FeatureUsage::ExceptionCatch(key)
            | FeatureUsage::FieldRead(key)
            | FeatureUsage::FieldWrite(key) => Some(key),
            _ => None,
        }
    }

    /// A name-based (version 5) GUID over the canonical text of the fact.
    ///
    /// The same fact always maps to the same ID, across runs and machines.
    #[must_use]
    pub fn feature_id(&self) -> Guid {
        let mut hasher = Sha1::new();
        hasher.update(network_order(FEATURE_NAMESPACE.to_bytes()));
        hasher.update(self.to_string().as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        bytes[6] = (bytes[6] & 0x0F) | 0x50;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;

        Guid::from_bytes(network_order(bytes))
    }
}

/// Swaps the first three GUID fields between the in-memory and the RFC 4122 byte order.
fn network_order(mut bytes: [u8; 16]) -> [u8; 16] {
    bytes[0..4].reverse();
    bytes[4..6].reverse();
    bytes[6..8].reverse();
    bytes
}

impl fmt::Display for FeatureUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureUsage::TargetFramework(framework) => {
                write!(f, "{}({})", self.name(), framework.short_name())
            }
            _ => match self.api() {
                Some(key) => write!(f, "{}({key})", self.name()),
                None => f.write_str(self.name()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            FeatureUsage::DefinesAnyRefFields.to_string(),
            "DefinesAnyRefFields"
        );
        assert_eq!(
            FeatureUsage::FieldRead(ApiKey::from("F:System.String.Empty")).to_string(),
            "FieldRead(F:System.String.Empty)"
        );
        assert_eq!(
            FeatureUsage::TargetFramework(TargetFramework::parse("netstandard2.0").unwrap())
                .to_string(),
            "TargetFramework(netstandard2.0)"
        );
    }

    #[test]
    fn equality_covers_the_parameter() {
        let read = FeatureUsage::FieldRead(ApiKey::from("F:A.B"));
        let mut set = HashSet::new();
        set.insert(read.clone());
        set.insert(read.clone());
        set.insert(FeatureUsage::FieldWrite(ApiKey::from("F:A.B")));
        set.insert(FeatureUsage::FieldRead(ApiKey::from("F:A.C")));

        assert_eq!(set.len(), 3);
        assert!(set.contains(&read));
    }

    #[test]
    fn feature_ids_are_stable_version_5() {
        let feature = FeatureUsage::DerivesFrom(ApiKey::from("T:System.Exception"));
        let id = feature.feature_id();

        assert_eq!(id, feature.clone().feature_id());
        assert_ne!(id, FeatureUsage::DefinesAnyRefStructs.feature_id());

        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(&text[14..15], "5");
        assert!(matches!(&text[19..20], "8" | "9" | "a" | "b"));
    }
}
