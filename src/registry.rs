use crate::chain::ChainReadable;
use crate::error::ChainError;
use crate::types::{Extensible, StructureType};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::path::Path;

// ─── Static registry ────────────────────────────────────────────────────────

/// Registers record types with their tag values.
///
/// ```ignore
/// extensible! {
///     PhysicalDeviceFeatures2 => StructureType(1000059000);
///     #[cfg(windows)]
///     ImportMemoryWin32HandleInfo => StructureType(1000073000);
///     // explicit field names when they are not `s_type` / `p_next`
///     LegacyInfo => StructureType(42), kind, next;
/// }
/// ```
///
/// Attributes (typically `#[cfg]` platform guards) apply to the generated
/// impl. Field offsets come from `offset_of!`, and a compile-time assertion
/// rejects layouts whose link field does not fit inside the type.
#[macro_export]
macro_rules! extensible {
    () => {};
    (
        $(#[$meta:meta])*
        $ty:ty => $tag:expr, $tag_field:ident, $link_field:ident;
        $($rest:tt)*
    ) => {
        $(#[$meta])*
        const _: () = {
            assert!(
                ::core::mem::offset_of!($ty, $tag_field) + $crate::types::TAG_SIZE
                    <= ::core::mem::size_of::<$ty>()
            );
            assert!(
                ::core::mem::offset_of!($ty, $link_field) + $crate::types::LINK_SIZE
                    <= ::core::mem::size_of::<$ty>()
            );
        };

        $(#[$meta])*
        unsafe impl $crate::types::Extensible for $ty {
            const TAG: $crate::types::StructureType = $tag;
            const TAG_OFFSET: usize = ::core::mem::offset_of!($ty, $tag_field);
            const LINK_OFFSET: usize = ::core::mem::offset_of!($ty, $link_field);
        }

        $crate::extensible!($($rest)*);
    };
    (
        $(#[$meta:meta])*
        $ty:ty => $tag:expr;
        $($rest:tt)*
    ) => {
        $crate::extensible!($(#[$meta])* $ty => $tag, s_type, p_next; $($rest)*);
    };
}

/// Registry tag of `T`.
#[inline]
pub const fn tag_of<T: Extensible>() -> StructureType {
    T::TAG
}

// ─── Manifest ───────────────────────────────────────────────────────────────

/// One row of the generated type-tag table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: SmolStr,
    pub tag: StructureType,
    /// Platform guard the type is compiled under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<SmolStr>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    structures: Vec<TagEntry>,
}

/// Runtime copy of the type-tag table, used to name tags in diagnostics.
///
/// Stamping never consults the manifest; it always uses `Extensible::TAG`.
#[derive(Debug, Clone, Default)]
pub struct TagManifest {
    entries: Vec<TagEntry>,
    by_tag: FxHashMap<StructureType, usize>,
}

impl TagManifest {
    pub fn from_entries(entries: Vec<TagEntry>) -> Self {
        let mut by_tag = FxHashMap::default();
        for (i, entry) in entries.iter().enumerate() {
            if let Some(prev) = by_tag.insert(entry.tag, i) {
                warn!(
                    "tag {:?} listed twice ({} and {}); keeping the later entry",
                    entry.tag, entries[prev].name, entry.name
                );
            }
        }
        Self { entries, by_tag }
    }

    /// Parse `{ "structures": [{ "name", "tag", "guard"? }, ...] }`.
    pub fn from_json_str(json: &str) -> Result<Self, ChainError> {
        let file: ManifestFile = serde_json::from_str(json)?;
        debug!("loaded tag manifest with {} structures", file.structures.len());
        Ok(Self::from_entries(file.structures))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ChainError> {
        let file = ManifestFile {
            structures: self.entries.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.iter()
    }

    #[inline]
    pub fn entry(&self, tag: StructureType) -> Option<&TagEntry> {
        self.by_tag.get(&tag).map(|&i| &self.entries[i])
    }

    #[inline]
    pub fn name_of(&self, tag: StructureType) -> Option<&str> {
        self.entry(tag).map(|e| e.name.as_str())
    }

    /// Whether `T`'s registry tag is listed under the expected name.
    pub fn lists<T: Extensible>(&self, name: &str) -> bool {
        self.name_of(T::TAG) == Some(name)
    }

    /// Whether a listed tag is usable given the set of enabled guards.
    /// Unguarded entries are always available; unknown tags never are.
    pub fn is_available(&self, tag: StructureType, enabled_guards: &[&str]) -> bool {
        match self.entry(tag) {
            Some(TagEntry { guard: None, .. }) => true,
            Some(TagEntry {
                guard: Some(guard), ..
            }) => enabled_guards.contains(&guard.as_str()),
            None => false,
        }
    }

    /// Names of the chain's records in chain order. Unlisted tags render as
    /// their raw value.
    pub fn describe_chain<C: ChainReadable>(&self, chain: &C) -> Vec<SmolStr> {
        chain
            .tags()
            .map(|tag| match self.name_of(tag) {
                Some(name) => SmolStr::from(name),
                None => SmolStr::from(format!("<{}>", tag.as_raw())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::OwningChain;
    use crate::test_records::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MANIFEST_JSON: &str = r#"{
      "structures": [
        { "name": "FeaturesHead", "tag": 1000059000 },
        { "name": "MultiviewFeatures", "tag": 1000053001 },
        { "name": "MemoryModelFeatures", "tag": 1000211000 },
        { "name": "Win32HandleInfo", "tag": 1000073000, "guard": "VK_USE_PLATFORM_WIN32_KHR" }
      ]
    }"#;

    #[test]
    fn test_macro_offsets() {
        assert_eq!(FeaturesHead::TAG_OFFSET, 0);
        assert_eq!(FeaturesHead::LINK_OFFSET, 8);
        assert_eq!(TinyRecord::TAG_OFFSET, 0);
        assert_eq!(TinyRecord::LINK_OFFSET, 4);
        assert_eq!(tag_of::<MultiviewFeatures>(), TAG_MULTIVIEW);
    }

    #[test]
    fn test_manifest_lookup() {
        let manifest = TagManifest::from_json_str(MANIFEST_JSON).unwrap();
        assert_eq!(manifest.len(), 4);
        assert_eq!(manifest.name_of(TAG_MULTIVIEW), Some("MultiviewFeatures"));
        assert!(manifest.name_of(TAG_TINY).is_none());
        assert!(manifest.lists::<FeaturesHead>("FeaturesHead"));
        assert!(!manifest.lists::<FeaturesHead>("MultiviewFeatures"));
    }

    #[test]
    fn test_guarded_availability() {
        let manifest = TagManifest::from_json_str(MANIFEST_JSON).unwrap();
        let win32 = StructureType(1_000_073_000);
        assert!(manifest.is_available(TAG_FEATURES_HEAD, &[]));
        assert!(!manifest.is_available(win32, &[]));
        assert!(manifest.is_available(win32, &["VK_USE_PLATFORM_WIN32_KHR"]));
        assert!(!manifest.is_available(TAG_TINY, &["VK_USE_PLATFORM_WIN32_KHR"]));
    }

    #[test]
    fn test_duplicate_tag_keeps_later_entry() {
        let manifest = TagManifest::from_entries(vec![
            TagEntry {
                name: "Old".into(),
                tag: TAG_TINY,
                guard: None,
            },
            TagEntry {
                name: "New".into(),
                tag: TAG_TINY,
                guard: None,
            },
        ]);
        assert_eq!(manifest.name_of(TAG_TINY), Some("New"));
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_malformed_manifest() {
        let err = TagManifest::from_json_str(r#"{ "structures": [ { "tag": 1 } ] }"#).unwrap_err();
        assert!(matches!(err, ChainError::Manifest(_)));
    }

    #[test]
    fn test_manifest_from_path_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        file.write_all(MANIFEST_JSON.as_bytes())?;

        let manifest = TagManifest::from_path(file.path())?;
        let reparsed = TagManifest::from_json_str(&manifest.to_json_string()?)?;
        assert_eq!(
            manifest.iter().collect::<Vec<_>>(),
            reparsed.iter().collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn test_missing_manifest_file() {
        let err = TagManifest::from_path("/nonexistent/tags.json").unwrap_err();
        assert!(matches!(err, ChainError::Io(_)));
    }

    #[test]
    fn test_describe_chain() {
        let manifest = TagManifest::from_json_str(MANIFEST_JSON).unwrap();
        let mut chain = OwningChain::<FeaturesHead>::new();
        chain.append(&MultiviewFeatures::default());
        chain.append(&TinyRecord::default());

        let names = manifest.describe_chain(&chain);
        let names: Vec<&str> = names.iter().map(SmolStr::as_str).collect();
        assert_eq!(names, vec!["FeaturesHead", "MultiviewFeatures", "<7>"]);
    }
}
