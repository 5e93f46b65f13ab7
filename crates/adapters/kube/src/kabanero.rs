//! Kabanero custom resource lookups.

use serde::Deserialize;

/// API group of the Kabanero custom resource.
pub const KABANERO_GROUP: &str = "kabanero.io";
/// Served version of the Kabanero custom resource.
pub const KABANERO_VERSION: &str = "v1alpha1";
/// Plural resource name.
pub const KABANEROS: &str = "kabaneros";

/// The fields of a Kabanero instance that hookrelay reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Kabanero {
    #[serde(default)]
    pub metadata: KabaneroMetadata,
    #[serde(default)]
    pub spec: Option<KabaneroSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KabaneroMetadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KabaneroSpec {
    #[serde(default)]
    pub collections: Option<Collections>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Collections {
    #[serde(default)]
    pub repositories: Vec<CollectionRepository>,
}

/// A collection repository entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRepository {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub activate_default_collections: Option<bool>,
}

/// Returns the URL of the first repository with default collections
/// activated, scanning instances and repositories in order.
pub fn active_index_url(instances: &[Kabanero]) -> Option<&str> {
    instances.iter().find_map(|instance| {
        let Some(collections) = instance
            .spec
            .as_ref()
            .and_then(|spec| spec.collections.as_ref())
        else {
            tracing::debug!(kabanero = %instance.metadata.name, "no collections section, skipping");
            return None;
        };
        collections
            .repositories
            .iter()
            .filter(|repo| repo.activate_default_collections == Some(true))
            .find_map(|repo| repo.url.as_deref())
    })
}
