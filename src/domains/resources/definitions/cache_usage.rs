//! Cache usage resource definition.

use super::ResourceDefinition;
use crate::domains::resources::service::{DynamicResourceType, ResourceContent};

/// Cache usage snapshot resource (dynamic).
///
/// Mirrors the `cache_usage` tool for clients that prefer reading resources
/// over calling tools.
pub struct CacheUsageResource;

impl ResourceDefinition for CacheUsageResource {
    const URI: &'static str = "mcp://cache/usage";
    const NAME: &'static str = "Cache Usage";
    const DESCRIPTION: &'static str =
        "Storage used by locally cloned repositories, with a per-repository breakdown";
    const MIME_TYPE: &'static str = "application/json";

    fn content() -> ResourceContent {
        ResourceContent::Dynamic(DynamicResourceType::CacheUsage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_usage_metadata() {
        assert_eq!(CacheUsageResource::URI, "mcp://cache/usage");
        assert_eq!(CacheUsageResource::MIME_TYPE, "application/json");
    }

    #[test]
    fn test_cache_usage_is_dynamic() {
        assert!(matches!(
            CacheUsageResource::content(),
            ResourceContent::Dynamic(DynamicResourceType::CacheUsage)
        ));
    }
}
