//! Invalidation tags
//!
//! Tag formats never overlap:
//!
//! - `{kind}-{tenant}` resource of one tenant, e.g. `tasks-yacht-1`
//! - `owner:{tenant}` owning tenant of an entry
//! - `admin-wide:{kind}` resource cached for an admin-wide context
//! - `admin-wide` owner tag of every admin-wide entry, used for the sweep
//! - `catalog:{kind}` tenant-independent resource, whichever tenant cached it

use std::collections::BTreeSet;
use std::fmt;

use crate::constants::{ADMIN_WIDE, CATALOG_TAG_PREFIX, OWNER_TAG_PREFIX};
use crate::query::{EntityKind, TenantIndependent};
use crate::tenant::TenantSelector;

/// Invalidation label attached to cache entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Tag for one resource kind of one tenant
    #[must_use]
    pub fn resource(selector: &TenantSelector, kind: EntityKind) -> Self {
        match selector {
            TenantSelector::Tenant(id) => Self(format!("{kind}-{id}")),
            TenantSelector::AdminWide => Self(format!("{ADMIN_WIDE}:{kind}")),
        }
    }

    /// Tag identifying the owner of an entry
    #[must_use]
    pub fn owner(selector: &TenantSelector) -> Self {
        match selector {
            TenantSelector::Tenant(id) => Self(format!("{OWNER_TAG_PREFIX}{id}")),
            TenantSelector::AdminWide => Self::admin_wide(),
        }
    }

    /// Sweep tag carried by every admin-wide entry
    #[must_use]
    pub fn admin_wide() -> Self {
        Self(ADMIN_WIDE.to_string())
    }

    /// Tag shared by every cached copy of a tenant-independent entity
    #[must_use]
    pub fn catalog<E: TenantIndependent>() -> Self {
        Self::catalog_kind(E::KIND)
    }

    fn catalog_kind(kind: EntityKind) -> Self {
        Self(format!("{CATALOG_TAG_PREFIX}{kind}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_admin_wide(&self) -> bool {
        self.0 == ADMIN_WIDE || self.0.starts_with(&format!("{ADMIN_WIDE}:"))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tags of one cache entry. Always contains the owner tag of its selector, and
/// only tags built for that same selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    selector: TenantSelector,
    tags: BTreeSet<Tag>,
}

impl TagSet {
    #[must_use]
    pub fn for_owner(selector: &TenantSelector) -> Self {
        Self {
            selector: selector.clone(),
            tags: BTreeSet::from([Tag::owner(selector)]),
        }
    }

    /// Add the resource tag of `kind` for this set's owner
    #[must_use]
    pub fn with_resource(mut self, kind: EntityKind) -> Self {
        self.tags.insert(Tag::resource(&self.selector, kind));
        if kind.is_tenant_independent() {
            self.tags.insert(Tag::catalog_kind(kind));
        }
        self
    }

    #[must_use]
    pub const fn selector(&self) -> &TenantSelector {
        &self.selector
    }

    #[must_use]
    pub fn is_owned_by(&self, selector: &TenantSelector) -> bool {
        self.tags.contains(&Tag::owner(selector))
    }

    #[must_use]
    pub fn contains(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Tags for a cached read of `resource_kind` under `selector`
#[must_use]
pub fn build_tags(selector: &TenantSelector, resource_kind: EntityKind) -> TagSet {
    TagSet::for_owner(selector).with_resource(resource_kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::entities::Plan;
    use crate::tenant::TenantId;

    fn tenant(id: &str) -> TenantSelector {
        TenantSelector::Tenant(TenantId::new(id).unwrap())
    }

    #[test]
    fn test_tenant_resource_tags() {
        let tags = build_tags(&tenant("yacht-1"), EntityKind::Task);
        let names: Vec<_> = tags.iter().map(Tag::as_str).collect();
        assert_eq!(names, vec!["owner:yacht-1", "tasks-yacht-1"]);
        assert!(tags.is_owned_by(&tenant("yacht-1")));
        assert!(!tags.is_owned_by(&tenant("yacht-2")));
        assert!(!tags.is_owned_by(&TenantSelector::AdminWide));
    }

    #[test]
    fn test_admin_wide_namespace_is_separate() {
        let tags = build_tags(&TenantSelector::AdminWide, EntityKind::Plan);
        assert!(tags.contains(&Tag::admin_wide()));
        assert!(tags.contains(&Tag(String::from("admin-wide:plans"))));
        assert!(tags.contains(&Tag::catalog::<Plan>()));
        assert!(tags.iter().filter(|t| t.as_str() != "catalog:plans").all(Tag::is_admin_wide));
        assert!(!Tag::resource(&tenant("yacht-1"), EntityKind::Plan).is_admin_wide());
    }

    #[test]
    fn test_catalog_tag_only_for_tenant_independent() {
        let tasks = build_tags(&tenant("yacht-1"), EntityKind::Task);
        assert!(tasks.iter().all(|t| !t.as_str().starts_with("catalog:")));

        let plans = build_tags(&tenant("yacht-1"), EntityKind::Plan);
        assert!(plans.contains(&Tag::catalog::<Plan>()));
        assert!(plans.contains(&Tag::resource(&tenant("yacht-1"), EntityKind::Plan)));
    }

    #[test]
    fn test_owner_tag_always_present() {
        let tags = TagSet::for_owner(&tenant("yacht-7"));
        assert_eq!(tags.len(), 1);
        assert!(!tags.is_empty());
        assert!(tags.is_owned_by(&tenant("yacht-7")));
    }

    #[test]
    fn test_resource_tag_format() {
        assert_eq!(
            Tag::resource(&tenant("yacht-1"), EntityKind::ChatMessage).as_str(),
            "chat-messages-yacht-1"
        );
    }
}
