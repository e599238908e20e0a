//! The validity contract shared by every versioned entity, plus the generic
//! version-selection helpers.
//!
//! A version is *valid at* `t` iff `created <= t` and it is either still
//! active (`expired` is empty) or expired strictly after `t`. For a fixed id at
//! most one version is active.
//!
//! The selection helpers here are used for nodes, edges, and components alike,
//! so every lifecycle picks "active", "valid at", and "all versions" the same
//! way.

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::id::{Locator, NanoId};
use crate::reference::Kind;

/// Point in time used for `created`/`expired` validity bounds.
pub type Timestamp = DateTime<Utc>;

/// Anything addressable by a [`Locator`].
pub trait Locatable {
    /// The `(id, version)` of this value.
    fn locator(&self) -> &Locator;

    /// Which entity family this value belongs to.
    fn kind(&self) -> Kind;
}

/// A locatable value with a `(created, expired)` validity interval.
pub trait Versioned: Locatable {
    /// When this version became valid.
    fn created(&self) -> Timestamp;

    /// When this version stopped being valid, if it has.
    fn expired(&self) -> Option<Timestamp>;

    /// `true` while this version has not been expired.
    fn is_active(&self) -> bool {
        self.expired().is_none()
    }

    /// `true` if this version was the valid one at `timestamp`.
    fn is_valid_at(&self, timestamp: Timestamp) -> bool {
        self.created() <= timestamp && self.expired().map_or(true, |e| e > timestamp)
    }
}

/// Selects the active version of `id`: the highest version with no expiry.
pub fn find_active<'a, E, I>(id: &NanoId, items: I) -> Option<&'a E>
where
    E: Versioned + 'a,
    I: IntoIterator<Item = &'a E>,
{
    items
        .into_iter()
        .filter(|e| e.locator().id == *id && e.is_active())
        .max_by_key(|e| e.locator().version)
}

/// Selects the version of `id` that was valid at `timestamp`.
pub fn find_at<'a, E, I>(id: &NanoId, timestamp: Timestamp, items: I) -> Option<&'a E>
where
    E: Versioned + 'a,
    I: IntoIterator<Item = &'a E>,
{
    items
        .into_iter()
        .filter(|e| e.locator().id == *id && e.is_valid_at(timestamp))
        .max_by_key(|e| e.locator().version)
}

/// Returns every version of `id`, ordered by increasing version.
pub fn find_versions<'a, E, I>(id: &NanoId, items: I) -> Vec<&'a E>
where
    E: Versioned + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let mut versions: Vec<&E> = items
        .into_iter()
        .filter(|e| e.locator().id == *id)
        .collect();
    versions.sort_by_key(|e| e.locator().version);
    versions
}

/// Returns every active item, in input order.
pub fn all_active<'a, E, I>(items: I) -> Vec<&'a E>
where
    E: Versioned + 'a,
    I: IntoIterator<Item = &'a E>,
{
    items.into_iter().filter(|e| e.is_active()).collect()
}

/// Unwraps the result of a `find_active` call for an expire/update, failing
/// with `NotFound` when `id` has no active version.
pub fn require_active<E: Versioned>(
    found: Option<E>,
    id: &NanoId,
    kind: Kind,
) -> Result<E, CoreError> {
    found.ok_or_else(|| CoreError::NotFound {
        kind,
        target: id.to_string(),
    })
}
