//! Component lifecycle and the membership side-table.
//!
//! Components are not vertices or edges, so they live beside the multigraph:
//! every version of every component, plus an index from element locator to
//! the ids of components that currently hold it. Membership is keyed by
//! locator rather than stored on the element, which keeps element values
//! immutable.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use super::VersionedGraph;
use crate::component::Component;
use crate::data::Data;
use crate::element::Element;
use crate::error::CoreError;
use crate::id::{Locator, NanoId};
use crate::reference::{Kind, Reference};
use crate::version::{self, Timestamp, Versioned};

#[derive(Debug, Clone, Default)]
pub(crate) struct ComponentIndex {
    /// All versions per component id, in version order.
    versions: IndexMap<NanoId, Vec<Component>>,
    /// Element locator -> ids of components holding it.
    membership: HashMap<Locator, HashSet<NanoId>>,
}

impl ComponentIndex {
    fn all(&self) -> impl Iterator<Item = &Component> {
        self.versions.values().flatten()
    }

    fn versions_of(&self, id: &NanoId) -> &[Component] {
        self.versions.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn active(&self, id: &NanoId) -> Option<&Component> {
        version::find_active(id, self.versions_of(id))
    }

    pub(crate) fn push(&mut self, component: Component) {
        self.versions
            .entry(component.locator.id.clone())
            .or_default()
            .push(component);
    }

    /// Swaps the stored version with the same locator for `component`.
    fn replace(&mut self, component: Component) {
        if let Some(versions) = self.versions.get_mut(&component.locator.id) {
            if let Some(slot) = versions.iter_mut().find(|c| c.locator == component.locator) {
                *slot = component;
            }
        }
    }

    fn register(&mut self, component: &Component) {
        for element in &component.elements {
            self.membership
                .entry(element.locator().clone())
                .or_default()
                .insert(component.locator.id.clone());
        }
    }

    fn unregister(&mut self, component: &Component) {
        for element in &component.elements {
            if let Some(ids) = self.membership.get_mut(element.locator()) {
                ids.remove(&component.locator.id);
                if ids.is_empty() {
                    self.membership.remove(element.locator());
                }
            }
        }
    }

    /// Re-registers membership for every active version.
    pub(crate) fn rebuild_membership(&mut self) {
        self.membership.clear();
        let active: Vec<Component> = self
            .versions
            .keys()
            .filter_map(|id| self.active(id).cloned())
            .collect();
        for component in &active {
            self.register(component);
        }
    }

    /// Active components holding the element version at `locator`.
    fn containing(&self, locator: &Locator) -> Vec<&Component> {
        let Some(ids) = self.membership.get(locator) else {
            return Vec::new();
        };
        let mut ids: Vec<&NanoId> = ids.iter().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.active(id)).collect()
    }

    /// Lazy handles to the active components holding `locator`.
    pub(crate) fn memberships(&self, locator: &Locator) -> HashSet<Reference<Component>> {
        self.containing(locator)
            .into_iter()
            .map(|c| Reference::Unloaded {
                locator: c.locator.clone(),
                kind: Kind::Component,
            })
            .collect()
    }
}

impl VersionedGraph {
    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Creates a component over `elements` after validating them against the
    /// current graph.
    pub fn add_component(
        &mut self,
        elements: Vec<Element>,
        data: Data,
        timestamp: Timestamp,
    ) -> Result<Component, CoreError> {
        self.validate_component(&elements)?;

        let component = Component::new(
            Locator::generate(),
            elements.into_iter().map(Reference::Loaded).collect(),
            data,
            timestamp,
        );
        self.components.register(&component);
        self.components.push(component.clone());
        debug!(component = %component.locator, "added component");
        Ok(component)
    }

    /// Replaces the active version of component `id` with one over
    /// `elements`. Nothing changes if validation fails.
    pub fn update_component(
        &mut self,
        id: &NanoId,
        elements: Vec<Element>,
        data: Data,
        timestamp: Timestamp,
    ) -> Result<Component, CoreError> {
        self.validate_component(&elements)?;
        let current =
            version::require_active(self.components.active(id).cloned(), id, Kind::Component)?;

        self.components.unregister(&current);
        self.components.replace(current.expire_at(timestamp));

        let next = Component::new(
            current.locator.increment(),
            elements.into_iter().map(Reference::Loaded).collect(),
            data,
            timestamp,
        );
        self.components.register(&next);
        self.components.push(next.clone());
        debug!(component = %next.locator, "updated component");
        Ok(next)
    }

    /// Expires the active version of component `id` in place.
    pub fn expire_component(
        &mut self,
        id: &NanoId,
        timestamp: Timestamp,
    ) -> Result<Component, CoreError> {
        let current =
            version::require_active(self.components.active(id).cloned(), id, Kind::Component)?;
        let expired = current.expire_at(timestamp);
        self.components.unregister(&current);
        self.components.replace(expired.clone());
        debug!(component = %expired.locator, "expired component");
        Ok(expired)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The component version at `locator`.
    pub fn find_component(&self, locator: &Locator) -> Result<Component, CoreError> {
        self.components
            .all()
            .find(|c| c.locator == *locator)
            .cloned()
            .ok_or_else(|| CoreError::not_found(Kind::Component, locator))
    }

    pub fn find_active_component(&self, id: &NanoId) -> Option<Component> {
        self.components.active(id).cloned()
    }

    pub fn find_component_at(&self, id: &NanoId, timestamp: Timestamp) -> Option<Component> {
        version::find_at(id, timestamp, self.components.versions_of(id)).cloned()
    }

    /// Every version of component `id`, oldest first.
    pub fn find_component_versions(&self, id: &NanoId) -> Vec<Component> {
        version::find_versions(id, self.components.versions_of(id))
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn all_active_components(&self) -> Vec<Component> {
        version::all_active(self.components.all())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Active components holding the element version at `locator`.
    pub fn components_containing(&self, locator: &Locator) -> Vec<Component> {
        self.components
            .containing(locator)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Active components holding an active version of element `id`.
    pub fn components_containing_id(&self, id: &NanoId) -> Vec<Component> {
        version::all_active(self.components.all())
            .into_iter()
            .filter(|c| {
                c.elements.iter().any(|e| {
                    e.locator().id == *id
                        && self
                            .element_at(e.locator())
                            .map_or(false, |current| current.is_active())
                })
            })
            .cloned()
            .collect()
    }

    /// Component versions valid at `timestamp` that held any version of
    /// element `id`.
    pub fn components_containing_id_at(&self, id: &NanoId, timestamp: Timestamp) -> Vec<Component> {
        self.components
            .all()
            .filter(|c| c.is_valid_at(timestamp) && c.holds(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::node::Node;
    use chrono::{Duration, Utc};
    use crate::version::Locatable;

    fn setup() -> (VersionedGraph, Node, Node, Element) {
        let mut graph = VersionedGraph::new();
        let t = Utc::now();
        let a = graph.add_node(Data::empty(), t);
        let b = graph.add_node(Data::empty(), t);
        let ab = graph.add_edge(&a, &b, Data::empty(), t).unwrap();
        (graph, a, b, Element::Edge(ab))
    }

    #[test]
    fn add_registers_membership() {
        let (mut graph, a, b, ab) = setup();
        let component = graph
            .add_component(
                vec![Element::Node(a.clone()), Element::Node(b.clone()), ab.clone()],
                Data::empty(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(component.locator.version, 1);
        assert_eq!(component.elements.len(), 3);
        for locator in [&a.locator, &b.locator, ab.locator()] {
            let containing = graph.components_containing(locator);
            assert_eq!(containing.len(), 1);
            assert_eq!(containing[0].locator, component.locator);
        }
        let node = graph.find_active_node(&a.locator.id).unwrap();
        assert!(node.components.iter().any(|c| c.locator() == &component.locator));
    }

    #[test]
    fn update_moves_membership() {
        let (mut graph, a, b, ab) = setup();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(1);
        let first = graph
            .add_component(
                vec![Element::Node(a.clone()), Element::Node(b.clone()), ab],
                Data::empty(),
                t0,
            )
            .unwrap();

        let second = graph
            .update_component(&first.locator.id, vec![Element::Node(a.clone())], Data::empty(), t1)
            .unwrap();

        assert_eq!(second.locator.version, 2);
        assert!(graph.components_containing(&b.locator).is_empty());
        assert_eq!(graph.components_containing(&a.locator)[0].locator, second.locator);
        assert_eq!(graph.find_component(&first.locator).unwrap().expired, Some(t1));
        let versions = graph.find_component_versions(&first.locator.id);
        assert_eq!(versions.len(), 2);
        assert_eq!(graph.find_component_at(&first.locator.id, t0).unwrap().locator.version, 1);
    }

    #[test]
    fn failed_update_changes_nothing() {
        let (mut graph, a, _, _) = setup();
        let first = graph
            .add_component(vec![Element::Node(a.clone())], Data::empty(), Utc::now())
            .unwrap();

        match graph.update_component(&first.locator.id, vec![], Data::empty(), Utc::now()) {
            Err(CoreError::ValidationFailed(ValidationError::Empty)) => {}
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
        assert_eq!(graph.find_active_component(&first.locator.id).unwrap(), first);
        assert_eq!(graph.components_containing(&a.locator).len(), 1);
    }

    #[test]
    fn update_missing_component_is_not_found() {
        let (mut graph, a, _, _) = setup();
        let missing = NanoId::new("nope");
        match graph.update_component(&missing, vec![Element::Node(a)], Data::empty(), Utc::now()) {
            Err(CoreError::NotFound { kind: Kind::Component, .. }) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn expire_drops_from_active_queries() {
        let (mut graph, a, _, _) = setup();
        let component = graph
            .add_component(vec![Element::Node(a.clone())], Data::empty(), Utc::now())
            .unwrap();
        let expired = graph.expire_component(&component.locator.id, Utc::now()).unwrap();

        assert!(expired.expired.is_some());
        assert!(graph.find_active_component(&component.locator.id).is_none());
        assert!(graph.all_active_components().is_empty());
        assert!(graph.components_containing(&a.locator).is_empty());
        assert!(graph.expire_component(&component.locator.id, Utc::now()).is_err());
    }

    #[test]
    fn containing_id_follows_element_activity() {
        let (mut graph, a, _, _) = setup();
        let t0 = Utc::now();
        let component = graph
            .add_component(vec![Element::Node(a.clone())], Data::empty(), t0)
            .unwrap();

        assert_eq!(graph.components_containing_id(&a.locator.id).len(), 1);

        let t1 = t0 + Duration::seconds(5);
        graph.update_node(&a.locator.id, Data::empty(), t1).unwrap();

        // the component holds the now-expired first version of `a`
        assert!(graph.components_containing_id(&a.locator.id).is_empty());
        let historical = graph.components_containing_id_at(&a.locator.id, t1);
        assert_eq!(historical.len(), 1);
        assert_eq!(historical[0].locator, component.locator);
    }
}
