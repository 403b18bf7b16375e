//! Network graph of nodes and edges, and the element arena.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::element::{Container, Element, ElementId};
use crate::config::ConfigError;
use crate::error::{LogisticsError, Result};

/// Instance id of a node or edge, unique within its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LocationId(pub u64);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Celestial body a node is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Body {
    Sun,
    Earth,
    Moon,
    Mars,
    Phobos,
    Deimos,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Surface {
        body: Body,
        latitude: f64,
        longitude: f64,
    },
    Orbital {
        body: Body,
        periapsis: f64,
        apoapsis: f64,
        inclination: f64,
    },
    Lagrange {
        body: Body,
        minor_body: Body,
        number: u8,
    },
}

/// A place in the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub uid: LocationId,
    pub tid: i32,
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(tid: i32, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            uid: LocationId(0),
            tid,
            name: name.into(),
            kind,
        }
    }

    pub fn body(&self) -> Body {
        match self.kind {
            NodeKind::Surface { body, .. }
            | NodeKind::Orbital { body, .. }
            | NodeKind::Lagrange { body, .. } => body,
        }
    }

    /// Earth's surface is the supply source; demand there is never shipped.
    pub fn is_earth_surface(&self) -> bool {
        matches!(self.kind, NodeKind::Surface { body: Body::Earth, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeKind {
    Surface { distance: f64 },
    Space,
    Flight,
    TimeDependent,
}

/// A directed transport leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub uid: LocationId,
    pub tid: i32,
    pub name: String,
    pub origin: LocationId,
    pub destination: LocationId,
    /// Nominal traversal time (days).
    pub duration: f64,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(
        tid: i32,
        name: impl Into<String>,
        origin: LocationId,
        destination: LocationId,
        duration: f64,
        kind: EdgeKind,
    ) -> Self {
        Self {
            uid: LocationId(0),
            tid,
            name: name.into(),
            origin,
            destination,
            duration,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Node(Node),
    Edge(Edge),
}

impl Location {
    pub fn uid(&self) -> LocationId {
        match self {
            Self::Node(n) => n.uid,
            Self::Edge(e) => e.uid,
        }
    }

    pub fn tid(&self) -> i32 {
        match self {
            Self::Node(n) => n.tid,
            Self::Edge(e) => e.tid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Node(n) => &n.name,
            Self::Edge(e) => &e.name,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(n) => Some(n),
            Self::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Self::Edge(e) => Some(e),
            Self::Node(_) => None,
        }
    }
}

impl Container for Location {
    fn as_parent(&self) -> Parent {
        Parent::Location(self.uid())
    }
}

/// What an element is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Parent {
    Location(LocationId),
    Element(ElementId),
}

/// The location graph plus the arena owning every placed element.
///
/// Elements refer to their parent by id; the network keeps the reverse
/// index so containment queries never walk the whole registrar.
#[derive(Debug, Clone, Default)]
pub struct Network {
    next_uid: u64,
    locations: BTreeMap<LocationId, Location>,
    registrar: BTreeMap<ElementId, Element>,
    removed: BTreeMap<ElementId, Element>,
    contents: BTreeMap<Parent, Vec<ElementId>>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_uid(&mut self) -> u64 {
        self.next_uid += 1;
        self.next_uid
    }

    fn check_location_tid(&self, tid: i32, name: &str) -> Result<()> {
        if self.locations.values().any(|l| l.tid() == tid) {
            return Err(ConfigError::new(
                "network.locations",
                format!("tid {tid} of \"{name}\" already used"),
            )
            .into());
        }
        Ok(())
    }

    /// Adds a node and returns its uid.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if another location has the same tid.
    pub fn add_node(&mut self, mut node: Node) -> Result<LocationId> {
        self.check_location_tid(node.tid, &node.name)?;
        let uid = LocationId(self.issue_uid());
        node.uid = uid;
        self.locations.insert(uid, Location::Node(node));
        Ok(uid)
    }

    /// Adds an edge between two existing nodes and returns its uid.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::MalformedNetwork`] if either endpoint is not
    /// a node of this network, or a configuration error for a duplicate tid
    /// or negative duration.
    pub fn add_edge(&mut self, mut edge: Edge) -> Result<LocationId> {
        for endpoint in [edge.origin, edge.destination] {
            if self.node(endpoint).is_none() {
                return Err(LogisticsError::MalformedNetwork {
                    edge: edge.name.clone(),
                    missing: endpoint.0,
                });
            }
        }
        if !(edge.duration >= 0.0) {
            return Err(ConfigError::new(
                format!("network.edges.{}.duration", edge.name),
                format!("must be >= 0, got {}", edge.duration),
            )
            .into());
        }
        self.check_location_tid(edge.tid, &edge.name)?;
        let uid = LocationId(self.issue_uid());
        edge.uid = uid;
        self.locations.insert(uid, Location::Edge(edge));
        Ok(uid)
    }

    /// Removes a node and its incident edges. Elements at removed locations
    /// move to the removed registrar.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::UnknownLocation`] if `id` is not a node.
    pub fn remove_node(&mut self, id: LocationId) -> Result<()> {
        if self.node(id).is_none() {
            return Err(LogisticsError::UnknownLocation(id.0));
        }
        let incident: Vec<LocationId> = self
            .edges()
            .filter(|e| e.origin == id || e.destination == id)
            .map(|e| e.uid)
            .collect();
        for loc in incident.into_iter().chain([id]) {
            for element in self.contents_of(Parent::Location(loc)).to_vec() {
                self.remove_element(element)?;
            }
            self.contents.remove(&Parent::Location(loc));
            self.locations.remove(&loc);
        }
        Ok(())
    }

    /// Places a new element in `parent` and returns its uid.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent does not exist or cannot hold
    /// elements, or if the element has an invalid capacity.
    pub fn add_element(&mut self, mut element: Element, parent: Parent) -> Result<ElementId> {
        element.validate()?;
        self.check_parent(parent)?;
        let uid = ElementId(self.issue_uid());
        element.uid = uid;
        element.parent = Some(parent);
        self.registrar.insert(uid, element);
        self.contents.entry(parent).or_default().push(uid);
        Ok(uid)
    }

    fn check_parent(&self, parent: Parent) -> Result<()> {
        match parent {
            Parent::Location(id) if !self.locations.contains_key(&id) => {
                Err(LogisticsError::UnknownLocation(id.0))
            }
            Parent::Element(id) => match self.registrar.get(&id) {
                None => Err(LogisticsError::UnknownElement(id.0)),
                Some(e) if e.carrier().is_none() => Err(ConfigError::new(
                    format!("elements.{}", e.name),
                    "element cannot hold other elements",
                )
                .into()),
                Some(_) => Ok(()),
            },
            Parent::Location(_) => Ok(()),
        }
    }

    /// Moves an element (with its contents) to a new parent.
    ///
    /// The element is detached from its old parent and attached to the new
    /// one in a single step; on error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns an error if either id is unknown or the move would place an
    /// element inside itself.
    pub fn move_element(&mut self, id: ElementId, parent: Parent) -> Result<()> {
        let old = self
            .registrar
            .get(&id)
            .ok_or(LogisticsError::UnknownElement(id.0))?
            .parent;
        self.check_parent(parent)?;
        if let Parent::Element(target) = parent {
            if target == id || self.complete_contents_of(Parent::Element(id)).contains(&target) {
                return Err(ConfigError::new(
                    "elements",
                    format!("cannot move element {id} into its own contents"),
                )
                .into());
            }
        }
        if old == Some(parent) {
            return Ok(());
        }
        if let Some(old) = old {
            self.detach(old, id);
        }
        self.contents.entry(parent).or_default().push(id);
        if let Some(e) = self.registrar.get_mut(&id) {
            e.parent = Some(parent);
        }
        Ok(())
    }

    fn detach(&mut self, parent: Parent, id: ElementId) {
        if let Some(list) = self.contents.get_mut(&parent) {
            list.retain(|&c| c != id);
        }
    }

    /// Moves an element and its complete contents to the removed registrar.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::UnknownElement`] if `id` is not placed.
    pub fn remove_element(&mut self, id: ElementId) -> Result<()> {
        let parent = self
            .registrar
            .get(&id)
            .ok_or(LogisticsError::UnknownElement(id.0))?
            .parent;
        if let Some(parent) = parent {
            self.detach(parent, id);
        }
        let mut subtree = self.complete_contents_of(Parent::Element(id));
        subtree.push(id);
        for uid in subtree {
            self.contents.remove(&Parent::Element(uid));
            if let Some(e) = self.registrar.remove(&uid) {
                self.removed.insert(uid, e);
            }
        }
        Ok(())
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn node(&self, id: LocationId) -> Option<&Node> {
        self.locations.get(&id).and_then(Location::as_node)
    }

    pub fn edge(&self, id: LocationId) -> Option<&Edge> {
        self.locations.get(&id).and_then(Location::as_edge)
    }

    /// Nodes in uid order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.locations.values().filter_map(Location::as_node)
    }

    /// Edges in uid order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.locations.values().filter_map(Location::as_edge)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.registrar.get(&id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.registrar.get_mut(&id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.registrar.values()
    }

    pub fn removed_elements(&self) -> impl Iterator<Item = &Element> {
        self.removed.values()
    }

    /// Direct contents of a location or element, in placement order.
    pub fn contents_of(&self, parent: Parent) -> &[ElementId] {
        self.contents.get(&parent).map_or(&[], Vec::as_slice)
    }

    /// All nested contents, depth first in placement order.
    pub fn complete_contents_of(&self, parent: Parent) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.contents_of(parent).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.contents_of(Parent::Element(id)).iter().rev());
        }
        out
    }

    /// The location an element is ultimately placed in.
    pub fn location_of(&self, id: ElementId) -> Option<LocationId> {
        let mut seen = BTreeSet::new();
        let mut current = id;
        while seen.insert(current) {
            match self.registrar.get(&current)?.parent? {
                Parent::Location(loc) => return Some(loc),
                Parent::Element(up) => current = up,
            }
        }
        None
    }

    /// The outermost element containing `id` (itself if placed directly
    /// in a location).
    pub fn stack_root(&self, id: ElementId) -> ElementId {
        let mut current = id;
        while let Some(Parent::Element(up)) = self.registrar.get(&current).and_then(|e| e.parent) {
            current = up;
        }
        current
    }

    /// Element mass plus stowed resources plus all nested cargo.
    pub fn total_mass(&self, id: ElementId) -> f64 {
        let Some(element) = self.registrar.get(&id) else {
            return 0.0;
        };
        element.mass + element.resource_mass() + element.cargo_mass(self)
    }
}
