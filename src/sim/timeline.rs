//! Mission timeline: stays, traversals, reconfigurations and mission demand.

use crate::domain::{ElementId, LocationId, Network, ResourceRef};
use crate::error::{LogisticsError, Result};

/// Where a segment takes place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentKind {
    /// Remaining at a node for `duration` days.
    Stay { node: LocationId, duration: f64 },
    /// Traversing an edge; duration comes from the edge.
    Transit { edge: LocationId },
}

/// A span of time during which a set of element stacks share a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: f64,
    /// Top-level elements placed at the segment's location when it starts.
    pub elements: Vec<ElementId>,
}

impl Segment {
    pub fn location(&self) -> LocationId {
        match self.kind {
            SegmentKind::Stay { node, .. } => node,
            SegmentKind::Transit { edge } => edge,
        }
    }

    pub fn is_transit(&self) -> bool {
        matches!(self.kind, SegmentKind::Transit { .. })
    }

    /// End time; transits take the edge duration.
    pub fn end(&self, network: &Network) -> f64 {
        match self.kind {
            SegmentKind::Stay { duration, .. } => self.start + duration,
            SegmentKind::Transit { edge } => {
                self.start + network.edge(edge).map_or(0.0, |e| e.duration)
            }
        }
    }
}

/// Switch an element to one of its states at `time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    pub time: f64,
    pub element: ElementId,
    pub state: usize,
}

/// Demand attributed to the mission rather than an element.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionDemand {
    pub time: f64,
    pub node: LocationId,
    pub amounts: Vec<(ResourceRef, f64)>,
}

/// Ordered plan of element movements and events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub segments: Vec<Segment>,
    pub state_changes: Vec<StateChange>,
    pub mission_demands: Vec<MissionDemand>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stay(mut self, node: LocationId, start: f64, duration: f64, elements: &[ElementId]) -> Self {
        self.segments.push(Segment {
            kind: SegmentKind::Stay { node, duration },
            start,
            elements: elements.to_vec(),
        });
        self
    }

    pub fn transit(mut self, edge: LocationId, start: f64, elements: &[ElementId]) -> Self {
        self.segments.push(Segment {
            kind: SegmentKind::Transit { edge },
            start,
            elements: elements.to_vec(),
        });
        self
    }

    pub fn reconfigure(mut self, time: f64, element: ElementId, state: usize) -> Self {
        self.state_changes.push(StateChange {
            time,
            element,
            state,
        });
        self
    }

    pub fn mission_demand(mut self, time: f64, node: LocationId, amounts: Vec<(ResourceRef, f64)>) -> Self {
        self.mission_demands.push(MissionDemand { time, node, amounts });
        self
    }

    /// Checks every reference against `network` and rejects overlapping
    /// segments for the same element.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn validate(&self, network: &Network) -> Result<()> {
        let invalid = |segment: usize, reason: String| LogisticsError::InvalidTimeline { segment, reason };

        let mut spans: Vec<(ElementId, f64, f64, usize)> = Vec::new();
        for (i, seg) in self.segments.iter().enumerate() {
            match seg.kind {
                SegmentKind::Stay { node, duration } => {
                    if network.node(node).is_none() {
                        return Err(LogisticsError::UnknownLocation(node.0));
                    }
                    if !(duration >= 0.0) {
                        return Err(invalid(i, format!("negative stay duration {duration}")));
                    }
                }
                SegmentKind::Transit { edge } => {
                    if network.edge(edge).is_none() {
                        return Err(LogisticsError::UnknownLocation(edge.0));
                    }
                }
            }
            if !seg.start.is_finite() {
                return Err(invalid(i, "start time is not finite".to_string()));
            }
            let end = seg.end(network);
            for &id in &seg.elements {
                if network.element(id).is_none() {
                    return Err(LogisticsError::UnknownElement(id.0));
                }
                spans.push((id, seg.start, end, i));
            }
        }

        spans.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        for pair in spans.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.0 == b.0 && b.1 < a.2 {
                return Err(invalid(
                    b.3,
                    format!("element {} is already in segment {} until {}", a.0, a.3, a.2),
                ));
            }
        }

        for change in &self.state_changes {
            let Some(element) = network.element(change.element) else {
                return Err(LogisticsError::UnknownElement(change.element.0));
            };
            if change.state >= element.states.len() {
                return Err(crate::config::ConfigError::new(
                    format!("timeline.state_changes.{}", element.name),
                    format!("state {} out of {}", change.state, element.states.len()),
                )
                .into());
            }
        }

        for demand in &self.mission_demands {
            if network.node(demand.node).is_none() {
                return Err(LogisticsError::UnknownLocation(demand.node.0));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Body, ClassOfSupply, Edge, EdgeKind, Element, Node, NodeKind, Parent};

    fn network() -> (Network, LocationId, LocationId, ElementId) {
        let mut net = Network::new();
        let orbit = |tid, name: &str| {
            Node::new(
                tid,
                name,
                NodeKind::Orbital {
                    body: Body::Moon,
                    periapsis: 100.0,
                    apoapsis: 100.0,
                    inclination: 90.0,
                },
            )
        };
        let a = net.add_node(orbit(1, "LLO")).unwrap_or(LocationId(0));
        let b = net.add_node(orbit(2, "NRHO")).unwrap_or(LocationId(0));
        let edge = Edge::new(3, "LLO-NRHO", a, b, 4.0, EdgeKind::Space);
        let ab = net.add_edge(edge).unwrap_or(LocationId(0));
        let probe = Element::new(1, "Probe", ClassOfSupply::COS6, 50.0);
        let probe = net.add_element(probe, Parent::Location(a)).unwrap_or(ElementId(0));
        (net, a, ab, probe)
    }

    #[test]
    fn transit_end_uses_edge_duration() {
        let (net, _, ab, probe) = network();
        let timeline = Timeline::new().transit(ab, 2.0, &[probe]);
        assert_eq!(timeline.segments[0].end(&net), 6.0);
        assert!(timeline.validate(&net).is_ok());
    }

    #[test]
    fn overlapping_segments_rejected() {
        let (net, a, ab, probe) = network();
        let timeline = Timeline::new().stay(a, 0.0, 5.0, &[probe]).transit(ab, 3.0, &[probe]);
        assert!(matches!(
            timeline.validate(&net),
            Err(LogisticsError::InvalidTimeline { segment: 1, .. })
        ));
    }

    #[test]
    fn back_to_back_segments_accepted() {
        let (net, a, ab, probe) = network();
        let timeline = Timeline::new().stay(a, 0.0, 5.0, &[probe]).transit(ab, 5.0, &[probe]);
        assert!(timeline.validate(&net).is_ok());
    }

    #[test]
    fn stay_on_edge_rejected() {
        let (net, _, ab, probe) = network();
        let timeline = Timeline::new().stay(ab, 0.0, 1.0, &[probe]);
        assert!(matches!(timeline.validate(&net), Err(LogisticsError::UnknownLocation(_))));
    }

    #[test]
    fn bad_state_index_rejected() {
        let (net, _, _, probe) = network();
        let timeline = Timeline::new().reconfigure(1.0, probe, 3);
        assert!(timeline.validate(&net).is_err());
    }
}
