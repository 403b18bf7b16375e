//! Demand simulator that replays a mission timeline over the network.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::config::ScenarioConfig;
use crate::domain::{
    Container, DemandSet, ElementId, ElementKind, Location, LocationId, Network, Parent,
    ResourceCatalog,
};
use crate::error::{LogisticsError, Result};
use crate::model::DemandContext;

use super::cancel::CancelToken;
use super::clock::Clock;
use super::discretize::ItemDiscretizer;
use super::stock;
use super::timeline::{SegmentKind, Timeline};
use super::types::{
    CarrierSnapshot, DemandReport, SimDemand, SupplyEdge, SupplyEdgeId, SupplyPoint,
    UnaggregatedDemand, UnaggregatedReason,
};

#[derive(Debug, Clone, Copy)]
enum EventKind {
    StateChange(usize),
    Arrive(usize),
    Tick { segment: usize, start: f64, end: f64 },
    Mission(usize),
}

/// A timeline event with its sort key. Events at the same rounded time run
/// by rank: reconfigurations, node arrivals, edge departures, node demand,
/// edge demand, mission demand.
#[derive(Debug, Clone, Copy)]
struct Event {
    time: f64,
    rank: u8,
    seq: usize,
    kind: EventKind,
}

/// Replays a [`Timeline`] and reports demand, shortfalls and supply
/// opportunities.
///
/// The simulator works on a private copy of the network, so the caller's
/// network is never modified and repeated runs give identical reports.
pub struct DemandSimulator<'a> {
    config: &'a ScenarioConfig,
    catalog: &'a ResourceCatalog,
    cancel: CancelToken,
}

impl<'a> DemandSimulator<'a> {
    /// Creates a simulator.
    ///
    /// # Arguments
    ///
    /// * `config` - Global scenario parameters
    /// * `catalog` - Resource types referenced by demand models
    pub fn new(config: &'a ScenarioConfig, catalog: &'a ResourceCatalog) -> Self {
        Self {
            config,
            catalog,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `token` to stop the run between events.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs the whole timeline.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid parameters, timeline
    /// references or demand-model resources, and
    /// [`LogisticsError::Cancelled`] if the token fires. Shortfalls are
    /// never errors.
    pub fn run(&self, network: &Network, timeline: &Timeline) -> Result<DemandReport> {
        if let Some(err) = LogisticsError::from_validation(self.config.validate()) {
            return Err(err);
        }
        timeline.validate(network)?;
        self.check_references(network, timeline)?;

        let events = self.schedule(network, timeline);
        info!(
            segments = timeline.segments.len(),
            events = events.len(),
            "demand simulation started"
        );

        let mut sweep = Sweep {
            config: self.config,
            catalog: self.catalog,
            network: network.clone(),
            discretizer: ItemDiscretizer::new(self.config.items),
            fired: BTreeSet::new(),
            report: DemandReport::default(),
        };
        for event in &events {
            self.cancel.check()?;
            sweep.step(timeline, event)?;
        }
        let report = sweep.finish();

        info!(
            raw = report.raw.len(),
            unsatisfied = report.unsatisfied.len(),
            supply_points = report.supply_points.len(),
            supply_edges = report.supply_edges.len(),
            "demand simulation finished"
        );
        Ok(report)
    }

    fn check_references(&self, network: &Network, timeline: &Timeline) -> Result<()> {
        for element in network.elements() {
            for model in element.states.iter().flat_map(|s| &s.demand_models) {
                for reference in model.references() {
                    self.catalog.resolve(reference, &self.config.packing, || {
                        format!("element {} ({})", element.uid(), element.name)
                    })?;
                }
            }
            for part in &element.parts {
                if self.catalog.get(part.part).is_none() {
                    return Err(LogisticsError::UnknownResource {
                        tid: part.part,
                        context: format!("parts of element {} ({})", element.uid(), element.name),
                    });
                }
            }
        }
        for (i, demand) in timeline.mission_demands.iter().enumerate() {
            for &(reference, _) in &demand.amounts {
                self.catalog
                    .resolve(reference, &self.config.packing, || format!("mission demand {i}"))?;
            }
        }
        Ok(())
    }

    fn schedule(&self, network: &Network, timeline: &Timeline) -> Vec<Event> {
        let mut events = Vec::new();
        let mut seq = 0;
        let mut push = |events: &mut Vec<Event>, time: f64, rank: u8, kind: EventKind| {
            events.push(Event {
                time,
                rank,
                seq,
                kind,
            });
            seq += 1;
        };

        for (i, change) in timeline.state_changes.iter().enumerate() {
            push(&mut events, change.time, 0, EventKind::StateChange(i));
        }
        for (i, segment) in timeline.segments.iter().enumerate() {
            let transit = u8::from(segment.is_transit());
            push(&mut events, segment.start, 1 + transit, EventKind::Arrive(i));
            let mut clock = Clock::new(
                segment.start,
                segment.end(network),
                self.config.simulation.max_demand_interval,
            );
            clock.run(|start, end| {
                let tick = EventKind::Tick {
                    segment: i,
                    start,
                    end,
                };
                push(&mut events, start, 3 + transit, tick);
            });
        }
        for (i, demand) in timeline.mission_demands.iter().enumerate() {
            push(&mut events, demand.time, 5, EventKind::Mission(i));
        }

        let p = self.config.precision;
        events.sort_by(|a, b| {
            p.round_time(a.time)
                .total_cmp(&p.round_time(b.time))
                .then(a.rank.cmp(&b.rank))
                .then(a.seq.cmp(&b.seq))
        });
        events
    }
}

/// Mutable state of one run.
struct Sweep<'a> {
    config: &'a ScenarioConfig,
    catalog: &'a ResourceCatalog,
    network: Network,
    discretizer: ItemDiscretizer,
    /// One-shot models already evaluated, by element, state and model index.
    fired: BTreeSet<(ElementId, Option<usize>, usize)>,
    report: DemandReport,
}

impl Sweep<'_> {
    fn step(&mut self, timeline: &Timeline, event: &Event) -> Result<()> {
        match event.kind {
            EventKind::StateChange(i) => {
                let change = &timeline.state_changes[i];
                if let Some(element) = self.network.element_mut(change.element) {
                    debug!(element = %change.element, state = change.state, "state changed");
                    element.current_state = Some(change.state);
                }
            }
            EventKind::Arrive(i) => self.arrive(timeline, i)?,
            EventKind::Tick { segment, start, end } => {
                let location = timeline.segments[segment].location();
                for id in self.residents(&timeline.segments[segment].elements) {
                    let demands = self.generate(id, start, end)?;
                    self.record(Some(id), location, start, demands);
                }
            }
            EventKind::Mission(i) => {
                let mission = &timeline.mission_demands[i];
                let mut demands = DemandSet::new();
                for &(reference, amount) in &mission.amounts {
                    let resource = self.catalog.resolve(reference, &self.config.packing, || {
                        format!("mission demand {i}")
                    })?;
                    demands.add_amount(&resource, amount);
                }
                self.record(None, mission.node, mission.time, demands);
            }
        }
        Ok(())
    }

    fn arrive(&mut self, timeline: &Timeline, index: usize) -> Result<()> {
        let segment = &timeline.segments[index];
        let location = segment.location();
        for &id in &segment.elements {
            self.network.move_element(id, Parent::Location(location))?;
        }
        let p = self.config.precision;
        let start = p.round_time(segment.start);
        debug!(segment = index, location = %location, time = start, "segment started");

        match segment.kind {
            SegmentKind::Stay { node, .. } => {
                self.report.supply_points.insert(SupplyPoint { node, time: start });
            }
            SegmentKind::Transit { edge } => {
                let Some(edge) = self.network.edge(edge) else {
                    return Err(LogisticsError::UnknownLocation(edge.0));
                };
                let supply_edge = SupplyEdge {
                    id: SupplyEdgeId(self.report.supply_edges.len()),
                    edge: edge.uid,
                    origin: edge.origin,
                    destination: edge.destination,
                    start_time: start,
                    end_time: p.round_time(segment.start + edge.duration),
                    carriers: self.carriers(&segment.elements),
                };
                self.report.supply_points.insert(supply_edge.arrival());
                self.report.supply_edges.push(supply_edge);
            }
        }
        Ok(())
    }

    /// Carriers among the moving stacks, outer first. Resource containers
    /// hold stock, not manifested cargo, and are left out.
    fn carriers(&self, elements: &[ElementId]) -> Vec<CarrierSnapshot> {
        let mut out = Vec::new();
        for &root in elements {
            let stack = std::iter::once(root).chain(self.network.complete_contents_of(Parent::Element(root)));
            for id in stack {
                let Some(element) = self.network.element(id) else {
                    continue;
                };
                if matches!(element.kind, ElementKind::ResourceContainer { .. }) {
                    continue;
                }
                if let Some(spec) = element.carrier() {
                    out.push(CarrierSnapshot {
                        element: id,
                        name: element.name.clone(),
                        max_cargo_mass: spec.max_cargo_mass,
                        max_cargo_volume: spec.max_cargo_volume,
                        cargo_environment: spec.cargo_environment,
                        cargo_mass: element.cargo_mass(&self.network),
                        cargo_volume: element.cargo_volume(&self.network),
                    });
                }
            }
        }
        out
    }

    /// The segment's stacks and everything currently inside them.
    fn residents(&self, roots: &[ElementId]) -> Vec<ElementId> {
        let mut out = Vec::new();
        for &root in roots {
            if self.network.element(root).is_none() {
                continue;
            }
            out.push(root);
            out.extend(self.network.complete_contents_of(Parent::Element(root)));
        }
        out
    }

    /// Demand of element `id` over `[start, end)`. A one-shot model fires
    /// once even when adjacent segments share its instant.
    fn generate(&mut self, id: ElementId, start: f64, end: f64) -> Result<DemandSet> {
        let mut demands = DemandSet::new();
        let Some(element) = self.network.element(id) else {
            return Ok(demands);
        };
        let ctx = DemandContext {
            network: &self.network,
            element,
            start,
            end,
        };
        for (index, model) in element.demand_models().iter().enumerate() {
            if let Some(instant) = model.instant() {
                if !ctx.covers(instant) {
                    continue;
                }
                if !self.fired.insert((id, element.current_state, index)) {
                    debug!(element = %id, model = index, "one-shot demand already fired");
                    continue;
                }
            }
            demands.merge(&model.generate(&ctx, self.catalog, self.config)?);
        }
        Ok(demands)
    }

    fn record(
        &mut self,
        element: Option<ElementId>,
        location: LocationId,
        time: f64,
        mut demands: DemandSet,
    ) {
        self.discretizer.apply(&mut demands, element, location);
        if self.config.simulation.packing_demands {
            if let Some(stowage) = demands.packing_demand(&self.config.packing) {
                demands.add(stowage);
            }
        }
        demands.clean(&self.config.precision);
        if demands.is_empty() {
            return;
        }
        let time = self.config.precision.round_time(time);
        self.report.raw.push(SimDemand {
            time,
            location,
            element,
            demands: demands.clone(),
        });

        stock::satisfy(
            &mut self.network,
            element,
            location,
            &mut demands,
            self.catalog,
            self.config,
            time,
            &mut self.report.scavenged,
        );
        if !demands.is_empty() {
            self.report.unsatisfied.push(SimDemand {
                time,
                location,
                element,
                demands,
            });
        }
    }

    /// Attributes every unsatisfied demand to a supply point or supply edge.
    fn finish(mut self) -> DemandReport {
        let report = &mut self.report;
        for demand in &report.unsatisfied {
            let target = match self.network.location(demand.location) {
                Some(Location::Node(node)) if node.is_earth_surface() => {
                    Target::Unaggregated(UnaggregatedReason::EarthSurface)
                }
                Some(Location::Node(node)) => report
                    .supply_points
                    .iter()
                    .rev()
                    .find(|p| p.node == node.uid && p.time <= demand.time)
                    .map_or(Target::Unaggregated(UnaggregatedReason::NoSupplyPoint), |p| {
                        Target::Point(*p)
                    }),
                Some(Location::Edge(_)) => report
                    .supply_edges
                    .iter()
                    .rev()
                    .find(|e| {
                        e.edge == demand.location
                            && e.start_time <= demand.time
                            && demand.time <= e.end_time
                    })
                    .map_or(Target::Unaggregated(UnaggregatedReason::NoSupplyEdge), |e| {
                        Target::Edge(e.id)
                    }),
                None => Target::Unaggregated(UnaggregatedReason::NoSupplyPoint),
            };
            match target {
                Target::Point(point) => report
                    .node_demands
                    .entry(point)
                    .or_default()
                    .merge(&demand.demands),
                Target::Edge(edge) => report
                    .edge_demands
                    .entry(edge)
                    .or_default()
                    .merge(&demand.demands),
                Target::Unaggregated(reason) => {
                    warn!(
                        location = %demand.location,
                        time = demand.time,
                        ?reason,
                        "unsatisfied demand has no supply opportunity"
                    );
                    report.unaggregated.push(UnaggregatedDemand {
                        demand: demand.clone(),
                        reason,
                    });
                }
            }
        }
        for set in report
            .node_demands
            .values_mut()
            .chain(report.edge_demands.values_mut())
        {
            set.clean(&self.config.precision);
        }
        self.report
    }
}

enum Target {
    Point(SupplyPoint),
    Edge(SupplyEdgeId),
    Unaggregated(UnaggregatedReason),
}
