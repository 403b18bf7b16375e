//! CSV export for the query results in [`super::analysis`].
//!
//! Every table is long-format with one row per resource line and is
//! deterministic for identical inputs.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use super::analysis::{EdgeDemand, ManifestAnalysis, NodeDemand, RawDemand, ResourceLine};
use crate::manifest::UnpackedReason;

const NODE_HEADER: &str = "time,node,node_name,tid,resource,cos,environment,amount,mass,volume";

const EDGE_HEADER: &str = "supply_edge,edge_name,origin,destination,start_time,end_time,\
                           tid,resource,cos,amount,mass,volume,max_cargo_mass,net_cargo_mass";

const RAW_HEADER: &str = "time,location,location_name,element,tid,resource,cos,amount,mass,volume";

const CONTAINER_HEADER: &str = "container,name,tid,node,time,supply_edge,packed_mass,\
                                max_cargo_mass,total_mass,manifested_edge,carrier";

const ACTION_HEADER: &str = "time,origin,origin_name,supply_edge,carrier,carrier_name,container";

const GAP_HEADER: &str = "time,node,node_name,supply_edge,container,tid,resource,amount,reason";

fn create(path: &Path) -> io::Result<io::BufWriter<File>> {
    Ok(io::BufWriter::new(File::create(path)?))
}

fn writer<W: Write>(out: W, header: &str) -> io::Result<csv::Writer<W>> {
    let mut wtr = csv::WriterBuilder::new().from_writer(out);
    wtr.write_record(header.split(',').map(str::trim))?;
    Ok(wtr)
}

fn resource_fields(line: &ResourceLine) -> [String; 5] {
    [
        line.tid.to_string(),
        line.name.clone(),
        line.cos.id().to_string(),
        format!("{:.4}", line.amount),
        format!("{:.4}", line.mass),
    ]
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes node-aggregated demand as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_node_demands(rows: &[NodeDemand], out: impl Write) -> io::Result<()> {
    let mut wtr = writer(out, NODE_HEADER)?;
    for row in rows {
        for line in &row.demands {
            let [tid, name, cos, amount, mass] = resource_fields(line);
            wtr.write_record(&[
                format!("{:.3}", row.time),
                row.node.to_string(),
                row.node_name.clone(),
                tid,
                name,
                cos,
                line.environment.to_string(),
                amount,
                mass,
                format!("{:.6}", line.volume),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Exports node-aggregated demand to a CSV file at `path`.
pub fn export_node_demands(rows: &[NodeDemand], path: &Path) -> io::Result<()> {
    write_node_demands(rows, create(path)?)
}

/// Writes edge-aggregated demand as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_edge_demands(rows: &[EdgeDemand], out: impl Write) -> io::Result<()> {
    let mut wtr = writer(out, EDGE_HEADER)?;
    for row in rows {
        for line in &row.demands {
            let [tid, name, cos, amount, mass] = resource_fields(line);
            wtr.write_record(&[
                row.supply_edge.0.to_string(),
                row.edge_name.clone(),
                row.origin.to_string(),
                row.destination.to_string(),
                format!("{:.3}", row.start_time),
                format!("{:.3}", row.end_time),
                tid,
                name,
                cos,
                amount,
                mass,
                format!("{:.6}", line.volume),
                format!("{:.4}", row.max_cargo_mass),
                format!("{:.4}", row.net_cargo_mass),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_edge_demands(rows: &[EdgeDemand], path: &Path) -> io::Result<()> {
    write_edge_demands(rows, create(path)?)
}

/// Writes unsatisfied raw demand as CSV, consumption then production rows
/// per record.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_raw_demands(rows: &[RawDemand], out: impl Write) -> io::Result<()> {
    let mut wtr = writer(out, RAW_HEADER)?;
    for row in rows {
        for line in row.consumption.iter().chain(&row.production) {
            let [tid, name, cos, amount, mass] = resource_fields(line);
            wtr.write_record(&[
                format!("{:.3}", row.time),
                row.location.to_string(),
                row.location_name.clone(),
                opt(row.element),
                tid,
                name,
                cos,
                amount,
                mass,
                format!("{:.6}", line.volume),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_raw_demands(rows: &[RawDemand], path: &Path) -> io::Result<()> {
    write_raw_demands(rows, create(path)?)
}

/// Writes one row per packed container.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_containers(analysis: &ManifestAnalysis, out: impl Write) -> io::Result<()> {
    let mut wtr = writer(out, CONTAINER_HEADER)?;
    for c in &analysis.containers {
        wtr.write_record(&[
            c.id.to_string(),
            c.name.clone(),
            c.tid.to_string(),
            c.node.to_string(),
            format!("{:.3}", c.time),
            opt(c.supply_edge.map(|e| e.0)),
            format!("{:.4}", c.packed_mass),
            format!("{:.4}", c.max_cargo_mass),
            format!("{:.4}", c.total_mass),
            opt(c.manifested_on.map(|(edge, _)| edge.0)),
            opt(c.manifested_on.map(|(_, carrier)| carrier)),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_containers(analysis: &ManifestAnalysis, path: &Path) -> io::Result<()> {
    write_containers(analysis, create(path)?)
}

/// Writes one row per container loaded by each manifest action.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_actions(analysis: &ManifestAnalysis, out: impl Write) -> io::Result<()> {
    let mut wtr = writer(out, ACTION_HEADER)?;
    for action in &analysis.actions {
        for id in &action.containers {
            wtr.write_record(&[
                format!("{:.3}", action.time),
                action.origin.to_string(),
                action.origin_name.clone(),
                action.supply_edge.0.to_string(),
                action.carrier.to_string(),
                action.carrier_name.clone(),
                id.to_string(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_actions(analysis: &ManifestAnalysis, path: &Path) -> io::Result<()> {
    write_actions(analysis, create(path)?)
}

/// Writes one row per unmanifested container and per unpacked demand.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_gaps(analysis: &ManifestAnalysis, out: impl Write) -> io::Result<()> {
    let mut wtr = writer(out, GAP_HEADER)?;
    for gap in &analysis.gaps {
        let prefix = [
            format!("{:.3}", gap.time),
            gap.node.to_string(),
            gap.node_name.clone(),
            opt(gap.supply_edge.map(|e| e.0)),
        ];
        for id in &gap.containers {
            let mut record = prefix.to_vec();
            record.extend([id.to_string(), String::new(), String::new(), String::new()]);
            record.push("unmanifested".to_string());
            wtr.write_record(&record)?;
        }
        for unpacked in &gap.unpacked {
            let mut record = prefix.to_vec();
            record.extend([
                String::new(),
                unpacked.demand.tid.to_string(),
                unpacked.demand.name.clone(),
                format!("{:.4}", unpacked.demand.amount),
            ]);
            record.push(
                match unpacked.reason {
                    UnpackedReason::NoContainerType => "no_container_type",
                    UnpackedReason::ExceedsContainer => "exceeds_container",
                    UnpackedReason::StowageOverhead => "stowage_overhead",
                }
                .to_string(),
            );
            wtr.write_record(&record)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_gaps(analysis: &ManifestAnalysis, path: &Path) -> io::Result<()> {
    write_gaps(analysis, create(path)?)
}

/// Writes any query result as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
#[cfg(feature = "json")]
pub fn write_json<T: serde::Serialize + ?Sized>(value: &T, mut out: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()
}
