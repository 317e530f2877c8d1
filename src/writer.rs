//! Canonical `.tsm` serialization: fixed section order, one canonical
//! spelling per key, deterministic cell enumeration. Parsing the output of
//! [`write_tsm`] yields an equal model.

use std::fmt::Write;

use crate::{
    math::Geometry,
    model::{EntityMetadata, TrackMap},
};

pub fn write_tsm(map: &TrackMap) -> String {
    let mut out = String::new();
    // Infallible writes into a String; the unwraps below cannot fire.
    meta(&mut out, map);
    cells(&mut out, map);
    shapes(&mut out, map);
    sectors(&mut out, map);
    areas(&mut out, map);
    portals(&mut out, map);
    links(&mut out, map);
    paths(&mut out, map);
    beacons(&mut out, map);
    markers(&mut out, map);
    approaches(&mut out, map);
    out
}

fn header(out: &mut String, kind: &str, id: Option<&str>) {
    if !out.is_empty() {
        out.push('\n');
    }
    match id {
        Some(id) => writeln!(out, "[{kind}: \"{id}\"]").unwrap(),
        None => writeln!(out, "[{kind}]").unwrap(),
    }
}

fn kv(out: &mut String, key: &str, value: impl std::fmt::Display) {
    writeln!(out, "{key} = {value}").unwrap();
}

fn kv_text(out: &mut String, key: &str, value: &str) {
    writeln!(out, "{key} = \"{value}\"").unwrap();
}

fn kv_opt(out: &mut String, key: &str, value: Option<impl std::fmt::Display>) {
    if let Some(value) = value {
        kv(out, key, value);
    }
}

fn kv_opt_text(out: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        kv_text(out, key, value);
    }
}

fn metadata(out: &mut String, meta: &EntityMetadata) {
    for (key, value) in meta {
        kv_text(out, key, value);
    }
}

fn meta(out: &mut String, map: &TrackMap) {
    let m = map.metadata();
    header(out, "meta", None);
    kv_text(out, "name", &m.name);
    kv(out, "cell_size", m.cell_size_m);
    kv(out, "start_x", m.start.cell.x);
    kv(out, "start_z", m.start.cell.z);
    kv(out, "start_heading", m.start.heading);
    kv(out, "weather", m.weather.as_str());
    kv(out, "ambience", m.ambience.as_str());
    kv(out, "surface", m.default_surface);
    kv(out, "noise", m.default_noise);
    kv(out, "width", m.default_width_m);
}

fn cells(out: &mut String, map: &TrackMap) {
    for (at, cell) in map.cells() {
        header(out, "cell", None);
        kv(out, "x", at.x);
        kv(out, "z", at.z);
        if !cell.exits.is_empty() {
            kv(out, "exits", cell.exits);
        }
        kv_opt(out, "surface", cell.surface);
        kv_opt(out, "noise", cell.noise);
        kv_opt(out, "width", cell.width_m);
        if cell.is_safe_zone {
            kv(out, "safe", "true");
        }
        kv_opt_text(out, "zone", cell.zone.as_deref());
    }
}

fn shapes(out: &mut String, map: &TrackMap) {
    for shape in map.shapes() {
        header(out, "shape", Some(&shape.id));
        match &shape.geometry {
            Geometry::Rect(r) => {
                kv(out, "type", "rectangle");
                kv(out, "x", r.x);
                kv(out, "z", r.z);
                kv(out, "width", r.width);
                kv(out, "height", r.height);
            }
            Geometry::Circle(c) => {
                kv(out, "type", "circle");
                kv(out, "x", c.x);
                kv(out, "z", c.z);
                kv(out, "radius", c.radius);
            }
            Geometry::Polygon(poly) => {
                kv(out, "type", "polygon");
                kv(out, "points", points(&poly.points));
            }
            Geometry::Polyline(line) => {
                kv(out, "type", "polyline");
                kv(out, "points", points(&line.points));
            }
        }
    }
}

fn points(points: &[crate::math::WorldPoint]) -> String {
    points.iter().map(|p| format!("{},{}", p.x, p.z)).collect::<Vec<_>>().join("; ")
}

fn sectors(out: &mut String, map: &TrackMap) {
    for sector in map.sectors() {
        header(out, "sector", Some(&sector.id));
        kv(out, "type", sector.kind.as_str());
        kv_opt_text(out, "name", sector.name.as_deref());
        kv_opt_text(out, "code", sector.code.as_deref());
        kv_opt_text(out, "area", sector.area_id.as_deref());
        kv_opt(out, "surface", sector.surface);
        kv_opt(out, "noise", sector.noise);
        if !sector.flags.is_empty() {
            kv(out, "flags", sector.flags);
        }
        metadata(out, &sector.metadata);
    }
}

fn areas(out: &mut String, map: &TrackMap) {
    for area in map.areas() {
        header(out, "area", Some(&area.id));
        kv(out, "type", area.kind.as_str());
        kv_text(out, "shape", &area.shape_id);
        kv_opt(out, "surface", area.surface);
        kv_opt(out, "noise", area.noise);
        kv_opt(out, "width", area.width_m);
        if !area.flags.is_empty() {
            kv(out, "flags", area.flags);
        }
        metadata(out, &area.metadata);
    }
}

fn portals(out: &mut String, map: &TrackMap) {
    for portal in map.portals() {
        header(out, "portal", Some(&portal.id));
        kv_text(out, "sector", &portal.sector_id);
        kv(out, "x", portal.position.x);
        kv(out, "z", portal.position.z);
        kv(out, "width", portal.width_m);
        kv_opt(out, "entry_heading", portal.entry_heading_deg);
        kv_opt(out, "exit_heading", portal.exit_heading_deg);
        kv(out, "role", portal.role.as_str());
    }
}

fn links(out: &mut String, map: &TrackMap) {
    for link in map.links() {
        header(out, "link", Some(&link.id));
        kv_text(out, "from", &link.from_portal_id);
        kv_text(out, "to", &link.to_portal_id);
        kv(out, "direction", link.direction.as_str());
    }
}

fn paths(out: &mut String, map: &TrackMap) {
    for path in map.paths() {
        header(out, "path", Some(&path.id));
        kv(out, "type", path.kind.as_str());
        kv_opt_text(out, "shape", path.shape_id.as_deref());
        kv_opt_text(out, "from", path.from_portal_id.as_deref());
        kv_opt_text(out, "to", path.to_portal_id.as_deref());
        kv_opt(out, "width", path.width_m);
        kv_opt_text(out, "name", path.name.as_deref());
    }
}

fn beacons(out: &mut String, map: &TrackMap) {
    for beacon in map.beacons() {
        header(out, "beacon", Some(&beacon.id));
        kv(out, "type", beacon.kind.as_str());
        kv(out, "x", beacon.position.x);
        kv(out, "z", beacon.position.z);
        kv_opt_text(out, "name", beacon.name.as_deref());
        kv_opt_text(out, "name2", beacon.name2.as_deref());
        kv_opt_text(out, "sector", beacon.sector_id.as_deref());
        kv_opt_text(out, "shape", beacon.shape_id.as_deref());
        kv_opt(out, "heading", beacon.heading_deg);
        kv_opt(out, "radius", beacon.activation_radius_m);
        kv_opt_text(out, "role", beacon.role.as_deref());
        metadata(out, &beacon.metadata);
    }
}

fn markers(out: &mut String, map: &TrackMap) {
    for marker in map.markers() {
        header(out, "marker", Some(&marker.id));
        kv(out, "type", marker.kind.as_str());
        kv(out, "x", marker.position.x);
        kv(out, "z", marker.position.z);
        kv_opt_text(out, "name", marker.name.as_deref());
        kv_opt_text(out, "shape", marker.shape_id.as_deref());
        kv_opt(out, "heading", marker.heading_deg);
        metadata(out, &marker.metadata);
    }
}

fn approaches(out: &mut String, map: &TrackMap) {
    for approach in map.approaches() {
        header(out, "approach", Some(&approach.sector_id));
        kv_opt_text(out, "name", approach.name.as_deref());
        kv_opt_text(out, "entry", approach.entry_portal_id.as_deref());
        kv_opt_text(out, "exit", approach.exit_portal_id.as_deref());
        kv_opt(out, "entry_heading", approach.entry_heading_deg);
        kv_opt(out, "exit_heading", approach.exit_heading_deg);
        kv_opt(out, "width", approach.width_m);
        kv_opt(out, "length", approach.length_m);
        kv_opt(out, "tolerance", approach.tolerance_deg);
        metadata(out, &approach.metadata);
    }
}
