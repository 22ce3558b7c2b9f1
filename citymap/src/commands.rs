//! Subcommand handlers.
//!
//! Text output mirrors the minimap's info panel; `--json` prints the same
//! values as JSON for scripting.

use crate::{Command, DestinationCommand, ZoomCommand};
use citymap_core::{
    Briefing, Category, GridPoint, Intersection, Landmark, Navigator, SyncReport, EDGE_OF_MAP,
};
use serde_json::json;

pub async fn run(nav: &mut Navigator, command: Command, as_json: bool) -> anyhow::Result<()> {
    match command {
        Command::Update { category } => {
            let now = chrono::Utc::now();
            let reports = match category {
                Some(category) => vec![nav.refresh(category, now).await?],
                None => nav.update_data(now).await?,
            };
            if as_json {
                let value: Vec<_> = reports.iter().map(report_json).collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if reports.is_empty() {
                println!("Nothing due for an update.");
            } else {
                reports.iter().for_each(print_report);
            }
        }
        Command::Briefing => {
            let briefing = nav.briefing();
            if as_json {
                println!("{}", serde_json::to_string_pretty(&briefing)?);
            } else {
                print_briefing(&briefing);
            }
        }
        Command::Nearest { category, limit } => {
            let hits = nav.nearest(category);
            if as_json {
                let value: Vec<_> = hits
                    .iter()
                    .take(limit)
                    .map(|hit| {
                        json!({
                            "name": hit.name(),
                            "point": hit.point,
                            "distance": hit.distance,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if hits.is_empty() {
                println!("No {category} locations known.");
            } else {
                for hit in hits.iter().take(limit) {
                    println!(
                        "{:>4} AP  {}  ({})",
                        hit.distance,
                        hit.name(),
                        nav.intersection_name(hit.point)
                    );
                }
            }
        }
        Command::Route { column, row } => {
            let to = nav.cell_at(&column, &row)?;
            let options = nav.route_to(to);
            if as_json {
                let transit = options.transit.map(|t| {
                    json!({
                        "boarding": t.boarding.name(),
                        "alighting": t.alighting.name(),
                        "cost": t.total_cost(),
                    })
                });
                let value = json!({ "to": to, "direct": options.direct, "transit": transit });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Walk: {} AP", options.direct);
                match options.transit {
                    Some(t) => println!(
                        "Transit: {} AP ({} to {})",
                        t.total_cost(),
                        t.boarding.name(),
                        t.alighting.name()
                    ),
                    None => println!("Transit: unavailable"),
                }
            }
        }
        Command::Destination(sub) => destination(nav, sub).await?,
        Command::Zoom(sub) => {
            match sub {
                ZoomCommand::Show => {}
                ZoomCommand::In => {
                    nav.zoom_in().await?;
                }
                ZoomCommand::Out => {
                    nav.zoom_out().await?;
                }
                ZoomCommand::Set { level } => {
                    nav.set_zoom(level).await?;
                }
            }
            let range = nav.viewport().zoom_range();
            println!(
                "Zoom: {} ({}..={})",
                nav.viewport().zoom_level(),
                range.min(),
                range.max()
            );
        }
        Command::Map { go } => {
            if let Some([column, row]) = go.as_deref() {
                nav.go_to_intersection(column, row)?;
            }
            print_map(nav);
        }
        Command::Name { column, row } => {
            println!("{}", nav.intersection_name(GridPoint::new(column, row)));
        }
        Command::Relocate {
            category,
            name,
            location,
            clear,
        } => {
            let at = match (clear, location.as_slice()) {
                (true, _) => None,
                (false, [column, row]) => Some(Intersection::new(column.as_str(), row.as_str())),
                _ => anyhow::bail!("give COLUMN ROW or --clear"),
            };
            match nav.relocate(category, &name, at).await? {
                Some(point) => println!("{name} is now at {}", nav.intersection_name(point)),
                None => println!("{name} marked unknown"),
            }
        }
    }
    Ok(())
}

async fn destination(nav: &mut Navigator, command: DestinationCommand) -> anyhow::Result<()> {
    match command {
        DestinationCommand::Show => match nav.destination() {
            Some(point) => println!("{} {}", nav.intersection_name(point), point),
            None => println!("No destination set."),
        },
        DestinationCommand::Set { column, row } => {
            let point = nav.set_destination_to(&column, &row).await?;
            println!("Destination set to {} {}", nav.intersection_name(point), point);
        }
        DestinationCommand::Clear => {
            nav.clear_destination().await?;
            println!("Destination cleared.");
        }
        DestinationCommand::Recent => {
            for point in nav.recent_destinations().await? {
                println!("{} {}", nav.intersection_name(point), point);
            }
        }
    }
    Ok(())
}

fn report_json(report: &SyncReport) -> serde_json::Value {
    json!({
        "category": report.category,
        "updated": report.updated,
        "unresolved": report.unresolved,
        "reset_malformed": report.reset_malformed,
        "next_refresh": report.next_refresh,
        "dropped": report
            .dropped
            .iter()
            .map(|skip| json!({ "name": skip.name, "reason": skip.reason.to_string() }))
            .collect::<Vec<_>>(),
    })
}

fn print_report(report: &SyncReport) {
    println!(
        "{}: {} placed, {} unknown, next update {}",
        report.category, report.updated, report.unresolved, report.next_refresh
    );
    if report.reset_malformed > 0 {
        println!(
            "  {} landmarks reset by unreadable catalog rows",
            report.reset_malformed
        );
    }
    for skip in &report.dropped {
        match &skip.intersection {
            Some(at) => println!("  skipped {} at {}: {}", skip.name, at, skip.reason),
            None => println!("  skipped {}: {}", skip.name, skip.reason),
        }
    }
}

fn print_briefing(briefing: &Briefing) {
    println!("Location: {} {}", briefing.location, briefing.position);
    print_landmark("Bank", briefing.nearest_bank.as_ref());
    print_landmark("Transit", briefing.nearest_transit.as_ref());
    print_landmark("Tavern", briefing.nearest_tavern.as_ref());

    match &briefing.destination {
        Some(dest) => {
            let place = dest
                .place
                .as_deref()
                .map(|p| format!(" - {p}"))
                .unwrap_or_default();
            println!(
                "Destination: {}{} ({} AP)",
                dest.intersection, place, dest.cost
            );
        }
        None => println!("Destination: none"),
    }
    if let Some(transit) = &briefing.transit {
        println!(
            "Via transit: {} to {} ({} AP)",
            transit.boarding, transit.alighting, transit.cost
        );
    }
}

fn print_landmark(label: &str, landmark: Option<&Landmark>) {
    match landmark {
        Some(l) => println!("{label}: {} at {} ({} AP)", l.name, l.intersection, l.cost),
        None => println!("{label}: unknown"),
    }
}

/// One character per cell: `@` position, `*` destination, a category initial
/// for a landmark, `#` off the map, `.` otherwise.
fn print_map(nav: &Navigator) {
    let viewport = nav.viewport();
    let zoom = viewport.zoom_level() as usize;
    let cells: Vec<GridPoint> = viewport.visible_cells().collect();

    for line in cells.chunks(zoom) {
        let row: String = line.iter().map(|cell| glyph(nav, *cell)).collect();
        println!("{row}");
    }
    println!("{}", nav.intersection_name(viewport.center()));
}

fn glyph(nav: &Navigator, cell: GridPoint) -> char {
    if nav.position() == Some(cell) {
        return '@';
    }
    if nav.destination() == Some(cell) {
        return '*';
    }
    if let Some(entity) = nav.entities_at(cell).first() {
        return match entity.category {
            Category::Bank => 'B',
            Category::Tavern => 'T',
            Category::Transit => 'R',
            Category::Shop => 'S',
            Category::Guild => 'G',
            Category::UserBuilding => 'U',
            Category::PlaceOfInterest => 'P',
        };
    }
    let bounds = viewport_bounds(nav);
    if cell.column < 0 || cell.row < 0 || cell.column > bounds.0 || cell.row > bounds.1 {
        return '#';
    }
    if nav.intersection_name(cell) == EDGE_OF_MAP {
        // Street and alley cells have no block name.
        return ' ';
    }
    '.'
}

fn viewport_bounds(nav: &Navigator) -> (i32, i32) {
    let bounds = nav.viewport().bounds();
    (bounds.max_column, bounds.max_row)
}
