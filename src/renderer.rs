//! # Terminal Rendering
//!
//! Plain-text views of the three responses for `--text` output. The conditions
//! view draws each day's overall rating as a column on a 1–10 grid, followed by a
//! one-line summary per day.

use crate::service::{ConditionsResponse, LunarCalendarResponse, MigrationEventsResponse};
use crate::tides::{FishingImpact, TideType};
use std::fmt::Write;

const ROWS: u8 = 10;
const Y_AXIS_WIDTH: usize = 4; // "10 │"
const COLUMN_WIDTH: usize = 3;

fn tide_label(tide_type: TideType) -> &'static str {
    match tide_type {
        TideType::HighTide => "high",
        TideType::LowTide => "low",
    }
}

fn impact_marker(impact: FishingImpact) -> char {
    match impact {
        FishingImpact::Positive => '+',
        FishingImpact::Negative => '-',
        FishingImpact::Neutral => '=',
    }
}

/// Rating chart plus per-day summaries.
pub fn render_ascii(response: &ConditionsResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({:.4}, {:.4})  {} to {}",
        response.location.name,
        response.location.latitude,
        response.location.longitude,
        response.period.start_date,
        response.period.end_date
    );
    if response.conditions.is_empty() {
        out.push_str("(no days)\n");
        return out;
    }
    out.push('\n');

    let columns = response.conditions.len() * COLUMN_WIDTH;
    for row in (1..=ROWS).rev() {
        let mut line = format!("{row:>2} │");
        line.reserve(columns);
        for report in &response.conditions {
            let cell = match report.overall_rating.cmp(&row) {
                std::cmp::Ordering::Equal => " • ",
                std::cmp::Ordering::Greater => " │ ",
                std::cmp::Ordering::Less => "   ",
            };
            line.push_str(cell);
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }

    let padding = " ".repeat(Y_AXIS_WIDTH);
    let _ = writeln!(out, "{padding}{}", "─".repeat(columns));
    let labels: String = response
        .conditions
        .iter()
        .map(|r| format!("{:>width$}", r.date.format("%d").to_string(), width = COLUMN_WIDTH))
        .collect();
    let _ = writeln!(out, "{padding}{labels}");
    out.push('\n');

    for report in &response.conditions {
        let tide = &report.tidal_influence;
        let best = report
            .best_hours
            .first()
            .map(|w| format!("{}-{}", w.start.format("%H:%M"), w.end.format("%H:%M")))
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(
            out,
            "{}  {:>2}/10  {:<15} {:>3.0}%  {} tide {}  best {}",
            report.date,
            report.overall_rating,
            report.lunar_phase.phase_type.label(),
            report.lunar_phase.illumination_percent,
            tide_label(tide.tide_type),
            impact_marker(tide.fishing_impact),
            best
        );
        if let Some(top) = report.species_influence.first() {
            let _ = write!(out, "  {} {}/10", top.species, top.activity_score);
        }
        out.push('\n');
    }
    out
}

pub fn render_lunar_calendar(response: &LunarCalendarResponse) -> String {
    let mut out = String::new();
    for phase in &response.phases {
        let _ = writeln!(
            out,
            "{}  {:<15} {:>5.1}%  age {:>4.1}d  {:>7.0} km",
            phase.date,
            phase.phase_type.label(),
            phase.illumination_percent,
            phase.age_days,
            phase.distance_km
        );
    }
    out
}

pub fn render_migrations(response: &MigrationEventsResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  {} event(s)", response.location.name, response.events.len());
    for event in &response.events {
        let _ = writeln!(
            out,
            "{}  {:<10} {:<9} {:>5.1}%  {}",
            event.date,
            event.species,
            format!("{:?}", event.event_type).to_lowercase(),
            event.probability * 100.0,
            event.description
        );
    }
    out
}
