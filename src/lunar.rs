//! Moon phase, illumination and solunar feeding windows.
//!
//! Phase and distance come from Schaefer's low-precision lunar routine
//! (Sky & Telescope, Mar 1985 / Apr 1994). Accuracy is about ±1 day for the
//! phase category and ~6 % for distance, which is plenty for ranking fishing days.
//!
//! The routine is pure modulo arithmetic over the synodic month, so it is defined
//! for any proleptic-Gregorian date chrono can represent.

use crate::FishingWindow;
use chrono::{Datelike, NaiveDate, NaiveTime};
use core::f64::consts::{PI, TAU};
use serde::{Deserialize, Serialize};

/// Mean synodic month length in days.
pub const SYNODIC_MONTH_DAYS: f64 = 29.530_588_2;

/// Upper bound on the number of windows `best_fishing_hours` returns.
pub const MAX_FISHING_WINDOWS: usize = 6;

const EARTH_RADIUS_KM: f64 = 6378.137;
const MOON_RADIUS_KM: f64 = 1737.4;
const MINUTES_PER_DAY: i64 = 24 * 60;

/// The eight traditional phase categories, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LunarPhaseType {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl LunarPhaseType {
    /// Map Schaefer's phase index (0 = new, 4 = full) to a category.
    pub fn from_index(index: u8) -> Self {
        match index & 7 {
            0 => Self::NewMoon,
            1 => Self::WaxingCrescent,
            2 => Self::FirstQuarter,
            3 => Self::WaxingGibbous,
            4 => Self::FullMoon,
            5 => Self::WaningGibbous,
            6 => Self::LastQuarter,
            _ => Self::WaningCrescent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NewMoon => "New Moon",
            Self::WaxingCrescent => "Waxing Crescent",
            Self::FirstQuarter => "First Quarter",
            Self::WaxingGibbous => "Waxing Gibbous",
            Self::FullMoon => "Full Moon",
            Self::WaningGibbous => "Waning Gibbous",
            Self::LastQuarter => "Last Quarter",
            Self::WaningCrescent => "Waning Crescent",
        }
    }

    /// Intrinsic fishing strength on a 0–10 scale. Syzygy (new/full) is strongest.
    pub fn fishing_strength(self) -> f64 {
        match self {
            Self::NewMoon | Self::FullMoon => 9.0,
            Self::WaningCrescent => 7.0,
            Self::WaxingCrescent | Self::WaxingGibbous | Self::WaningGibbous => 6.0,
            Self::FirstQuarter | Self::LastQuarter => 5.0,
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            Self::NewMoon => "New moon: dark nights concentrate feeding around dawn and dusk",
            Self::WaxingCrescent => "Waxing crescent: activity builds toward the first quarter",
            Self::FirstQuarter => "First quarter: neap tides, expect slower water and patchy bites",
            Self::WaxingGibbous => "Waxing gibbous: tides strengthen, evenings improve",
            Self::FullMoon => "Full moon: strong spring tides and bright nights, fish the major periods",
            Self::WaningGibbous => "Waning gibbous: good morning bites as tides ease",
            Self::LastQuarter => "Last quarter: neap tides, fish structure and slack-water edges",
            Self::WaningCrescent => "Waning crescent: feeding picks up ahead of the new moon",
        }
    }

    fn is_syzygy(self) -> bool {
        matches!(self, Self::NewMoon | Self::FullMoon)
    }
}

/// One calendar day's moon. Exactly one record per date.
///
/// `fishing_strength` and `description` are optional so records persisted without
/// them still load; consumers fall back to a baseline when they are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarPhase {
    pub date: NaiveDate,
    pub phase_type: LunarPhaseType,
    /// Elongation-style phase angle, 0 = new, 180 = full, in `[0, 360)`
    pub angle: f64,
    /// Illuminated fraction of the disc, `[0, 100]`
    pub illumination_percent: f64,
    /// Days since new moon
    pub age_days: f64,
    pub distance_km: f64,
    pub apparent_diameter_deg: f64,
    #[serde(default)]
    pub fishing_strength: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Raw output of Schaefer's routine.
#[derive(Debug, Clone, Copy)]
struct Ephemeris {
    phase_index: u8,
    /// Fraction of the synodic cycle elapsed, `[0, 1)`
    cycle_fraction: f64,
    distance_er: f64,
}

fn frac(v: f64) -> f64 {
    let f = v - v.floor();
    if f < 0.0 {
        f + 1.0
    } else {
        f
    }
}

/// Schaefer's phase and distance for a Y-M-D; `day` may be fractional (noon = .5).
fn schaefer_moon(year: i32, month: u32, day: f64) -> Ephemeris {
    // March-based year keeps the leap day at the end of the count.
    let (mut y, mut m) = (year as f64, month as f64);
    if m < 3.0 {
        y -= 1.0;
        m += 12.0;
    }
    m += 1.0;

    // Days from the 1900-01-00 12 UT new-moon epoch.
    let days = (365.25 * y).floor() + (30.6 * m).floor() + day - 694_039.09;

    let cycle_fraction = frac(days / SYNODIC_MONTH_DAYS);
    let phase_index = ((cycle_fraction * 8.0) + 0.5).floor() as u8 & 7;

    // Anomalistic month drives the perigee distance term.
    let elong = 2.0 * cycle_fraction * TAU;
    let dp = frac((days - 12.1) / 27.554_549_88) * TAU;
    let distance_er = 60.4 - 3.3 * dp.cos() - 0.6 * (elong - dp).cos() - 0.5 * elong.cos();

    Ephemeris {
        phase_index,
        cycle_fraction,
        distance_er,
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (v * scale).round() / scale
}

/// Computes [`LunarPhase`] records and solunar windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct LunarPhaseCalculator;

impl LunarPhaseCalculator {
    pub fn new() -> Self {
        Self
    }

    /// The moon at UTC noon of `date`. Pure and deterministic.
    pub fn calculate(&self, date: NaiveDate) -> LunarPhase {
        let eph = schaefer_moon(date.year(), date.month(), date.day() as f64 + 0.5);
        let phase_type = LunarPhaseType::from_index(eph.phase_index);

        let mut angle = round_to(eph.cycle_fraction * 360.0, 4);
        if angle >= 360.0 {
            angle -= 360.0;
        }
        let illumination = (1.0 - (eph.cycle_fraction * TAU).cos()) / 2.0 * 100.0;
        let distance_km = eph.distance_er * EARTH_RADIUS_KM;
        let apparent_diameter_deg = 2.0 * (MOON_RADIUS_KM / distance_km).atan() * 180.0 / PI;

        LunarPhase {
            date,
            phase_type,
            angle,
            illumination_percent: round_to(illumination, 2).clamp(0.0, 100.0),
            age_days: round_to(eph.cycle_fraction * SYNODIC_MONTH_DAYS, 3),
            distance_km: round_to(distance_km, 1),
            apparent_diameter_deg: round_to(apparent_diameter_deg, 4),
            fishing_strength: Some(phase_type.fishing_strength()),
            description: Some(phase_type.advice().to_string()),
        }
    }

    /// Solunar feeding windows for the day, best first.
    ///
    /// Times are local solar time. Major periods bracket the moon's upper and lower
    /// transit; minor periods sit on moonrise and moonset; dawn and dusk are added
    /// as fixed windows. A window that overlaps dawn or dusk gains a point, and
    /// majors gain a point around new and full moon. Ties sort by start time.
    pub fn best_fishing_hours(&self, _date: NaiveDate, phase: &LunarPhase) -> Vec<FishingWindow> {
        // The moon transits at noon when new and ~50 minutes later each day.
        let transit = 12 * 60 + (phase.age_days / SYNODIC_MONTH_DAYS * MINUTES_PER_DAY as f64).round() as i64;
        let syzygy_bonus = u8::from(phase.phase_type.is_syzygy());

        let twilight = [
            Slot::new(6 * 60, 60, "Dawn bite", 7),
            Slot::new(19 * 60, 60, "Dusk bite", 7),
        ];
        let mut slots = vec![
            Slot::new(transit, 60, "Major solunar period (moon overhead)", 8 + syzygy_bonus),
            Slot::new(transit + 12 * 60, 60, "Major solunar period (moon underfoot)", 8 + syzygy_bonus),
            Slot::new(transit - 6 * 60, 30, "Minor solunar period (moonrise)", 6),
            Slot::new(transit + 6 * 60, 30, "Minor solunar period (moonset)", 6),
        ];
        for slot in &mut slots {
            if twilight.iter().any(|t| slot.overlaps(t)) {
                slot.quality = (slot.quality + 1).min(10);
            }
        }
        slots.extend(twilight);

        slots.sort_by(|a, b| b.quality.cmp(&a.quality).then(a.start().cmp(&b.start())));
        slots.truncate(MAX_FISHING_WINDOWS);
        slots.into_iter().map(Slot::into_window).collect()
    }
}

/// Window expressed as a centre minute and half-width, wrapping over midnight.
struct Slot {
    centre: i64,
    half_width: i64,
    description: &'static str,
    quality: u8,
}

impl Slot {
    fn new(centre: i64, half_width: i64, description: &'static str, quality: u8) -> Self {
        Self {
            centre: centre.rem_euclid(MINUTES_PER_DAY),
            half_width,
            description,
            quality,
        }
    }

    fn start(&self) -> i64 {
        (self.centre - self.half_width).rem_euclid(MINUTES_PER_DAY)
    }

    fn end(&self) -> i64 {
        (self.centre + self.half_width).rem_euclid(MINUTES_PER_DAY)
    }

    fn overlaps(&self, other: &Slot) -> bool {
        let gap = (self.centre - other.centre).rem_euclid(MINUTES_PER_DAY);
        let gap = gap.min(MINUTES_PER_DAY - gap);
        gap < self.half_width + other.half_width
    }

    fn into_window(self) -> FishingWindow {
        FishingWindow {
            start: minute_of_day(self.start()),
            end: minute_of_day(self.end()),
            description: self.description.to_string(),
            quality: self.quality,
        }
    }
}

fn minute_of_day(minute: i64) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt((minute.rem_euclid(MINUTES_PER_DAY) * 60) as u32, 0)
        .unwrap_or(NaiveTime::MIN)
}
