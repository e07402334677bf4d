//! # Synthetic Tide Model
//!
//! A simple equilibrium tide used to describe how moving water will
//! affect a fishing day. It is not a tide prediction and must not be presented as one.
//!
//! ## Model
//! - **Constituents**: lunar M2 (12.42 h) plus a solar S2 term riding on the M2 phase
//! - **Phase**: driven by hour-of-day and day-of-year, shifted by longitude
//!   (one hour per 15°) so neighbouring spots do not share identical curves
//! - **Spring–neap**: the S2 term is advanced by twice the moon's cycle angle, so
//!   the constituents reinforce near new/full moon and partly cancel at quarters
//! - **Shelf damping**: amplitude grows slightly with distance from shore
//!
//! ## Outputs
//! Height is metres relative to mean level. `strength` scales |height| against the
//! largest possible amplitude onto 0–10. `fishing_impact` looks at the rate of change:
//! fast-moving water is positive, near-slack water negative.

use crate::lunar::{LunarPhaseCalculator, SYNODIC_MONTH_DAYS};
use crate::Location;
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

const A_M2_M: f64 = 1.20;
const P_M2_HRS: f64 = 12.42;
const A_S2_M: f64 = 0.35;

/// Extra amplitude per km offshore, capped at `MAX_SHELF_GAIN`.
const SHELF_GAIN_PER_KM: f64 = 0.01;
const MAX_SHELF_GAIN: f64 = 0.25;

/// Search step and horizon for the next turn of the tide.
const STEP_MINUTES: i64 = 10;
const HORIZON_MINUTES: i64 = 14 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TideType {
    HighTide,
    LowTide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FishingImpact {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalInfluence {
    #[serde(rename = "type")]
    pub tide_type: TideType,
    pub height_meters: f64,
    /// 0–10
    pub strength: u8,
    pub next_change_time: NaiveDateTime,
    pub fishing_impact: FishingImpact,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TidalApproximator {
    lunar: LunarPhaseCalculator,
}

impl TidalApproximator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthetic tide state at `at` (local solar time) for `location`.
    pub fn approximate(&self, at: NaiveDateTime, location: &Location) -> TidalInfluence {
        let curve = TideCurve::for_day(&self.lunar, at, location);

        let height = curve.height(at);
        let slope = curve.slope(at);
        let tide_type = if height >= 0.0 {
            TideType::HighTide
        } else {
            TideType::LowTide
        };

        let strength = ((height.abs() / curve.max_amplitude()) * 10.0).round().clamp(0.0, 10.0) as u8;

        // Slope relative to the steepest the day's curve gets.
        let flow = (slope.abs() / curve.max_slope()).clamp(0.0, 1.0);
        let fishing_impact = if flow >= 0.6 {
            FishingImpact::Positive
        } else if flow < 0.25 {
            FishingImpact::Negative
        } else {
            FishingImpact::Neutral
        };

        let next_change_time = curve.next_turn(at);
        let rising = slope >= 0.0;
        let description = format!(
            "{} tide {} ({:+.2} m), turns at {}; {}",
            if rising { "Rising" } else { "Falling" },
            if tide_type == TideType::HighTide { "above mean level" } else { "below mean level" },
            height,
            next_change_time.format("%H:%M"),
            match fishing_impact {
                FishingImpact::Positive => "strong current should trigger feeding",
                FishingImpact::Neutral => "moderate current",
                FishingImpact::Negative => "near slack water, expect a lull",
            }
        );

        TidalInfluence {
            tide_type,
            height_meters: (height * 100.0).round() / 100.0,
            strength,
            next_change_time,
            fishing_impact,
            description,
        }
    }
}

struct TideCurve {
    /// Phase offset in hours from longitude
    offset_hrs: f64,
    /// S2 lead over M2 from the spring-neap cycle (radians)
    s2_shift: f64,
    gain: f64,
}

impl TideCurve {
    fn for_day(lunar: &LunarPhaseCalculator, at: NaiveDateTime, location: &Location) -> Self {
        let moon = lunar.calculate(at.date());
        let moon_angle = moon.age_days / SYNODIC_MONTH_DAYS * TAU;
        let gain = 1.0 + (location.distance_from_shore_km * SHELF_GAIN_PER_KM).min(MAX_SHELF_GAIN);
        Self {
            offset_hrs: location.longitude / 15.0,
            s2_shift: 2.0 * moon_angle,
            gain,
        }
    }

    /// Largest amplitude any day can reach (full spring tide).
    fn max_amplitude(&self) -> f64 {
        self.gain * (A_M2_M + A_S2_M)
    }

    /// Amplitude of the combined wave for this day.
    fn day_amplitude(&self) -> f64 {
        let combined = A_M2_M * A_M2_M + A_S2_M * A_S2_M + 2.0 * A_M2_M * A_S2_M * self.s2_shift.cos();
        self.gain * combined.max(0.0).sqrt()
    }

    fn max_slope(&self) -> f64 {
        (self.day_amplitude() * TAU / P_M2_HRS).max(f64::EPSILON)
    }

    /// M2 phase angle from hour-of-day and day-of-year.
    fn theta(&self, at: NaiveDateTime) -> f64 {
        let day_of_year = at.ordinal0() as f64;
        let hour_of_day = at.hour() as f64 + at.minute() as f64 / 60.0 + at.second() as f64 / 3600.0;
        (day_of_year * 24.0 + hour_of_day + self.offset_hrs) / P_M2_HRS * TAU
    }

    fn height(&self, at: NaiveDateTime) -> f64 {
        let theta = self.theta(at);
        self.gain * (A_M2_M * theta.sin() + A_S2_M * (theta + self.s2_shift).sin())
    }

    /// Metres per hour.
    fn slope(&self, at: NaiveDateTime) -> f64 {
        let theta = self.theta(at);
        self.gain * TAU / P_M2_HRS * (A_M2_M * theta.cos() + A_S2_M * (theta + self.s2_shift).cos())
    }

    /// First sampled instant after `at` where the slope changes sign.
    fn next_turn(&self, at: NaiveDateTime) -> NaiveDateTime {
        let initial = self.slope(at).signum();
        let mut t = at;
        for _ in 0..HORIZON_MINUTES / STEP_MINUTES {
            t += Duration::minutes(STEP_MINUTES);
            if self.slope(t).signum() != initial {
                return t;
            }
        }
        at + Duration::minutes((P_M2_HRS * 30.0) as i64)
    }
}
