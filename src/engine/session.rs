//! Trading session labelling and low-liquidity damping

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::config::SessionPenalties;
use crate::types::{Candle, Session};

fn utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn is_weekend(dt: &DateTime<Utc>) -> bool {
    dt.weekday().number_from_monday() >= 6
}

/// Session of the latest bar: weekend, then asia 00-08, europe 08-13, us otherwise
pub fn session_label(candles: &[Candle]) -> Session {
    let Some(dt) = candles.last().and_then(|c| utc(c.ts)) else {
        return Session::Unknown;
    };

    if is_weekend(&dt) {
        return Session::Weekend;
    }
    match dt.hour() {
        0..=7 => Session::Asia,
        8..=12 => Session::Europe,
        _ => Session::Us,
    }
}

/// Points that pull `net` toward zero during the weekday dead zone or the
/// weekend, with the trace code. Never flips the sign of `net`.
pub fn session_damping(ts: i64, net: f64, rules: &SessionPenalties) -> Option<(f64, &'static str)> {
    let dt = utc(ts)?;

    let (points, code) = if is_weekend(&dt) {
        (rules.weekend_points, "SESSION_WEEKEND")
    } else if dt.hour() >= rules.dead_zone_start_hour && dt.hour() < rules.dead_zone_end_hour {
        (rules.dead_zone_points, "SESSION_DEAD_ZONE")
    } else {
        return None;
    };

    let delta = if net == 0.0 {
        0.0
    } else {
        -net.signum() * net.abs().min(points)
    };
    Some((delta, code))
}
