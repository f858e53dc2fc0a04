use chrono::{NaiveDate, NaiveTime};

use crate::models::{PriceQuote, ValidatedSelection, Venue};

const HALF_HOUR_SECS: i64 = 30 * 60;

/// Prices a time range on `date`. Returns `None` when the range cannot be
/// priced: a bound is missing or the end does not come after the start.
pub fn quote(
    date: NaiveDate,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
    unit_price_per_hour: i64,
) -> Option<PriceQuote> {
    let (start, end) = (start?, end?);
    let elapsed = date.and_time(end) - date.and_time(start);
    let secs = elapsed.num_seconds();
    if secs <= 0 {
        return None;
    }

    let half_hours = billed_half_hours(secs);
    let unit = unit_price_per_hour.max(0);
    // half_hours * unit / 2, rounded half up, stays in integer units
    let total_amount = (half_hours.saturating_mul(unit).saturating_add(1)) / 2;

    Some(PriceQuote {
        raw_minutes: elapsed.num_minutes(),
        billed_hours: half_hours as f64 / 2.0,
        unit_price_per_hour: unit,
        total_amount,
    })
}

pub fn quote_selection(selection: &ValidatedSelection, venue: &Venue) -> Option<PriceQuote> {
    quote(
        selection.date,
        Some(selection.start_time),
        Some(selection.end_time),
        venue.unit_price_per_hour,
    )
}

/// Nearest half hour, ties rounding up, never less than one increment.
fn billed_half_hours(secs: i64) -> i64 {
    ((secs + HALF_HOUR_SECS / 2) / HALF_HOUR_SECS).max(1)
}
