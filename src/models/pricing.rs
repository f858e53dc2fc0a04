use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    /// Wall-clock minutes between start and end.
    pub raw_minutes: i64,
    /// Billed duration, a whole number of half hours.
    pub billed_hours: f64,
    pub unit_price_per_hour: i64,
    pub total_amount: i64,
}
