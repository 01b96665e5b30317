//! Weekly delivery trend: shipped quantity per partner on a 53-week axis,
//! shaped for a stacked bar chart.

use std::fmt;

use chrono::Datelike;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::shipment::ShipmentRecord;

/// Slots on the week axis (ISO years have at most 53 weeks).
pub const WEEK_SLOTS: usize = 53;

/// Series colours handed out in first-seen order.
pub const BASE_PALETTE: [&str; 10] = [
    "#10b981", "#3b82f6", "#f97316", "#a855f7", "#ec4899", "#eab308", "#06b6d4", "#6366f1",
    "#84cc16", "#f43f5e",
];

/// Hue step for colours beyond the palette (golden angle, in degrees).
const HUE_STEP: f64 = 137.508;

/// Series name for rows without a partner summary.
pub const UNKNOWN_PARTNER: &str = "Unknown";

// ---------------------------------------------------------------------------
// Colours
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesColor {
    Hex(&'static str),
    Hsl { hue: f64 },
}

/// Colour of the `index`-th series.
pub fn series_color(index: usize) -> SeriesColor {
    match BASE_PALETTE.get(index) {
        Some(hex) => SeriesColor::Hex(*hex),
        None => SeriesColor::Hsl {
            hue: (index as f64 * HUE_STEP) % 360.0,
        },
    }
}

impl SeriesColor {
    /// The colour with an alpha channel, as `rgba(...)` or `hsla(...)`.
    pub fn with_alpha(&self, alpha: f64) -> String {
        match self {
            Self::Hex(hex) => {
                let channel = |range: std::ops::Range<usize>| {
                    hex.get(range)
                        .and_then(|h| u8::from_str_radix(h, 16).ok())
                        .unwrap_or(0)
                };
                format!("rgba({}, {}, {}, {alpha})", channel(1..3), channel(3..5), channel(5..7))
            }
            Self::Hsl { hue } => format!("hsla({hue}, 70%, 50%, {alpha})"),
        }
    }
}

impl fmt::Display for SeriesColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex(hex) => f.write_str(hex),
            Self::Hsl { hue } => write!(f, "hsl({hue}, 70%, 50%)"),
        }
    }
}

impl Serialize for SeriesColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

/// One stacked series: a partner's quantity per week slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub label: String,
    /// Always [`WEEK_SLOTS`] long; slot `i` is week `i + 1`.
    pub data: Vec<i64>,
    pub color: SeriesColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    /// Week numbers 1..=53, one per slot.
    pub weeks: Vec<u32>,
    pub series: Vec<TrendSeries>,
}

impl TrendChart {
    /// Stack height of one slot across all series.
    pub fn week_total(&self, slot: usize) -> i64 {
        self.series
            .iter()
            .filter_map(|s| s.data.get(slot))
            .sum()
    }
}

/// Slot of a record's processing week, or `None` when the week is missing
/// or outside 1..=53.
pub fn week_slot(record: &ShipmentRecord) -> Option<usize> {
    match record.processing_week {
        Some(week) if (1..=WEEK_SLOTS as i32).contains(&week) => Some((week - 1) as usize),
        _ => None,
    }
}

/// Net quantity, or gross quantity when net is absent or zero.
pub fn shipped_amount(record: &ShipmentRecord) -> i64 {
    match record.net_quantity {
        Some(net) if net != 0 => i64::from(net),
        _ => i64::from(record.quantity.unwrap_or(0)),
    }
}

/// Year a record belongs to: its processing date, else its delivery date.
pub fn record_year(record: &ShipmentRecord) -> Option<i32> {
    record
        .processing_date
        .or(record.delivery_date)
        .map(|day| day.year())
}

/// Distinct years present in `records`, newest first.
pub fn available_years<'a, I>(records: I) -> Vec<i32>
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
{
    let mut years: Vec<i32> = records.into_iter().filter_map(record_year).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Aggregate records into one series per partner, in first-seen order.
///
/// Returns `None` for an empty input. Records without a usable week are
/// skipped.
pub fn aggregate<'a, I>(records: I) -> Option<TrendChart>
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
{
    let mut records = records.into_iter().peekable();
    records.peek()?;

    let mut by_partner: IndexMap<String, Vec<i64>> = IndexMap::new();
    for record in records {
        let Some(slot) = week_slot(record) else {
            continue;
        };
        let name = record.partner_name().unwrap_or(UNKNOWN_PARTNER);
        let data = by_partner
            .entry(name.to_string())
            .or_insert_with(|| vec![0; WEEK_SLOTS]);
        data[slot] += shipped_amount(record);
    }

    let series = by_partner
        .into_iter()
        .enumerate()
        .map(|(i, (label, data))| TrendSeries {
            label,
            data,
            color: series_color(i),
        })
        .collect();

    Some(TrendChart {
        weeks: (1..=WEEK_SLOTS as u32).collect(),
        series,
    })
}

/// [`aggregate`] restricted to one year when `year` is given.
pub fn aggregate_year<'a, I>(records: I, year: Option<i32>) -> Option<TrendChart>
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
{
    aggregate(
        records
            .into_iter()
            .filter(move |r| year.map_or(true, |y| record_year(r) == Some(y))),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::PartnerSummary;
    use chrono::NaiveDate;

    fn ship(partner: Option<&str>, week: Option<i32>, qty: i32, net: Option<i32>) -> ShipmentRecord {
        ShipmentRecord {
            partner: partner.map(|name| PartnerSummary {
                id: 1,
                name: name.into(),
            }),
            processing_week: week,
            quantity: Some(qty),
            net_quantity: net,
            ..Default::default()
        }
    }

    #[test]
    fn empty_input_yields_no_chart() {
        assert_eq!(aggregate(&Vec::<ShipmentRecord>::new()), None);
    }

    #[test]
    fn accumulates_per_partner_and_week() {
        let rows = vec![
            ship(Some("A"), Some(1), 100, Some(95)),
            ship(Some("A"), Some(1), 50, None),
            ship(Some("B"), Some(53), 10, Some(8)),
        ];
        let chart = aggregate(&rows).unwrap();
        assert_eq!(chart.weeks.len(), WEEK_SLOTS);
        assert_eq!(chart.weeks[0], 1);
        assert_eq!(chart.weeks[52], 53);

        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].label, "A");
        assert_eq!(chart.series[0].data[0], 145);
        assert_eq!(chart.series[1].label, "B");
        assert_eq!(chart.series[1].data[52], 8);
        assert!(chart.series.iter().all(|s| s.data.len() == WEEK_SLOTS));
    }

    #[test]
    fn zero_net_falls_back_to_gross() {
        let rows = vec![ship(Some("A"), Some(2), 70, Some(0))];
        assert_eq!(aggregate(&rows).unwrap().series[0].data[1], 70);
    }

    #[test]
    fn invalid_weeks_are_dropped_silently() {
        let rows = vec![
            ship(Some("A"), None, 10, None),
            ship(Some("A"), Some(0), 10, None),
            ship(Some("A"), Some(54), 10, None),
            ship(Some("A"), Some(-3), 10, None),
            ship(Some("B"), Some(10), 5, None),
        ];
        let chart = aggregate(&rows).unwrap();
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].label, "B");
        let total: i64 = (0..WEEK_SLOTS).map(|w| chart.week_total(w)).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn all_rows_dropped_still_gives_axis() {
        let rows = vec![ship(Some("A"), None, 10, None)];
        let chart = aggregate(&rows).unwrap();
        assert!(chart.series.is_empty());
        assert_eq!(chart.weeks.len(), WEEK_SLOTS);
    }

    #[test]
    fn missing_partner_is_unknown() {
        let rows = vec![ship(None, Some(3), 4, None)];
        assert_eq!(aggregate(&rows).unwrap().series[0].label, UNKNOWN_PARTNER);
    }

    #[test]
    fn colours_follow_first_seen_order() {
        let names: Vec<String> = (0..12).map(|i| format!("P{i}")).collect();
        let rows: Vec<_> = names.iter().map(|n| ship(Some(n.as_str()), Some(1), 1, None)).collect();
        let chart = aggregate(&rows).unwrap();

        assert_eq!(chart.series[0].color, SeriesColor::Hex("#10b981"));
        assert_eq!(chart.series[9].color, SeriesColor::Hex("#f43f5e"));
        assert_eq!(chart.series[10].color, series_color(10));
        assert!(matches!(chart.series[11].color, SeriesColor::Hsl { .. }));
    }

    #[test]
    fn overflow_hues_stay_in_range() {
        for i in 10..200 {
            match series_color(i) {
                SeriesColor::Hsl { hue } => assert!((0.0..360.0).contains(&hue)),
                other => panic!("expected hsl for {i}, got {other:?}"),
            }
        }
    }

    #[test]
    fn colour_rendering() {
        assert_eq!(SeriesColor::Hex("#10b981").to_string(), "#10b981");
        assert_eq!(SeriesColor::Hex("#10b981").with_alpha(0.7), "rgba(16, 185, 129, 0.7)");
        assert_eq!(SeriesColor::Hsl { hue: 120.0 }.to_string(), "hsl(120, 70%, 50%)");
        assert_eq!(
            SeriesColor::Hsl { hue: 120.0 }.with_alpha(0.8),
            "hsla(120, 70%, 50%, 0.8)"
        );
    }

    #[test]
    fn year_filter_prefers_processing_date() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day);
        let mut a = ship(Some("A"), Some(1), 10, None);
        a.processing_date = d(2024, 1, 3);
        a.delivery_date = d(2023, 12, 30);
        let mut b = ship(Some("B"), Some(52), 20, None);
        b.delivery_date = d(2023, 12, 28);
        let c = ship(Some("C"), Some(5), 30, None);
        let rows = vec![a, b, c];

        assert_eq!(available_years(&rows), vec![2024, 2023]);

        let chart = aggregate_year(&rows, Some(2024)).unwrap();
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].label, "A");

        let chart = aggregate_year(&rows, Some(2023)).unwrap();
        assert_eq!(chart.series[0].label, "B");

        assert_eq!(aggregate_year(&rows, Some(2020)), None);
        assert_eq!(aggregate_year(&rows, None).unwrap().series.len(), 3);
    }

    #[test]
    fn serializes_colours_as_css() {
        let rows = vec![ship(Some("A"), Some(1), 1, None)];
        let json = serde_json::to_value(aggregate(&rows).unwrap()).unwrap();
        assert_eq!(json["series"][0]["color"], "#10b981");
    }
}
