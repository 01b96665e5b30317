//! Per-partner quality statistics and the leaderboard score.

use serde::{Deserialize, Serialize};

use crate::shipment::ShipmentRecord;

/// Averages over a set of shipments. Each average only counts rows where
/// the value is present; with no such rows it is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartnerStats {
    pub avg_liver_weight: f64,
    pub avg_kosher_percent: f64,
    pub avg_fattening_rate: f64,
    pub avg_mortality_rate: f64,
}

impl PartnerStats {
    pub fn from_shipments<'a, I>(shipments: I) -> Self
    where
        I: IntoIterator<Item = &'a ShipmentRecord>,
    {
        let mut liver = Mean::default();
        let mut kosher = Mean::default();
        let mut fattening = Mean::default();
        let mut mortality = Mean::default();

        for s in shipments {
            liver.push(s.liver_weight);
            kosher.push(s.kosher_percent);
            fattening.push(s.fattening_rate);
            mortality.push(s.mortality_rate);
        }

        Self {
            avg_liver_weight: liver.value(),
            avg_kosher_percent: kosher.value(),
            avg_fattening_rate: fattening.value(),
            avg_mortality_rate: mortality.value(),
        }
    }

    /// Every average rounded to two decimals.
    pub fn rounded(self) -> Self {
        Self {
            avg_liver_weight: round2(self.avg_liver_weight),
            avg_kosher_percent: round2(self.avg_kosher_percent),
            avg_fattening_rate: round2(self.avg_fattening_rate),
            avg_mortality_rate: round2(self.avg_mortality_rate),
        }
    }

    /// Whether the partner has any liver or kosher data worth ranking.
    pub fn has_quality_data(&self) -> bool {
        self.avg_liver_weight > 0.0 || self.avg_kosher_percent > 0.0
    }

    /// Leaderboard score.
    ///
    /// `kosher * 5 + liver * 400`, scaled by `1 + (5 - mortality) * 0.025`
    /// (never below zero), rounded to two decimals. A negative mortality
    /// rate leaves the base score unscaled.
    pub fn score(&self) -> f64 {
        let base = self.avg_kosher_percent * 5.0 + self.avg_liver_weight * 400.0;
        let multiplier = if self.avg_mortality_rate >= 0.0 {
            (1.0 + (5.0 - self.avg_mortality_rate) * 0.025).max(0.0)
        } else {
            1.0
        };
        round2(base * multiplier)
    }
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Round half up (towards positive infinity) to two decimals, as the
/// analytics backend does; NaN and infinities become 0.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0 + 0.5).floor() / 100.0
}
