//! City → county lookup used by the partner form.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

/// Settlement directory keyed by city name, valued by county.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LocationDirectory {
    cities: BTreeMap<String, String>,
}

impl LocationDirectory {
    pub fn from_pairs<I, C, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, K)>,
        C: Into<String>,
        K: Into<String>,
    {
        Self {
            cities: pairs
                .into_iter()
                .map(|(city, county)| (city.into(), county.into()))
                .collect(),
        }
    }

    /// Distinct counties, sorted.
    pub fn counties(&self) -> Vec<&str> {
        self.cities
            .values()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Cities of one county, sorted. Unknown counties yield nothing.
    pub fn cities(&self, county: &str) -> Vec<&str> {
        self.cities
            .iter()
            .filter(|(_, c)| c.as_str() == county)
            .map(|(city, _)| city.as_str())
            .collect()
    }

    pub fn county_of(&self, city: &str) -> Option<&str> {
        self.cities.get(city).map(String::as_str)
    }
}
