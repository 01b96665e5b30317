#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;

use poultry_core::partner::{Partner, PartnerGroup, StatsScope};
use poultry_core::shipment::{PartnerSummary, ShipmentRecord};
use poultry_core::types::{CalendarDay, DbId};
use poultry_editor::memory::{Fixture, InMemoryGateway};

pub fn day(year: i32, month: u32, day: u32) -> CalendarDay {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// The day new rows are stamped with in these tests.
pub fn today() -> CalendarDay {
    day(2024, 5, 2)
}

pub fn partner(id: DbId, name: &str) -> Partner {
    Partner {
        id,
        name: name.to_string(),
        city: None,
        county: None,
        total_quantity: None,
        group: None,
    }
}

/// A persisted 2024 shipment with a valid `NNN/24` delivery code.
pub fn shipment(id: DbId, partner_id: DbId, quantity: i32, mortality: i32) -> ShipmentRecord {
    ShipmentRecord {
        id: Some(id),
        partner_id: Some(partner_id),
        partner: Some(PartnerSummary {
            id: partner_id,
            name: format!("Partner {partner_id}"),
        }),
        delivery_code: Some(format!("{id:03}/24")),
        delivery_date: Some(day(2024, 3, 4)),
        processing_date: Some(day(2024, 3, 6)),
        processing_week: Some(10),
        quantity: Some(quantity),
        net_quantity: Some(quantity - mortality),
        mortality_count: Some(mortality),
        liver_weight: Some(0.6),
        kosher_percent: Some(60.0),
        mortality_rate: Some(2.0),
        ..Default::default()
    }
}

/// Two partners; partner 1 owns shipment 1, partner 2 owns shipment 2.
pub fn fixture() -> Fixture {
    Fixture {
        partners: vec![partner(1, "Alfa"), partner(2, "Beta")],
        groups: Vec::<PartnerGroup>::new(),
        shipments: vec![shipment(1, 1, 100, 5), shipment(2, 2, 80, 0)],
        ..Fixture::default()
    }
}

pub fn gateway() -> Arc<InMemoryGateway> {
    Arc::new(InMemoryGateway::new(fixture()))
}

pub fn alfa() -> StatsScope {
    StatsScope::Partner {
        id: 1,
        name: "Alfa".to_string(),
    }
}
