//! Shipment records, typed field access and the save payload.
//!
//! A [`ShipmentRecord`] is one delivery/processing row as the backend
//! reports it. Averages are derived on demand and never stored. Edits go
//! through [`ShipmentRecord::set`] with a [`ShipmentField`] and a typed
//! [`FieldValue`], so the edit session can compare rows field by field.

use serde::{Deserialize, Serialize};

use crate::calendar::optional_day;
use crate::error::CoreError;
use crate::types::{CalendarDay, DbId};

/// Message shown when a row is saved without a delivery code.
pub const MISSING_DELIVERY_CODE: &str = "The delivery code is required on every row.";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Minimal partner reference embedded in shipment rows by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerSummary {
    pub id: DbId,
    pub name: String,
}

/// One shipment row.
///
/// `id` is `None` for rows that have never been saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipmentRecord {
    pub id: Option<DbId>,
    pub partner_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<PartnerSummary>,
    pub location_id: Option<DbId>,
    pub grower_id: Option<DbId>,
    pub delivery_code: Option<String>,
    #[serde(with = "optional_day")]
    pub delivery_date: Option<CalendarDay>,
    #[serde(with = "optional_day")]
    pub processing_date: Option<CalendarDay>,
    pub processing_week: Option<i32>,
    pub quantity: Option<i32>,
    pub total_weight: Option<f64>,
    pub net_quantity: Option<i32>,
    pub net_weight: Option<f64>,
    pub transport_mortality: Option<i32>,
    pub transport_mortality_kg: Option<f64>,
    pub liver_weight: Option<f64>,
    pub kosher_percent: Option<f64>,
    pub fattening_rate: Option<f64>,
    pub fattening_days: Option<i32>,
    pub mortality_count: Option<i32>,
    pub mortality_rate: Option<f64>,
}

impl ShipmentRecord {
    /// A fresh unsaved row as the table inserts it: empty code, delivered
    /// today, zeroed quantities.
    pub fn blank(partner_id: Option<DbId>, today: CalendarDay) -> Self {
        Self {
            partner_id,
            delivery_code: Some(String::new()),
            delivery_date: Some(today),
            quantity: Some(0),
            total_weight: Some(0.0),
            liver_weight: Some(0.0),
            kosher_percent: Some(0.0),
            fattening_rate: Some(0.0),
            mortality_count: Some(0),
            mortality_rate: Some(0.0),
            ..Self::default()
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Partner name from the embedded summary, if the backend sent one.
    pub fn partner_name(&self) -> Option<&str> {
        self.partner.as_ref().map(|p| p.name.as_str())
    }

    /// Average intake weight per bird; zero when there is no quantity.
    pub fn avg_weight(&self) -> f64 {
        ratio(self.total_weight, self.quantity)
    }

    /// Average delivered weight per bird; zero when there is no net quantity.
    pub fn net_avg_weight(&self) -> f64 {
        ratio(self.net_weight, self.net_quantity)
    }

    /// `quantity - mortality_count`, absent operands counting as zero.
    /// Saturates at the `i32` bounds.
    pub fn computed_net_quantity(&self) -> i32 {
        self.quantity
            .unwrap_or(0)
            .saturating_sub(self.mortality_count.unwrap_or(0))
    }

    /// Required-field check run before a row may be sent to the backend.
    pub fn validate_for_save(&self) -> Result<(), CoreError> {
        match self.delivery_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Ok(()),
            _ => Err(CoreError::Validation(MISSING_DELIVERY_CODE.to_string())),
        }
    }

    /// Read a single editable field.
    pub fn get(&self, field: ShipmentField) -> FieldValue {
        use ShipmentField as F;
        match field {
            F::LocationId => FieldValue::Ref(self.location_id),
            F::GrowerId => FieldValue::Ref(self.grower_id),
            F::DeliveryCode => FieldValue::Text(self.delivery_code.clone()),
            F::DeliveryDate => FieldValue::Day(self.delivery_date),
            F::ProcessingDate => FieldValue::Day(self.processing_date),
            F::ProcessingWeek => FieldValue::Int(self.processing_week),
            F::Quantity => FieldValue::Int(self.quantity),
            F::TotalWeight => FieldValue::Decimal(self.total_weight),
            F::NetQuantity => FieldValue::Int(self.net_quantity),
            F::NetWeight => FieldValue::Decimal(self.net_weight),
            F::TransportMortality => FieldValue::Int(self.transport_mortality),
            F::TransportMortalityKg => FieldValue::Decimal(self.transport_mortality_kg),
            F::LiverWeight => FieldValue::Decimal(self.liver_weight),
            F::KosherPercent => FieldValue::Decimal(self.kosher_percent),
            F::FatteningRate => FieldValue::Decimal(self.fattening_rate),
            F::FatteningDays => FieldValue::Int(self.fattening_days),
            F::MortalityCount => FieldValue::Int(self.mortality_count),
            F::MortalityRate => FieldValue::Decimal(self.mortality_rate),
        }
    }

    /// Write a single editable field. The value must match the field's kind;
    /// on mismatch the record is left unchanged.
    pub fn set(&mut self, field: ShipmentField, value: FieldValue) -> Result<(), CoreError> {
        use ShipmentField as F;
        match (field, value) {
            (F::LocationId, FieldValue::Ref(v)) => self.location_id = v,
            (F::GrowerId, FieldValue::Ref(v)) => self.grower_id = v,
            (F::DeliveryCode, FieldValue::Text(v)) => self.delivery_code = v,
            (F::DeliveryDate, FieldValue::Day(v)) => self.delivery_date = v,
            (F::ProcessingDate, FieldValue::Day(v)) => self.processing_date = v,
            (F::ProcessingWeek, FieldValue::Int(v)) => self.processing_week = v,
            (F::Quantity, FieldValue::Int(v)) => self.quantity = v,
            (F::TotalWeight, FieldValue::Decimal(v)) => self.total_weight = v,
            (F::NetQuantity, FieldValue::Int(v)) => self.net_quantity = v,
            (F::NetWeight, FieldValue::Decimal(v)) => self.net_weight = v,
            (F::TransportMortality, FieldValue::Int(v)) => self.transport_mortality = v,
            (F::TransportMortalityKg, FieldValue::Decimal(v)) => self.transport_mortality_kg = v,
            (F::LiverWeight, FieldValue::Decimal(v)) => self.liver_weight = v,
            (F::KosherPercent, FieldValue::Decimal(v)) => self.kosher_percent = v,
            (F::FatteningRate, FieldValue::Decimal(v)) => self.fattening_rate = v,
            (F::FatteningDays, FieldValue::Int(v)) => self.fattening_days = v,
            (F::MortalityCount, FieldValue::Int(v)) => self.mortality_count = v,
            (F::MortalityRate, FieldValue::Decimal(v)) => self.mortality_rate = v,
            (field, value) => {
                return Err(CoreError::Validation(format!(
                    "Field '{}' expects a {} value, got {}",
                    field.name(),
                    field.kind().label(),
                    value.kind().label()
                )))
            }
        }
        Ok(())
    }

    /// True when any tracked field differs from `original`. Fields the
    /// backend derives ([`ShipmentField::is_derived`]) are ignored.
    pub fn differs_from(&self, original: &ShipmentRecord) -> bool {
        ShipmentField::ALL
            .iter()
            .filter(|f| !f.is_derived())
            .any(|&f| self.get(f) != original.get(f))
    }

    /// Build the body sent to the backend for this row.
    ///
    /// Net quantity is recomputed, fattening and mortality rates are nulled
    /// for the backend to derive, and a missing partner reference is filled
    /// from `fallback_partner`.
    pub fn to_payload(&self, fallback_partner: Option<DbId>) -> ShipmentPayload {
        ShipmentPayload {
            partner_id: self.partner_id.or(fallback_partner),
            location_id: self.location_id,
            grower_id: self.grower_id,
            delivery_code: self.delivery_code.as_deref().map(|c| c.trim().to_string()),
            delivery_date: self.delivery_date,
            processing_date: self.processing_date,
            processing_week: self.processing_week,
            quantity: self.quantity,
            total_weight: self.total_weight,
            net_quantity: Some(self.computed_net_quantity()),
            net_weight: self.net_weight,
            transport_mortality: self.transport_mortality,
            transport_mortality_kg: self.transport_mortality_kg,
            liver_weight: self.liver_weight,
            kosher_percent: self.kosher_percent,
            fattening_rate: None,
            fattening_days: self.fattening_days,
            mortality_count: self.mortality_count,
            mortality_rate: None,
        }
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<i32>) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0 => n / f64::from(d),
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Body of a create or update request. Absent values are sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentPayload {
    pub partner_id: Option<DbId>,
    pub location_id: Option<DbId>,
    pub grower_id: Option<DbId>,
    pub delivery_code: Option<String>,
    #[serde(default, with = "optional_day")]
    pub delivery_date: Option<CalendarDay>,
    #[serde(default, with = "optional_day")]
    pub processing_date: Option<CalendarDay>,
    pub processing_week: Option<i32>,
    pub quantity: Option<i32>,
    pub total_weight: Option<f64>,
    pub net_quantity: Option<i32>,
    pub net_weight: Option<f64>,
    pub transport_mortality: Option<i32>,
    pub transport_mortality_kg: Option<f64>,
    pub liver_weight: Option<f64>,
    pub kosher_percent: Option<f64>,
    pub fattening_rate: Option<f64>,
    pub fattening_days: Option<i32>,
    pub mortality_count: Option<i32>,
    pub mortality_rate: Option<f64>,
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Value kinds a shipment field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Ref,
    Text,
    Day,
    Int,
    Decimal,
}

impl FieldKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ref => "reference",
            Self::Text => "text",
            Self::Day => "date",
            Self::Int => "integer",
            Self::Decimal => "decimal",
        }
    }
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Ref(Option<DbId>),
    Text(Option<String>),
    Day(Option<CalendarDay>),
    Int(Option<i32>),
    Decimal(Option<f64>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Ref(_) => FieldKind::Ref,
            Self::Text(_) => FieldKind::Text,
            Self::Day(_) => FieldKind::Day,
            Self::Int(_) => FieldKind::Int,
            Self::Decimal(_) => FieldKind::Decimal,
        }
    }
}

/// Editable columns of a shipment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShipmentField {
    LocationId,
    GrowerId,
    DeliveryCode,
    DeliveryDate,
    ProcessingDate,
    ProcessingWeek,
    Quantity,
    TotalWeight,
    NetQuantity,
    NetWeight,
    TransportMortality,
    TransportMortalityKg,
    LiverWeight,
    KosherPercent,
    FatteningRate,
    FatteningDays,
    MortalityCount,
    MortalityRate,
}

impl ShipmentField {
    pub const ALL: &'static [ShipmentField] = &[
        Self::LocationId,
        Self::GrowerId,
        Self::DeliveryCode,
        Self::DeliveryDate,
        Self::ProcessingDate,
        Self::ProcessingWeek,
        Self::Quantity,
        Self::TotalWeight,
        Self::NetQuantity,
        Self::NetWeight,
        Self::TransportMortality,
        Self::TransportMortalityKg,
        Self::LiverWeight,
        Self::KosherPercent,
        Self::FatteningRate,
        Self::FatteningDays,
        Self::MortalityCount,
        Self::MortalityRate,
    ];

    /// Fields recomputed at save time or by the backend. Editing them never
    /// marks a row dirty.
    pub const DERIVED: &'static [ShipmentField] =
        &[Self::NetQuantity, Self::FatteningRate, Self::MortalityRate];

    pub fn is_derived(self) -> bool {
        Self::DERIVED.contains(&self)
    }

    /// Wire name of the field (camelCase, as the backend spells it).
    pub fn name(self) -> &'static str {
        match self {
            Self::LocationId => "locationId",
            Self::GrowerId => "growerId",
            Self::DeliveryCode => "deliveryCode",
            Self::DeliveryDate => "deliveryDate",
            Self::ProcessingDate => "processingDate",
            Self::ProcessingWeek => "processingWeek",
            Self::Quantity => "quantity",
            Self::TotalWeight => "totalWeight",
            Self::NetQuantity => "netQuantity",
            Self::NetWeight => "netWeight",
            Self::TransportMortality => "transportMortality",
            Self::TransportMortalityKg => "transportMortalityKg",
            Self::LiverWeight => "liverWeight",
            Self::KosherPercent => "kosherPercent",
            Self::FatteningRate => "fatteningRate",
            Self::FatteningDays => "fatteningDays",
            Self::MortalityCount => "mortalityCount",
            Self::MortalityRate => "mortalityRate",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::LocationId | Self::GrowerId => FieldKind::Ref,
            Self::DeliveryCode => FieldKind::Text,
            Self::DeliveryDate | Self::ProcessingDate => FieldKind::Day,
            Self::ProcessingWeek
            | Self::Quantity
            | Self::NetQuantity
            | Self::TransportMortality
            | Self::FatteningDays
            | Self::MortalityCount => FieldKind::Int,
            Self::TotalWeight
            | Self::NetWeight
            | Self::TransportMortalityKg
            | Self::LiverWeight
            | Self::KosherPercent
            | Self::FatteningRate
            | Self::MortalityRate => FieldKind::Decimal,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
