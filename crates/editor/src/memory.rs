//! In-process backend used by tests and the report binary.
//!
//! Holds partners, groups, growers and shipments behind a `tokio::sync::Mutex`,
//! applies the same write rules and derivations as the real backend, and
//! records every call so tests can assert on exactly what was sent.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use poultry_core::leaderboard::{self, LeaderboardEntry};
use poultry_core::partner::{
    CreateGroup, CreateGrower, CreatePartner, GroupSummary, Grower, Partner, PartnerGroup,
};
use poultry_core::shipment::{PartnerSummary, ShipmentPayload, ShipmentRecord};
use poultry_core::stats::{round2, PartnerStats};
use poultry_core::types::DbId;

use crate::error::ConfigError;
use crate::gateway::{Gateway, GatewayError};

/// Seed data for an [`InMemoryGateway`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixture {
    pub partners: Vec<Partner>,
    pub groups: Vec<PartnerGroup>,
    pub growers: Vec<Grower>,
    pub shipments: Vec<ShipmentRecord>,
}

impl Fixture {
    /// Read a JSON fixture from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::FixtureRead {
                path: path.display().to_string(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::FixtureParse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// A request received by the in-memory backend.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    PartnerHistory(DbId),
    BatchHistory(Vec<DbId>),
    PartnerStats(DbId),
    Leaderboard,
    Create(ShipmentPayload),
    Update(DbId, ShipmentPayload),
    Delete(DbId),
    ListPartners,
    CreatePartner(CreatePartner),
    UpdatePartner(DbId, CreatePartner),
    DeletePartner(DbId),
    ListGrowers,
    CreateGrower(CreateGrower),
    UpdateGrower(DbId, CreateGrower),
    DeleteGrower(DbId),
    CreateGroup(CreateGroup),
    DeleteGroup(DbId),
}

impl GatewayCall {
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Self::PartnerHistory(_)
                | Self::BatchHistory(_)
                | Self::PartnerStats(_)
                | Self::Leaderboard
                | Self::ListPartners
                | Self::ListGrowers
        )
    }
}

#[derive(Debug, Default)]
struct State {
    partners: Vec<Partner>,
    groups: Vec<PartnerGroup>,
    growers: Vec<Grower>,
    shipments: Vec<ShipmentRecord>,
    next_id: DbId,
    calls: Vec<GatewayCall>,
    /// Writes carrying one of these delivery codes fail with the error.
    rejected_codes: HashMap<String, GatewayError>,
    /// Every read fails with this error while set.
    read_failure: Option<GatewayError>,
    /// Becomes `read_failure` once the next write succeeds.
    read_failure_after_write: Option<GatewayError>,
}

impl State {
    fn owner_of(&self, record: &ShipmentRecord) -> Option<DbId> {
        record
            .partner_id
            .or_else(|| record.partner.as_ref().map(|p| p.id))
    }

    fn history(&self, partner_ids: &[DbId]) -> Vec<ShipmentRecord> {
        let mut rows: Vec<ShipmentRecord> = self
            .shipments
            .iter()
            .filter(|s| self.owner_of(s).is_some_and(|id| partner_ids.contains(&id)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.processing_date.cmp(&a.processing_date));
        rows
    }

    fn check_read(&self) -> Result<(), GatewayError> {
        match &self.read_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn write_succeeded(&mut self) {
        if let Some(err) = self.read_failure_after_write.take() {
            self.read_failure = Some(err);
        }
    }

    fn partner_mut(&mut self, id: DbId) -> Result<&mut Partner, GatewayError> {
        self.partners
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| GatewayError::not_found("Partner", id))
    }

    fn grower_mut(&mut self, id: DbId) -> Result<&mut Grower, GatewayError> {
        self.growers
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| GatewayError::not_found("Grower", id))
    }

    /// The group a partner belongs to, by either side of the link.
    fn group_name_of(&self, partner: &Partner) -> Option<String> {
        partner.group.as_ref().map(|g| g.name.clone()).or_else(|| {
            self.groups
                .iter()
                .find(|g| g.partner_ids.contains(&partner.id))
                .map(|g| g.name.clone())
        })
    }

    fn check_grower_name(&self, name: &str, except: Option<DbId>) -> Result<(), GatewayError> {
        let taken = self
            .growers
            .iter()
            .any(|g| Some(g.id) != except && g.name == name);
        if taken {
            return Err(GatewayError::new(
                409,
                format!("A grower named \"{name}\" already exists"),
            ));
        }
        Ok(())
    }

    fn check_write(&self, payload: &ShipmentPayload) -> Result<(), GatewayError> {
        if let Some(err) = payload
            .delivery_code
            .as_deref()
            .and_then(|code| self.rejected_codes.get(code))
        {
            return Err(err.clone());
        }
        validate_payload(payload)
    }

    /// Build the stored row from a payload, deriving what the backend
    /// derives.
    fn materialize(&self, id: DbId, payload: &ShipmentPayload) -> ShipmentRecord {
        let partner = payload.partner_id.and_then(|pid| {
            self.partners.iter().find(|p| p.id == pid).map(|p| PartnerSummary {
                id: p.id,
                name: p.name.clone(),
            })
        });

        let processing_week = match payload.processing_date {
            Some(day) => Some(day.iso_week().week() as i32),
            None => Some(payload.processing_week.unwrap_or(0)),
        };

        let net_quantity = match payload.quantity {
            Some(quantity) => quantity.saturating_sub(payload.mortality_count.unwrap_or(0)),
            None => payload.net_quantity.unwrap_or(0),
        };

        let fattening_rate = payload.fattening_rate.or_else(|| {
            Some(fattening_rate(
                payload.total_weight,
                payload.quantity,
                payload.net_weight,
                net_quantity,
            ))
        });

        let mortality_rate = match (payload.quantity, payload.mortality_count) {
            (Some(quantity), Some(mortality)) if quantity > 0 => {
                Some(round2(f64::from(mortality) / f64::from(quantity) * 100.0))
            }
            _ => payload.mortality_rate,
        };

        ShipmentRecord {
            id: Some(id),
            partner_id: payload.partner_id,
            partner,
            location_id: payload.location_id,
            grower_id: payload.grower_id,
            delivery_code: payload.delivery_code.clone(),
            delivery_date: payload.delivery_date,
            processing_date: payload.processing_date,
            processing_week,
            quantity: payload.quantity,
            total_weight: payload.total_weight,
            net_quantity: Some(net_quantity),
            net_weight: payload.net_weight,
            transport_mortality: payload.transport_mortality,
            transport_mortality_kg: payload.transport_mortality_kg,
            liver_weight: payload.liver_weight,
            kosher_percent: payload.kosher_percent,
            fattening_rate,
            fattening_days: payload.fattening_days,
            mortality_count: payload.mortality_count,
            mortality_rate,
        }
    }
}

fn required_name(name: &str) -> Result<String, GatewayError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatewayError::new(400, "The name must not be empty"));
    }
    Ok(name.to_string())
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Per-bird weight gain between intake and delivery; zero when any operand
/// is missing or a count is zero.
fn fattening_rate(
    total_weight: Option<f64>,
    quantity: Option<i32>,
    net_weight: Option<f64>,
    net_quantity: i32,
) -> f64 {
    match (total_weight, quantity, net_weight) {
        (Some(total), Some(quantity), Some(net)) if quantity != 0 && net_quantity != 0 => {
            net / f64::from(net_quantity) - total / f64::from(quantity)
        }
        _ => 0.0,
    }
}

/// Write-side rules of the backend: a `sequence/YY` delivery code whose
/// year matches the delivery date, no negative amounts and a kosher
/// percentage within 0..=100.
fn validate_payload(payload: &ShipmentPayload) -> Result<(), GatewayError> {
    if let Some(code) = payload.delivery_code.as_deref().map(str::trim) {
        if !code.is_empty() {
            let parts: Vec<&str> = code.split('/').collect();
            if parts.len() != 2 {
                return Err(GatewayError::new(
                    400,
                    "Invalid delivery code format, expected sequence/year (e.g. 001/25)",
                ));
            }
            if let Some(day) = payload.delivery_date {
                let suffix = format!("{:02}", day.year().rem_euclid(100));
                if parts[1] != suffix {
                    return Err(GatewayError::new(
                        400,
                        format!(
                            "The code year ({}) must match the delivery date ({suffix})",
                            parts[1]
                        ),
                    ));
                }
            }
        }
    }

    let counts = [
        ("Quantity", payload.quantity),
        ("Processing week", payload.processing_week),
        ("Transport mortality", payload.transport_mortality),
        ("Fattening days", payload.fattening_days),
        ("Net quantity", payload.net_quantity),
    ];
    let weights = [
        ("Total weight", payload.total_weight),
        ("Net weight", payload.net_weight),
        ("Transport mortality weight", payload.transport_mortality_kg),
        ("Liver weight", payload.liver_weight),
    ];
    let negative = counts
        .iter()
        .find(|(_, v)| v.is_some_and(|v| v < 0))
        .map(|(name, _)| *name)
        .or_else(|| {
            weights
                .iter()
                .find(|(_, v)| v.is_some_and(|v| v < 0.0))
                .map(|(name, _)| *name)
        });
    if let Some(name) = negative {
        return Err(GatewayError::new(400, format!("{name} cannot be negative")));
    }

    if payload
        .kosher_percent
        .is_some_and(|k| !(0.0..=100.0).contains(&k))
    {
        return Err(GatewayError::new(
            400,
            "The kosher percentage must be between 0 and 100",
        ));
    }
    Ok(())
}

/// Backend stand-in holding all data in memory.
#[derive(Debug)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    pub fn new(fixture: Fixture) -> Self {
        let next_id = fixture
            .shipments
            .iter()
            .filter_map(|s| s.id)
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            state: Mutex::new(State {
                partners: fixture.partners,
                groups: fixture.groups,
                growers: fixture.growers,
                shipments: fixture.shipments,
                next_id,
                ..State::default()
            }),
        }
    }

    /// Make every create or update carrying `delivery_code` fail.
    pub async fn reject_code(&self, delivery_code: impl Into<String>, error: GatewayError) {
        self.state
            .lock()
            .await
            .rejected_codes
            .insert(delivery_code.into(), error);
    }

    /// Make every read fail with `error`, or succeed again with `None`.
    pub async fn fail_reads(&self, error: Option<GatewayError>) {
        self.state.lock().await.read_failure = error;
    }

    /// Let reads succeed until the next successful write, then fail them
    /// all with `error`.
    pub async fn fail_reads_after_write(&self, error: GatewayError) {
        self.state.lock().await.read_failure_after_write = Some(error);
    }

    /// Every call received so far, in arrival order.
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of create, update and delete calls received so far.
    pub async fn write_count(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.is_write())
            .count()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn partner_ids(&self) -> Vec<DbId> {
        self.state.lock().await.partners.iter().map(|p| p.id).collect()
    }

    pub async fn shipment(&self, id: DbId) -> Option<ShipmentRecord> {
        self.state
            .lock()
            .await
            .shipments
            .iter()
            .find(|s| s.id == Some(id))
            .cloned()
    }

    pub async fn shipment_count(&self) -> usize {
        self.state.lock().await.shipments.len()
    }

    pub async fn partner(&self, id: DbId) -> Option<Partner> {
        self.state
            .lock()
            .await
            .partners
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub async fn groups(&self) -> Vec<PartnerGroup> {
        self.state.lock().await.groups.clone()
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn partner_history(&self, partner_id: DbId) -> Result<Vec<ShipmentRecord>, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::PartnerHistory(partner_id));
        state.check_read()?;
        Ok(state.history(&[partner_id]))
    }

    async fn batch_history(
        &self,
        partner_ids: &[DbId],
    ) -> Result<Vec<ShipmentRecord>, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::BatchHistory(partner_ids.to_vec()));
        state.check_read()?;
        Ok(state.history(partner_ids))
    }

    async fn partner_stats(&self, partner_id: DbId) -> Result<PartnerStats, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::PartnerStats(partner_id));
        state.check_read()?;
        let history = state.history(&[partner_id]);
        Ok(PartnerStats::from_shipments(&history).rounded())
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::Leaderboard);
        state.check_read()?;
        Ok(leaderboard::build_entries(
            &state.partners,
            &state.groups,
            &state.shipments,
        ))
    }

    async fn create_shipment(
        &self,
        payload: &ShipmentPayload,
    ) -> Result<ShipmentRecord, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::Create(payload.clone()));
        state.check_write(payload)?;

        let id = state.next_id;
        state.next_id += 1;
        let record = state.materialize(id, payload);
        state.shipments.push(record.clone());
        state.write_succeeded();
        Ok(record)
    }

    async fn update_shipment(
        &self,
        id: DbId,
        payload: &ShipmentPayload,
    ) -> Result<ShipmentRecord, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::Update(id, payload.clone()));
        state.check_write(payload)?;

        let index = state
            .shipments
            .iter()
            .position(|s| s.id == Some(id))
            .ok_or_else(|| GatewayError::not_found("Shipment", id))?;
        let record = state.materialize(id, payload);
        state.shipments[index] = record.clone();
        state.write_succeeded();
        Ok(record)
    }

    async fn delete_shipment(&self, id: DbId) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::Delete(id));
        let before = state.shipments.len();
        state.shipments.retain(|s| s.id != Some(id));
        if state.shipments.len() == before {
            return Err(GatewayError::not_found("Shipment", id));
        }
        state.write_succeeded();
        Ok(())
    }

    async fn list_partners(&self) -> Result<Vec<Partner>, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::ListPartners);
        state.check_read()?;
        let partners = state
            .partners
            .iter()
            .map(|p| {
                let total = state
                    .shipments
                    .iter()
                    .filter(|s| state.owner_of(s) == Some(p.id))
                    .filter_map(|s| s.quantity)
                    .map(i64::from)
                    .sum();
                Partner {
                    total_quantity: Some(total),
                    ..p.clone()
                }
            })
            .collect();
        Ok(partners)
    }

    async fn create_partner(&self, draft: &CreatePartner) -> Result<Partner, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::CreatePartner(draft.clone()));

        if let Some(id) = draft.id {
            if state.partners.iter().any(|p| p.id == id) {
                return Err(GatewayError::new(
                    409,
                    format!("Partner ID ({id}) is already taken"),
                ));
            }
        }
        let name = required_name(&draft.name)?;
        let id = draft.id.unwrap_or_else(|| {
            state.partners.iter().map(|p| p.id).max().unwrap_or(0) + 1
        });

        let partner = Partner {
            id,
            name,
            city: trimmed(&draft.city),
            county: trimmed(&draft.county),
            total_quantity: None,
            group: None,
        };
        state.partners.push(partner.clone());
        state.write_succeeded();
        Ok(partner)
    }

    async fn update_partner(
        &self,
        id: DbId,
        draft: &CreatePartner,
    ) -> Result<Partner, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::UpdatePartner(id, draft.clone()));

        let name = required_name(&draft.name)?;
        let partner = state.partner_mut(id)?;
        partner.name = name;
        partner.city = trimmed(&draft.city);
        partner.county = trimmed(&draft.county);
        let updated = partner.clone();
        state.write_succeeded();
        Ok(updated)
    }

    async fn delete_partner(&self, id: DbId) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::DeletePartner(id));
        state.partner_mut(id)?;

        state.partners.retain(|p| p.id != id);
        for group in &mut state.groups {
            group.partner_ids.retain(|pid| *pid != id);
        }
        state.write_succeeded();
        Ok(())
    }

    async fn list_growers(&self) -> Result<Vec<Grower>, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::ListGrowers);
        state.check_read()?;
        Ok(state.growers.clone())
    }

    async fn create_grower(&self, draft: &CreateGrower) -> Result<Grower, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::CreateGrower(draft.clone()));

        let name = required_name(&draft.name)?;
        state.check_grower_name(&name, None)?;
        let grower = Grower {
            id: state.growers.iter().map(|g| g.id).max().unwrap_or(0) + 1,
            name,
            city: trimmed(&draft.city),
            partners: Vec::new(),
        };
        state.growers.push(grower.clone());
        state.write_succeeded();
        Ok(grower)
    }

    async fn update_grower(&self, id: DbId, draft: &CreateGrower) -> Result<Grower, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::UpdateGrower(id, draft.clone()));

        state.grower_mut(id)?;
        let name = required_name(&draft.name)?;
        state.check_grower_name(&name, Some(id))?;
        let grower = state.grower_mut(id)?;
        grower.name = name;
        grower.city = trimmed(&draft.city);
        let updated = grower.clone();
        state.write_succeeded();
        Ok(updated)
    }

    async fn delete_grower(&self, id: DbId) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::DeleteGrower(id));
        state.grower_mut(id)?;

        if state.shipments.iter().any(|s| s.grower_id == Some(id)) {
            return Err(GatewayError::new(
                400,
                "This grower cannot be deleted because it already has recorded shipments. \
                 Delete the shipments first.",
            ));
        }
        state.growers.retain(|g| g.id != id);
        state.write_succeeded();
        Ok(())
    }

    async fn create_group(&self, draft: &CreateGroup) -> Result<PartnerGroup, GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::CreateGroup(draft.clone()));

        let name = required_name(&draft.name)?;
        let members: Vec<DbId> = state
            .partners
            .iter()
            .filter(|p| draft.partner_ids.contains(&p.id))
            .map(|p| p.id)
            .collect();
        for partner in state.partners.iter().filter(|p| members.contains(&p.id)) {
            if let Some(group) = state.group_name_of(partner) {
                return Err(GatewayError::new(
                    400,
                    format!(
                        "The partner ({}) is already a member of another group ({group})",
                        partner.name
                    ),
                ));
            }
        }

        let group = PartnerGroup {
            id: state.groups.iter().map(|g| g.id).max().unwrap_or(0) + 1,
            name,
            color: draft.color.clone(),
            partner_ids: members,
        };
        let summary = GroupSummary {
            id: group.id,
            name: group.name.clone(),
            color: Some(group.color.clone()),
        };
        for partner in &mut state.partners {
            if group.partner_ids.contains(&partner.id) {
                partner.group = Some(summary.clone());
            }
        }
        state.groups.push(group.clone());
        state.write_succeeded();
        Ok(group)
    }

    async fn delete_group(&self, id: DbId) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::DeleteGroup(id));

        let index = state
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| GatewayError::not_found("Group", id))?;
        let group = state.groups.remove(index);
        for partner in &mut state.partners {
            let member = group.partner_ids.contains(&partner.id)
                || partner.group.as_ref().is_some_and(|g| g.id == id);
            if member {
                partner.group = None;
            }
        }
        state.write_succeeded();
        Ok(())
    }
}
