//! In-memory edit session for a shipment table.
//!
//! A session is built from one load of shipment rows. Every identified row
//! keeps the snapshot it was loaded with next to its current value; a row
//! is dirty exactly when a tracked field differs from that snapshot, so
//! editing a value away and back clears the flag again. Rows without an
//! identifier are drafts: they live in their own ordered list, keyed by a
//! local [`DraftId`], and are never compared against anything.
//!
//! The session is discarded after every successful save, revert or delete;
//! the caller reloads and builds a new one.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::partner::StatsScope;
use crate::shipment::{FieldValue, ShipmentField, ShipmentPayload, ShipmentRecord};
use crate::stats::PartnerStats;
use crate::types::{CalendarDay, DbId};

// ---------------------------------------------------------------------------
// Keys and states
// ---------------------------------------------------------------------------

/// Local identity of an unsaved row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(Uuid);

impl DraftId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Address of a row in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKey {
    Saved(DbId),
    Draft(DraftId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Unmodified,
    Dirty,
    New,
}

/// A row as the table renders it.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub key: RowKey,
    pub record: &'a ShipmentRecord,
    pub state: RowState,
}

#[derive(Debug, Clone)]
struct TrackedRow {
    original: ShipmentRecord,
    current: ShipmentRecord,
}

// ---------------------------------------------------------------------------
// Save plan
// ---------------------------------------------------------------------------

/// One request the save must issue.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOp {
    Create(ShipmentPayload),
    Update { id: DbId, payload: ShipmentPayload },
}

/// Every request of one save, already validated and normalised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavePlan {
    ops: Vec<SaveOp>,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn creates(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, SaveOp::Create(_))).count()
    }

    pub fn updates(&self) -> usize {
        self.len() - self.creates()
    }

    pub fn ops(&self) -> &[SaveOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<SaveOp> {
        self.ops
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EditSession {
    owner: Option<DbId>,
    allows_new_rows: bool,
    /// Identified rows in load order.
    tracked: IndexMap<DbId, TrackedRow>,
    dirty: HashSet<DbId>,
    /// Unsaved rows, newest first.
    drafts: Vec<(DraftId, ShipmentRecord)>,
}

impl EditSession {
    /// Start a session over freshly loaded rows, snapshotting each
    /// identified row. Rows without an id start out as drafts.
    pub fn load(scope: &StatsScope, records: Vec<ShipmentRecord>) -> Self {
        let mut tracked = IndexMap::with_capacity(records.len());
        let mut drafts = Vec::new();
        for record in records {
            match record.id {
                Some(id) => {
                    tracked.insert(
                        id,
                        TrackedRow {
                            original: record.clone(),
                            current: record,
                        },
                    );
                }
                None => drafts.push((DraftId::generate(), record)),
            }
        }
        Self {
            owner: scope.owner(),
            allows_new_rows: scope.allows_new_rows(),
            tracked,
            dirty: HashSet::new(),
            drafts,
        }
    }

    pub fn len(&self) -> usize {
        self.tracked.len() + self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in display order: drafts (newest first), then loaded rows.
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        let drafts = self.drafts.iter().map(|(draft, record)| RowView {
            key: RowKey::Draft(*draft),
            record,
            state: RowState::New,
        });
        let saved = self.tracked.iter().map(|(id, row)| RowView {
            key: RowKey::Saved(*id),
            record: &row.current,
            state: self.saved_state(*id),
        });
        drafts.chain(saved)
    }

    /// Current values of every row, in display order.
    pub fn records(&self) -> impl Iterator<Item = &ShipmentRecord> + '_ {
        self.rows().map(|row| row.record)
    }

    pub fn get(&self, key: RowKey) -> Option<&ShipmentRecord> {
        match key {
            RowKey::Saved(id) => self.tracked.get(&id).map(|row| &row.current),
            RowKey::Draft(draft) => self.draft(draft),
        }
    }

    pub fn state(&self, key: RowKey) -> Option<RowState> {
        match key {
            RowKey::Saved(id) => self.tracked.contains_key(&id).then(|| self.saved_state(id)),
            RowKey::Draft(draft) => self.draft(draft).map(|_| RowState::New),
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty.is_empty() || !self.drafts.is_empty()
    }

    /// Ids of dirty rows, in load order.
    pub fn dirty_ids(&self) -> Vec<DbId> {
        self.tracked
            .keys()
            .copied()
            .filter(|id| self.dirty.contains(id))
            .collect()
    }

    pub fn draft_count(&self) -> usize {
        self.drafts.len()
    }

    /// Apply one cell edit and reclassify the row.
    ///
    /// A loaded row becomes dirty when any tracked field differs from its
    /// snapshot and clean again when all of them match. Drafts stay new.
    pub fn edit(
        &mut self,
        key: RowKey,
        field: ShipmentField,
        value: FieldValue,
    ) -> Result<RowState, CoreError> {
        match key {
            RowKey::Saved(id) => {
                let row = self.tracked.get_mut(&id).ok_or(CoreError::NotFound {
                    entity: "shipment",
                    id,
                })?;
                row.current.set(field, value)?;
                if row.current.differs_from(&row.original) {
                    self.dirty.insert(id);
                } else {
                    self.dirty.remove(&id);
                }
                Ok(self.saved_state(id))
            }
            RowKey::Draft(draft) => {
                let record = self.draft_mut(draft)?;
                record.set(field, value)?;
                Ok(RowState::New)
            }
        }
    }

    /// Insert a blank row at the top of the table.
    ///
    /// Refused for multi-partner selections, which have no owner for the
    /// new row.
    pub fn add_row(&mut self, today: CalendarDay) -> Result<DraftId, CoreError> {
        if !self.allows_new_rows {
            return Err(CoreError::Validation(
                "New rows cannot be added while several partners are shown together".to_string(),
            ));
        }
        let draft = DraftId::generate();
        self.drafts.insert(0, (draft, ShipmentRecord::blank(self.owner, today)));
        Ok(draft)
    }

    /// Undo the edits of a single row: a draft is dropped, a loaded row is
    /// restored to its snapshot.
    pub fn cancel_row(&mut self, key: RowKey) -> Result<(), CoreError> {
        match key {
            RowKey::Saved(id) => {
                let row = self.tracked.get_mut(&id).ok_or(CoreError::NotFound {
                    entity: "shipment",
                    id,
                })?;
                row.current = row.original.clone();
                self.dirty.remove(&id);
            }
            RowKey::Draft(draft) => {
                let before = self.drafts.len();
                self.drafts.retain(|(d, _)| *d != draft);
                if self.drafts.len() == before {
                    return Err(missing_draft());
                }
            }
        }
        Ok(())
    }

    /// Statistics over the persisted rows as loaded. Pending edits and
    /// drafts only count once they have been saved and reloaded.
    pub fn selection_stats(&self) -> PartnerStats {
        PartnerStats::from_shipments(self.tracked.values().map(|row| &row.original))
    }

    /// Collect drafts and dirty rows into the requests of one save.
    ///
    /// Either every pending row passes the required-field check and a full
    /// plan is returned, or nothing is planned at all.
    pub fn prepare_save(&self) -> Result<SavePlan, CoreError> {
        let drafts = self.drafts.iter().map(|(_, record)| record);
        let dirty = self
            .tracked
            .iter()
            .filter(|(id, _)| self.dirty.contains(*id))
            .map(|(_, row)| &row.current);
        let pending: Vec<&ShipmentRecord> = drafts.chain(dirty).collect();

        for record in &pending {
            record.validate_for_save()?;
        }

        let ops = pending
            .into_iter()
            .map(|record| {
                let payload = record.to_payload(self.owner);
                match record.id {
                    Some(id) => SaveOp::Update { id, payload },
                    None => SaveOp::Create(payload),
                }
            })
            .collect();

        Ok(SavePlan { ops })
    }

    fn saved_state(&self, id: DbId) -> RowState {
        if self.dirty.contains(&id) {
            RowState::Dirty
        } else {
            RowState::Unmodified
        }
    }

    fn draft(&self, draft: DraftId) -> Option<&ShipmentRecord> {
        self.drafts
            .iter()
            .find(|(d, _)| *d == draft)
            .map(|(_, record)| record)
    }

    fn draft_mut(&mut self, draft: DraftId) -> Result<&mut ShipmentRecord, CoreError> {
        self.drafts
            .iter_mut()
            .find(|(d, _)| *d == draft)
            .map(|(_, record)| record)
            .ok_or_else(missing_draft)
    }
}

fn missing_draft() -> CoreError {
    CoreError::Validation("The unsaved row no longer exists".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn today() -> CalendarDay {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    fn partner_scope() -> StatsScope {
        StatsScope::Partner {
            id: 7,
            name: "Alfa".into(),
        }
    }

    fn row(id: DbId, quantity: i32, mortality: i32) -> ShipmentRecord {
        ShipmentRecord {
            id: Some(id),
            partner_id: Some(7),
            delivery_code: Some(format!("K-{id}")),
            delivery_date: Some(today()),
            quantity: Some(quantity),
            mortality_count: Some(mortality),
            liver_weight: Some(0.6),
            kosher_percent: Some(60.0),
            ..Default::default()
        }
    }

    fn session() -> EditSession {
        EditSession::load(&partner_scope(), vec![row(1, 100, 5), row(2, 80, 0), row(3, 60, 1)])
    }

    #[test]
    fn fresh_session_is_clean() {
        let s = session();
        assert_eq!(s.len(), 3);
        assert!(!s.has_unsaved_changes());
        assert!(s.rows().all(|r| r.state == RowState::Unmodified));
        assert!(s.prepare_save().unwrap().is_empty());
    }

    #[test]
    fn editing_away_and_back_clears_dirty_flag() {
        let mut s = session();
        let key = RowKey::Saved(2);

        let state = s.edit(key, ShipmentField::Quantity, FieldValue::Int(Some(81))).unwrap();
        assert_eq!(state, RowState::Dirty);
        assert_eq!(s.dirty_ids(), vec![2]);

        let state = s.edit(key, ShipmentField::Quantity, FieldValue::Int(Some(80))).unwrap();
        assert_eq!(state, RowState::Unmodified);
        assert!(s.dirty_ids().is_empty());
        assert!(!s.has_unsaved_changes());
    }

    #[test]
    fn multi_field_edit_needs_every_field_restored() {
        let mut s = session();
        let key = RowKey::Saved(1);
        s.edit(key, ShipmentField::Quantity, FieldValue::Int(Some(1))).unwrap();
        s.edit(key, ShipmentField::DeliveryCode, FieldValue::Text(Some("X".into())))
            .unwrap();
        let state = s.edit(key, ShipmentField::Quantity, FieldValue::Int(Some(100))).unwrap();
        assert_eq!(state, RowState::Dirty);
        let state = s
            .edit(key, ShipmentField::DeliveryCode, FieldValue::Text(Some("K-1".into())))
            .unwrap();
        assert_eq!(state, RowState::Unmodified);
    }

    #[test]
    fn derived_field_edits_do_not_dirty() {
        let mut s = session();
        for (field, value) in [
            (ShipmentField::NetQuantity, FieldValue::Int(Some(1))),
            (ShipmentField::FatteningRate, FieldValue::Decimal(Some(3.0))),
            (ShipmentField::MortalityRate, FieldValue::Decimal(Some(9.0))),
        ] {
            let state = s.edit(RowKey::Saved(1), field, value).unwrap();
            assert_eq!(state, RowState::Unmodified);
        }
        assert!(!s.has_unsaved_changes());
    }

    #[test]
    fn rejected_edit_leaves_row_untouched() {
        let mut s = session();
        let before = s.get(RowKey::Saved(1)).cloned();
        let result = s.edit(RowKey::Saved(1), ShipmentField::LiverWeight, FieldValue::Int(Some(1)));
        assert_matches!(result, Err(CoreError::Validation(_)));
        assert_eq!(s.get(RowKey::Saved(1)).cloned(), before);
        assert_eq!(s.state(RowKey::Saved(1)), Some(RowState::Unmodified));
    }

    #[test]
    fn unknown_row_is_not_found() {
        let mut s = session();
        let result = s.edit(RowKey::Saved(99), ShipmentField::Quantity, FieldValue::Int(Some(1)));
        assert_matches!(result, Err(CoreError::NotFound { id: 99, .. }));
        assert_eq!(s.state(RowKey::Saved(99)), None);
    }

    #[test]
    fn rows_without_id_are_always_new() {
        let mut unsaved = row(0, 10, 0);
        unsaved.id = None;
        let s = EditSession::load(&partner_scope(), vec![row(1, 100, 5), unsaved]);

        let states: Vec<_> = s.rows().map(|r| r.state).collect();
        assert_eq!(states, vec![RowState::New, RowState::Unmodified]);
        assert!(s.has_unsaved_changes());
        assert_eq!(s.prepare_save().unwrap().creates(), 1);
    }

    #[test]
    fn draft_edits_stay_new_even_when_matching_a_loaded_row() {
        let mut s = session();
        let draft = s.add_row(today()).unwrap();
        let key = RowKey::Draft(draft);
        s.edit(key, ShipmentField::DeliveryCode, FieldValue::Text(Some("K-1".into())))
            .unwrap();
        s.edit(key, ShipmentField::Quantity, FieldValue::Int(Some(100))).unwrap();
        assert_eq!(s.state(key), Some(RowState::New));
        assert_eq!(s.state(RowKey::Saved(1)), Some(RowState::Unmodified));
    }

    #[test]
    fn new_rows_go_on_top() {
        let mut s = session();
        let first = s.add_row(today()).unwrap();
        let second = s.add_row(today()).unwrap();
        let keys: Vec<_> = s.rows().map(|r| r.key).take(3).collect();
        assert_eq!(
            keys,
            vec![RowKey::Draft(second), RowKey::Draft(first), RowKey::Saved(1)]
        );
        assert_eq!(s.get(RowKey::Draft(first)).unwrap().partner_id, Some(7));
    }

    #[test]
    fn selection_refuses_new_rows() {
        let scope = StatsScope::Selection {
            partner_ids: vec![1, 2],
        };
        let mut s = EditSession::load(&scope, vec![row(1, 10, 0)]);
        assert_matches!(s.add_row(today()), Err(CoreError::Validation(_)));
        assert_eq!(s.draft_count(), 0);
    }

    #[test]
    fn cancel_restores_snapshot_and_drops_drafts() {
        let mut s = session();
        s.edit(RowKey::Saved(3), ShipmentField::Quantity, FieldValue::Int(Some(1)))
            .unwrap();
        let draft = s.add_row(today()).unwrap();

        s.cancel_row(RowKey::Saved(3)).unwrap();
        assert_eq!(s.get(RowKey::Saved(3)).unwrap().quantity, Some(60));
        assert_eq!(s.state(RowKey::Saved(3)), Some(RowState::Unmodified));

        s.cancel_row(RowKey::Draft(draft)).unwrap();
        assert_eq!(s.state(RowKey::Draft(draft)), None);
        assert!(!s.has_unsaved_changes());

        assert_matches!(s.cancel_row(RowKey::Draft(draft)), Err(CoreError::Validation(_)));
    }

    #[test]
    fn save_plan_has_one_create_and_one_update() {
        let mut new_row = ShipmentRecord {
            delivery_code: Some("NEW".into()),
            quantity: Some(50),
            mortality_count: Some(0),
            ..Default::default()
        };
        new_row.net_quantity = Some(7);
        let mut s = EditSession::load(&partner_scope(), vec![row(1, 100, 5), new_row]);
        s.edit(RowKey::Saved(1), ShipmentField::LiverWeight, FieldValue::Decimal(Some(0.65)))
            .unwrap();

        let plan = s.prepare_save().unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.creates(), 1);
        assert_eq!(plan.updates(), 1);

        for op in plan.ops() {
            match op {
                SaveOp::Create(payload) => {
                    assert_eq!(payload.net_quantity, Some(50));
                    assert_eq!(payload.partner_id, Some(7));
                }
                SaveOp::Update { id, payload } => {
                    assert_eq!(*id, 1);
                    assert_eq!(payload.net_quantity, Some(95));
                    assert_eq!(payload.liver_weight, Some(0.65));
                    assert_eq!(payload.fattening_rate, None);
                    assert_eq!(payload.mortality_rate, None);
                }
            }
        }
    }

    #[test]
    fn unchanged_rows_are_not_saved() {
        let mut s = session();
        s.edit(RowKey::Saved(2), ShipmentField::KosherPercent, FieldValue::Decimal(Some(70.0)))
            .unwrap();
        let plan = s.prepare_save().unwrap();
        assert_eq!(plan.len(), 1);
        assert_matches!(&plan.ops()[0], SaveOp::Update { id: 2, .. });
    }

    #[test]
    fn one_blank_code_rejects_the_whole_batch() {
        let mut s = session();
        s.edit(RowKey::Saved(1), ShipmentField::Quantity, FieldValue::Int(Some(90)))
            .unwrap();
        s.add_row(today()).unwrap();

        let result = s.prepare_save();
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("delivery code"));
        // Pending state survives the rejection.
        assert!(s.has_unsaved_changes());
        assert_eq!(s.dirty_ids(), vec![1]);
    }

    #[test]
    fn selection_stats_ignore_pending_edits() {
        let mut s = session();
        assert!((s.selection_stats().avg_liver_weight - 0.6).abs() < 1e-9);
        for id in [1, 2, 3] {
            s.edit(RowKey::Saved(id), ShipmentField::LiverWeight, FieldValue::Decimal(Some(0.9)))
                .unwrap();
        }
        let draft = RowKey::Draft(s.add_row(today()).unwrap());
        s.edit(draft, ShipmentField::LiverWeight, FieldValue::Decimal(Some(2.0)))
            .unwrap();
        assert!((s.selection_stats().avg_liver_weight - 0.6).abs() < 1e-9);
    }
}
