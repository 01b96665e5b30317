//! Shipment table editor: one loaded scope, its edit session and the
//! commands that talk to the backend.
//!
//! Every command that changes persisted data (save, revert, delete) ends by
//! reloading the scope from the backend and starting a fresh session. A
//! command whose request fails leaves the session exactly as it was; once a
//! write has gone through, local edits are dropped even if the reload then
//! fails.

use std::sync::Arc;

use futures::future::try_join_all;
use uuid::Uuid;

use poultry_core::edit_session::{DraftId, EditSession, RowKey, RowState, SaveOp};
use poultry_core::error::CoreError;
use poultry_core::partner::StatsScope;
use poultry_core::shipment::{FieldValue, ShipmentField, ShipmentRecord};
use poultry_core::stats::PartnerStats;
use poultry_core::trend::{self, TrendChart};
use poultry_core::types::{CalendarDay, DbId};

use crate::error::{EditorError, EditorResult};
use crate::gateway::{Gateway, GatewayError};

/// Outcome of a successful batch save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub created: usize,
    pub updated: usize,
}

impl SaveSummary {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0
    }
}

/// Proof that the user was asked before deleting a row.
///
/// Issued by [`ShipmentEditor::request_delete`] and consumed by
/// [`ShipmentEditor::confirm_delete`]. Only the most recently issued
/// confirmation is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteConfirmation {
    shipment_id: DbId,
    token: Uuid,
}

impl DeleteConfirmation {
    pub fn shipment_id(&self) -> DbId {
        self.shipment_id
    }
}

pub struct ShipmentEditor {
    gateway: Arc<dyn Gateway>,
    scope: StatsScope,
    session: EditSession,
    stats: PartnerStats,
    pending_delete: Option<DeleteConfirmation>,
}

impl ShipmentEditor {
    /// Load `scope` and start an edit session over it.
    pub async fn open(gateway: Arc<dyn Gateway>, scope: StatsScope) -> EditorResult<Self> {
        let (records, fetched) = fetch(gateway.as_ref(), &scope).await?;
        tracing::info!(scope = %scope.label(), rows = records.len(), "Shipment table opened");
        let session = EditSession::load(&scope, records);
        let stats = fetched.unwrap_or_else(|| session.selection_stats());
        Ok(Self {
            gateway,
            scope,
            session,
            stats,
            pending_delete: None,
        })
    }

    pub fn scope(&self) -> &StatsScope {
        &self.scope
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Quality statistics of the scope as of the last load: fetched for a
    /// single partner, computed from the loaded rows for a selection.
    /// Pending edits do not move them until saved.
    pub fn stats(&self) -> PartnerStats {
        self.stats
    }

    pub fn rows(&self) -> impl Iterator<Item = &ShipmentRecord> + '_ {
        self.session.records()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.session.has_unsaved_changes()
    }

    /// Weekly trend of the rows on screen, optionally for one year.
    pub fn trend(&self, year: Option<i32>) -> Option<TrendChart> {
        trend::aggregate_year(self.session.records(), year)
    }

    pub fn available_years(&self) -> Vec<i32> {
        trend::available_years(self.session.records())
    }

    pub fn edit(
        &mut self,
        key: RowKey,
        field: ShipmentField,
        value: FieldValue,
    ) -> EditorResult<RowState> {
        Ok(self.session.edit(key, field, value)?)
    }

    pub fn add_row(&mut self, today: CalendarDay) -> EditorResult<DraftId> {
        Ok(self.session.add_row(today)?)
    }

    pub fn cancel_row(&mut self, key: RowKey) -> EditorResult<()> {
        Ok(self.session.cancel_row(key)?)
    }

    /// Re-fetch the scope and start a new session, dropping all local
    /// edits.
    pub async fn reload(&mut self) -> EditorResult<()> {
        Ok(self.refresh().await?)
    }

    #[tracing::instrument(name = "load", skip_all, fields(scope = %self.scope.label()))]
    async fn refresh(&mut self) -> Result<(), GatewayError> {
        let (records, fetched) = fetch(self.gateway.as_ref(), &self.scope).await?;
        tracing::debug!(rows = records.len(), "Shipments loaded");
        self.session = EditSession::load(&self.scope, records);
        self.stats = fetched.unwrap_or_else(|| self.session.selection_stats());
        self.pending_delete = None;
        Ok(())
    }

    /// Reload after a write the backend accepted.
    ///
    /// Local state is dropped before fetching, so a failed fetch leaves an
    /// empty table rather than edits that were already persisted.
    async fn reload_after_write(&mut self) -> EditorResult<()> {
        self.session = EditSession::load(&self.scope, Vec::new());
        self.stats = PartnerStats::default();
        self.pending_delete = None;
        self.refresh().await.map_err(|err| {
            tracing::warn!(error = %err, "Write succeeded but reload failed");
            EditorError::Reload(err)
        })
    }

    /// Discard every pending edit and reload.
    pub async fn revert_all(&mut self) -> EditorResult<()> {
        tracing::info!(scope = %self.scope.label(), "Reverting pending edits");
        self.reload().await
    }

    /// Send every new and dirty row to the backend.
    ///
    /// Nothing is sent when there is nothing to save or when any row fails
    /// validation. Requests go out concurrently; the save fails on the
    /// first rejected request and the pending edits stay in place. Rows the
    /// backend already accepted by then are not rolled back. On success the
    /// local edits are discarded and the scope is reloaded; a failed reload
    /// is reported as [`EditorError::Reload`].
    #[tracing::instrument(
        skip_all,
        fields(
            scope = %self.scope.label(),
            creates = tracing::field::Empty,
            updates = tracing::field::Empty,
        )
    )]
    pub async fn save_all(&mut self) -> EditorResult<SaveSummary> {
        let plan = self.session.prepare_save()?;
        if plan.is_empty() {
            tracing::debug!("Nothing to save");
            return Ok(SaveSummary::default());
        }

        let summary = SaveSummary {
            created: plan.creates(),
            updated: plan.updates(),
        };
        let span = tracing::Span::current();
        span.record("creates", summary.created);
        span.record("updates", summary.updated);

        let gateway = self.gateway.as_ref();
        let requests = plan.ops().iter().map(|op| dispatch(gateway, op));
        if let Err(err) = try_join_all(requests).await {
            tracing::warn!(
                status = ?err.status,
                error = %err,
                "Batch save failed, pending edits kept",
            );
            return Err(err.into());
        }

        tracing::info!("Batch saved");
        self.reload_after_write().await?;
        Ok(summary)
    }

    /// Ask to delete a persisted row. The returned confirmation must be
    /// passed to [`confirm_delete`](Self::confirm_delete).
    pub fn request_delete(&mut self, shipment_id: DbId) -> EditorResult<DeleteConfirmation> {
        if self.session.get(RowKey::Saved(shipment_id)).is_none() {
            return Err(CoreError::NotFound {
                entity: "shipment",
                id: shipment_id,
            }
            .into());
        }
        let confirmation = DeleteConfirmation {
            shipment_id,
            token: Uuid::new_v4(),
        };
        self.pending_delete = Some(confirmation);
        Ok(confirmation)
    }

    /// Withdraw a pending delete request.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the confirmed row and reload the scope.
    #[tracing::instrument(
        name = "delete",
        skip_all,
        fields(shipment_id = confirmation.shipment_id)
    )]
    pub async fn confirm_delete(&mut self, confirmation: DeleteConfirmation) -> EditorResult<()> {
        if self.pending_delete != Some(confirmation) {
            return Err(EditorError::StaleConfirmation(format!(
                "shipment {} was not confirmed for deletion",
                confirmation.shipment_id
            )));
        }
        self.pending_delete = None;

        self.gateway
            .delete_shipment(confirmation.shipment_id)
            .await?;
        tracing::info!("Shipment deleted");
        self.reload_after_write().await
    }
}

/// History of a scope, plus the backend statistics for a single partner.
/// Selections get no statistics from the backend.
async fn fetch(
    gateway: &dyn Gateway,
    scope: &StatsScope,
) -> Result<(Vec<ShipmentRecord>, Option<PartnerStats>), GatewayError> {
    match scope {
        StatsScope::Partner { id, .. } => {
            let (records, stats) =
                futures::try_join!(gateway.partner_history(*id), gateway.partner_stats(*id))?;
            Ok((records, Some(stats)))
        }
        StatsScope::Selection { partner_ids } => {
            Ok((gateway.batch_history(partner_ids).await?, None))
        }
    }
}

async fn dispatch(gateway: &dyn Gateway, op: &SaveOp) -> Result<ShipmentRecord, GatewayError> {
    match op {
        SaveOp::Create(payload) => gateway.create_shipment(payload).await,
        SaveOp::Update { id, payload } => gateway.update_shipment(*id, payload).await,
    }
}
