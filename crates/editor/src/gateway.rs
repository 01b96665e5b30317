//! The seam between the editor and the partner backend.

use std::fmt;

use async_trait::async_trait;

use poultry_core::leaderboard::LeaderboardEntry;
use poultry_core::partner::{CreateGroup, CreateGrower, CreatePartner, Grower, Partner, PartnerGroup};
use poultry_core::shipment::{ShipmentPayload, ShipmentRecord};
use poultry_core::stats::PartnerStats;
use poultry_core::types::DbId;

/// Shown when a failed request carries no usable message.
pub const FALLBACK_MESSAGE: &str = "An error occurred while saving.";

/// A failed backend request.
///
/// `status` is the HTTP-style status when the backend answered at all;
/// `message` is its error text, if it sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayError {
    pub status: Option<u16>,
    pub message: Option<String>,
}

impl GatewayError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: Some(message.into()),
        }
    }

    /// Failure with nothing but a status code.
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            message: None,
        }
    }

    pub fn not_found(entity: &str, id: DbId) -> Self {
        Self::new(404, format!("{entity} {id} not found"))
    }

    /// The backend message when present and non-blank, else
    /// [`FALLBACK_MESSAGE`].
    pub fn user_message(&self) -> String {
        self.message_or(FALLBACK_MESSAGE)
    }

    /// The backend message when present and non-blank, else `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        match self.message.as_deref().map(str::trim) {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => fallback.to_string(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for GatewayError {}

/// Remote operations the editor needs.
///
/// Histories come back newest processing date first.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn partner_history(&self, partner_id: DbId) -> Result<Vec<ShipmentRecord>, GatewayError>;

    async fn batch_history(&self, partner_ids: &[DbId])
        -> Result<Vec<ShipmentRecord>, GatewayError>;

    async fn partner_stats(&self, partner_id: DbId) -> Result<PartnerStats, GatewayError>;

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, GatewayError>;

    async fn create_shipment(&self, payload: &ShipmentPayload)
        -> Result<ShipmentRecord, GatewayError>;

    async fn update_shipment(
        &self,
        id: DbId,
        payload: &ShipmentPayload,
    ) -> Result<ShipmentRecord, GatewayError>;

    async fn delete_shipment(&self, id: DbId) -> Result<(), GatewayError>;

    // -- Partners ----------------------------------------------------------

    /// All partners, each with its total delivered quantity filled in.
    async fn list_partners(&self) -> Result<Vec<Partner>, GatewayError>;

    async fn create_partner(&self, draft: &CreatePartner) -> Result<Partner, GatewayError>;

    async fn update_partner(&self, id: DbId, draft: &CreatePartner)
        -> Result<Partner, GatewayError>;

    async fn delete_partner(&self, id: DbId) -> Result<(), GatewayError>;

    // -- Growers -----------------------------------------------------------

    async fn list_growers(&self) -> Result<Vec<Grower>, GatewayError>;

    async fn create_grower(&self, draft: &CreateGrower) -> Result<Grower, GatewayError>;

    async fn update_grower(&self, id: DbId, draft: &CreateGrower) -> Result<Grower, GatewayError>;

    /// Refused while any shipment still references the grower.
    async fn delete_grower(&self, id: DbId) -> Result<(), GatewayError>;

    // -- Groups ------------------------------------------------------------

    /// Refused when a listed partner already belongs to a group.
    async fn create_group(&self, draft: &CreateGroup) -> Result<PartnerGroup, GatewayError>;

    /// Members are released, not deleted.
    async fn delete_group(&self, id: DbId) -> Result<(), GatewayError>;
}
