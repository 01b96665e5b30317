//! Partner, grower and group maintenance.
//!
//! Drafts are normalised and checked locally first; a draft that fails a
//! local rule never reaches the backend.

use poultry_core::partner::{CreateGroup, CreateGrower, CreatePartner, Grower, Partner, PartnerGroup};
use poultry_core::types::DbId;

use crate::error::EditorResult;
use crate::gateway::Gateway;

pub async fn list_partners(gateway: &dyn Gateway) -> EditorResult<Vec<Partner>> {
    let partners = gateway.list_partners().await?;
    tracing::debug!(partners = partners.len(), "Partners loaded");
    Ok(partners)
}

#[tracing::instrument(skip_all, fields(partner_id = ?draft.id))]
pub async fn create_partner(gateway: &dyn Gateway, draft: CreatePartner) -> EditorResult<Partner> {
    let draft = draft.normalized()?;
    let partner = gateway.create_partner(&draft).await?;
    tracing::info!(partner_id = partner.id, "Partner created");
    Ok(partner)
}

#[tracing::instrument(skip(gateway, draft))]
pub async fn update_partner(
    gateway: &dyn Gateway,
    partner_id: DbId,
    draft: CreatePartner,
) -> EditorResult<Partner> {
    let draft = draft.normalized()?;
    let partner = gateway.update_partner(partner_id, &draft).await?;
    tracing::info!("Partner updated");
    Ok(partner)
}

#[tracing::instrument(skip(gateway))]
pub async fn delete_partner(gateway: &dyn Gateway, partner_id: DbId) -> EditorResult<()> {
    gateway.delete_partner(partner_id).await?;
    tracing::info!("Partner deleted");
    Ok(())
}

pub async fn list_growers(gateway: &dyn Gateway) -> EditorResult<Vec<Grower>> {
    Ok(gateway.list_growers().await?)
}

#[tracing::instrument(skip_all)]
pub async fn create_grower(gateway: &dyn Gateway, draft: CreateGrower) -> EditorResult<Grower> {
    let draft = draft.normalized()?;
    let grower = gateway.create_grower(&draft).await?;
    tracing::info!(grower_id = grower.id, "Grower created");
    Ok(grower)
}

#[tracing::instrument(skip(gateway, draft))]
pub async fn update_grower(
    gateway: &dyn Gateway,
    grower_id: DbId,
    draft: CreateGrower,
) -> EditorResult<Grower> {
    let draft = draft.normalized()?;
    let grower = gateway.update_grower(grower_id, &draft).await?;
    tracing::info!("Grower updated");
    Ok(grower)
}

#[tracing::instrument(skip(gateway))]
pub async fn delete_grower(gateway: &dyn Gateway, grower_id: DbId) -> EditorResult<()> {
    gateway.delete_grower(grower_id).await?;
    tracing::info!("Grower deleted");
    Ok(())
}

/// Group the selected partners under `name`.
///
/// `members` should come from a fresh [`list_partners`] so that existing
/// memberships are caught before the request is sent.
#[tracing::instrument(skip(gateway, color, members), fields(members = members.len()))]
pub async fn create_group(
    gateway: &dyn Gateway,
    name: &str,
    color: Option<&str>,
    members: &[Partner],
) -> EditorResult<PartnerGroup> {
    let draft = CreateGroup::build(name, color, members)?;
    let group = gateway.create_group(&draft).await?;
    tracing::info!(group_id = group.id, "Group created");
    Ok(group)
}

#[tracing::instrument(skip(gateway))]
pub async fn delete_group(gateway: &dyn Gateway, group_id: DbId) -> EditorResult<()> {
    gateway.delete_group(group_id).await?;
    tracing::info!("Group deleted");
    Ok(())
}
