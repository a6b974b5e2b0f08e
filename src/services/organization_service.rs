// src/services/organization_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::LedgerStore,
    models::licenses::{
        LicenseGrant, NewOrganization, NewTeamLicense, OrganizationOrder, OrganizationProvisioning,
        TeamLicense, TeamOrder, TeamProvisionResult, TeamProvisionStatus,
    },
    services::{commission::round_money, ledger_service::LedgerService},
};

/// Distribui os assentos entre as equipes.
///
/// Lista explícita com o tamanho certo é usada como veio. Sem ela, divisão
/// igual; o resto vai uma vaga por equipe, a partir da primeira, para que a
/// soma feche com o total comprado.
pub fn allocate_seats(
    total_seats: i32,
    number_of_teams: i32,
    seats_per_team: Option<&[i32]>,
) -> Result<Vec<i32>, AppError> {
    if number_of_teams < 1 {
        return Err(AppError::InvalidInput(
            "A organização precisa de pelo menos uma equipe.".into(),
        ));
    }

    if let Some(explicit) = seats_per_team {
        if explicit.len() == number_of_teams as usize {
            if explicit.iter().any(|s| *s < 1) {
                return Err(AppError::InvalidInput(
                    "Cada equipe precisa de pelo menos um assento.".into(),
                ));
            }
            let sum: i32 = explicit.iter().sum();
            if sum != total_seats {
                tracing::warn!(sum, total_seats, "Assentos por equipe não fecham com o total");
            }
            return Ok(explicit.to_vec());
        }
        tracing::warn!(
            informed = explicit.len(),
            number_of_teams,
            "Lista de assentos com tamanho errado, usando divisão igual"
        );
    }

    if total_seats < number_of_teams {
        return Err(AppError::InvalidInput(format!(
            "{} assentos não bastam para {} equipes.",
            total_seats, number_of_teams
        )));
    }

    let base = total_seats / number_of_teams;
    let remainder = total_seats % number_of_teams;
    Ok((0..number_of_teams)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect())
}

#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn LedgerStore>,
    ledger: LedgerService,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn LedgerStore>, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    async fn provision_team_in(
        &self,
        organization_id: Option<Uuid>,
        order: TeamOrder,
    ) -> Result<TeamLicense, AppError> {
        let (coach, member) = self.ledger.new_pair(order.seat_count).await?;

        self.store
            .provision_team(NewTeamLicense {
                organization_id,
                team_name: order.team_name,
                payer_email: order.payer_email,
                coach,
                member,
                discount_percentage: order.discount_percentage,
                price_per_seat: order.price_per_seat,
                amount_paid: order.amount_paid,
                stripe_session_id: order.stripe_session_id,
                stripe_subscription_id: order.stripe_subscription_id,
            })
            .await
    }

    /// Uma equipe: par de códigos e licença na mesma transação.
    pub async fn provision_single_team(&self, order: TeamOrder) -> Result<TeamLicense, AppError> {
        let team = self.provision_team_in(None, order).await?;
        tracing::info!(
            grant_id = %team.grant.id,
            team_name = %team.grant.team_name,
            seats = team.grant.seat_total,
            "Equipe provisionada"
        );
        Ok(team)
    }

    /// Cria a organização e tenta cada equipe em sequência. Uma equipe que
    /// falha não interrompe as outras; o resultado diz qual falhou e por quê.
    pub async fn provision_organization(
        &self,
        order: OrganizationOrder,
    ) -> Result<OrganizationProvisioning, AppError> {
        let allocations = allocate_seats(
            order.total_seats,
            order.number_of_teams,
            order.seats_per_team.as_deref(),
        )?;

        let organization = self
            .store
            .create_organization(NewOrganization {
                organization_name: order.organization_name.clone(),
                payer_email: order.payer_email.clone(),
                total_seats: order.total_seats,
                number_of_teams: order.number_of_teams,
                amount_paid: order.amount_paid,
                stripe_session_id: order.stripe_session_id.clone(),
            })
            .await?;

        let mut teams = Vec::with_capacity(allocations.len());
        for (index, seats) in allocations.into_iter().enumerate() {
            let team_index = index as i32 + 1;
            let team_name = format!("{} - Team {}", order.organization_name, team_index);

            let team_order = TeamOrder {
                team_name: team_name.clone(),
                payer_email: order.payer_email.clone(),
                seat_count: seats,
                discount_percentage: order.discount_percentage,
                price_per_seat: order.price_per_seat,
                amount_paid: round_money(order.price_per_seat * rust_decimal::Decimal::from(seats)),
                stripe_session_id: order.stripe_session_id.clone(),
                stripe_subscription_id: order.stripe_subscription_id.clone(),
            };

            let result = match self.provision_team_in(Some(organization.id), team_order).await {
                Ok(team) => TeamProvisionStatus::Succeeded {
                    grant_id: team.grant.id,
                    coach_code: team.coach_code,
                    member_code: team.member_code,
                },
                Err(e) => {
                    tracing::error!(
                        organization_id = %organization.id,
                        team_index,
                        error = %e,
                        "Falha ao provisionar equipe da organização"
                    );
                    TeamProvisionStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            teams.push(TeamProvisionResult {
                team_index,
                team_name,
                seats,
                result,
            });
        }

        let provisioning = OrganizationProvisioning { organization, teams };
        tracing::info!(
            organization_id = %provisioning.organization.id,
            teams = provisioning.teams.len(),
            failed = provisioning.failed_teams(),
            allocated_seats = provisioning.allocated_seats(),
            "Organização provisionada"
        );
        Ok(provisioning)
    }

    pub async fn list_teams(&self, organization_id: Uuid) -> Result<Vec<LicenseGrant>, AppError> {
        self.store.list_organization_grants(organization_id).await
    }

    pub async fn get_grant(&self, id: Uuid) -> Result<LicenseGrant, AppError> {
        self.store
            .find_grant(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Licença {}", id)))
    }
}
