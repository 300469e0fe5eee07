//! Applies coordinated role changes to a single user, repointing the
//! uncast votes a relinquished seat leaves behind so no open ballot is
//! orphaned.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::config::EngineConfig;
use crate::db::DbPool;
use crate::errors::GovError;
use crate::models::enums::{ElectionType, RoleName, VoteType};
use crate::models::user::{RoleAssignment, RoleChange, RoleChangeRequest};
use crate::models::{dac, dar, dataset, election, user, vote};

pub struct RoleDelegationHandler {
    pool: DbPool,
    config: EngineConfig,
}

impl RoleDelegationHandler {
    pub fn new(pool: DbPool, config: EngineConfig) -> Self {
        RoleDelegationHandler { pool, config }
    }

    /// Replace the origin user's role set with the requested one,
    /// handing relinquished seats and their uncast votes to the named
    /// delegate (committee seats) or alternate data owner (dataset
    /// ownership). Every check runs before the first write; any failure
    /// leaves the database untouched.
    ///
    /// Returns the origin's role set as applied.
    pub async fn update_roles(
        &self,
        request: &RoleChangeRequest,
    ) -> Result<Vec<RoleAssignment>, GovError> {
        let origin_id = request.origin_user_id;
        let mut target: Option<&Vec<RoleAssignment>> = None;
        let mut delegate_id: Option<i64> = None;
        let mut alternate_id: Option<i64> = None;
        for change in &request.changes {
            match change {
                RoleChange::SelfUpdate { roles } => {
                    if target.replace(roles).is_some() {
                        return Err(GovError::Validation(
                            "a role change request must contain exactly one self update"
                                .to_string(),
                        ));
                    }
                }
                RoleChange::DelegateTo { user_id } => {
                    if delegate_id.replace(*user_id).is_some() {
                        return Err(GovError::Validation(
                            "a role change request may name at most one delegate".to_string(),
                        ));
                    }
                }
                RoleChange::AlternateDataOwner { user_id } => {
                    if alternate_id.replace(*user_id).is_some() {
                        return Err(GovError::Validation(
                            "a role change request may name at most one alternate data owner"
                                .to_string(),
                        ));
                    }
                }
            }
        }
        let Some(target) = target else {
            return Err(GovError::Validation(
                "a role change request must contain exactly one self update".to_string(),
            ));
        };
        if delegate_id == Some(origin_id) || alternate_id == Some(origin_id) {
            return Err(GovError::Validation(
                "a user cannot delegate to themselves".to_string(),
            ));
        }
        validate_target_roles(target)?;

        let mut tx = self.pool.begin().await?;
        // Deliberately coarse: one system-wide count, read under the
        // transaction, decides whether any vote reconciliation happens
        // for this request.
        let open_elections = election::queries::count_open(&mut tx).await?;
        user::queries::find_by_id(&mut tx, origin_id)
            .await?
            .ok_or_else(|| GovError::NotFound(format!("user {origin_id}")))?;
        if let Some(user_id) = delegate_id {
            user::queries::find_by_id(&mut tx, user_id)
                .await?
                .ok_or_else(|| GovError::NotFound(format!("user {user_id}")))?;
        }
        if let Some(user_id) = alternate_id {
            user::queries::find_by_id(&mut tx, user_id)
                .await?
                .ok_or_else(|| GovError::NotFound(format!("user {user_id}")))?;
        }

        let current = user::queries::find_roles(&mut tx, origin_id).await?;
        let to_remove: Vec<RoleAssignment> = current
            .iter()
            .filter(|a| !target.contains(a))
            .copied()
            .collect();
        let to_add: Vec<RoleAssignment> = target
            .iter()
            .filter(|a| !current.contains(a))
            .copied()
            .collect();

        if to_remove.iter().any(|a| a.role == RoleName::Admin) {
            let remaining = user::queries::count_admins(&mut tx).await? - 1;
            if remaining < self.config.min_admin_count {
                return Err(GovError::Validation(format!(
                    "removing the Admin role would leave {remaining} admins; at least {} required",
                    self.config.min_admin_count
                )));
            }
        }

        for assignment in &to_remove {
            match assignment.role {
                RoleName::Chairperson | RoleName::Member => {
                    let vote_types = relinquished_vote_types(assignment, target);
                    if vote_types.is_empty() || delegate_id.is_some() {
                        continue;
                    }
                    let pending = vote::queries::count_pending_for_seat(
                        &mut tx,
                        origin_id,
                        &vote_types,
                        assignment.dac_id,
                    )
                    .await?;
                    if pending > 0 {
                        return Err(GovError::Validation(format!(
                            "user {origin_id} holds {pending} uncast votes on open elections; \
                             a delegate is required to relinquish the {} role",
                            assignment.role
                        )));
                    }
                }
                RoleName::DataOwner => {
                    if alternate_id.is_some() {
                        continue;
                    }
                    let pending = vote::queries::count_pending_for_seat(
                        &mut tx,
                        origin_id,
                        &[VoteType::DataOwner],
                        None,
                    )
                    .await?;
                    if pending > 0 {
                        return Err(GovError::Validation(format!(
                            "user {origin_id} holds {pending} uncast data owner votes; \
                             an alternate data owner is required to relinquish the role"
                        )));
                    }
                }
                _ => {}
            }
        }

        let now = Utc::now();
        for assignment in &to_remove {
            match assignment.role {
                RoleName::Chairperson | RoleName::Member => {
                    let vote_types = relinquished_vote_types(assignment, target);
                    relinquish_committee_seat(
                        &mut tx,
                        origin_id,
                        *assignment,
                        &vote_types,
                        delegate_id,
                        open_elections,
                    )
                    .await?;
                }
                RoleName::DataOwner => {
                    relinquish_data_ownership(&mut tx, origin_id, alternate_id, open_elections)
                        .await?;
                }
                RoleName::Researcher => {
                    retire_researcher(&mut tx, origin_id, now).await?;
                }
                RoleName::Admin | RoleName::Alumni => {}
            }
            user::queries::remove_role(&mut tx, origin_id, *assignment).await?;
        }

        for assignment in &to_add {
            if assignment.role == RoleName::Chairperson {
                if let Some(dac_id) = assignment.dac_id {
                    replace_incumbent_chairs(&mut tx, origin_id, dac_id, open_elections).await?;
                }
            }
            user::queries::add_role(&mut tx, origin_id, *assignment).await?;
        }

        let applied = user::queries::find_roles(&mut tx, origin_id).await?;
        tx.commit().await?;
        log::info!(
            "Updated roles for user {origin_id}: {} removed, {} added",
            to_remove.len(),
            to_add.len()
        );
        Ok(applied)
    }
}

fn validate_target_roles(target: &[RoleAssignment]) -> Result<(), GovError> {
    for (i, assignment) in target.iter().enumerate() {
        if target[..i].contains(assignment) {
            return Err(GovError::Validation(format!(
                "duplicate {} role in requested role set",
                assignment.role
            )));
        }
        if assignment.role.is_committee() && assignment.dac_id.is_none() {
            return Err(GovError::Validation(format!(
                "the {} role requires a DAC",
                assignment.role
            )));
        }
        if !assignment.role.is_committee() && assignment.dac_id.is_some() {
            return Err(GovError::Validation(format!(
                "the {} role does not take a DAC",
                assignment.role
            )));
        }
    }
    let emeritus = target
        .iter()
        .find(|a| matches!(a.role, RoleName::Alumni | RoleName::Researcher));
    if let Some(emeritus) = emeritus {
        if let Some(seat) = target.iter().find(|a| a.role.is_committee()) {
            return Err(GovError::Validation(format!(
                "the {} and {} roles cannot be held together",
                emeritus.role, seat.role
            )));
        }
    }
    Ok(())
}

/// Vote types a committee role is responsible for.
fn committee_vote_types(role: RoleName) -> &'static [VoteType] {
    match role {
        RoleName::Chairperson => &[
            VoteType::Chairperson,
            VoteType::Final,
            VoteType::Agreement,
            VoteType::Dac,
        ],
        _ => &[VoteType::Dac],
    }
}

/// Vote types that leave the origin's hands when this seat is
/// relinquished. A committee seat the target set keeps in the same DAC
/// keeps its vote types: promoting a member to chairperson leaves their
/// DAC votes in place, while demoting a chairperson to member hands off
/// only the chair-level votes.
fn relinquished_vote_types(
    assignment: &RoleAssignment,
    target: &[RoleAssignment],
) -> Vec<VoteType> {
    let retained = target
        .iter()
        .find(|t| t.role.is_committee() && t.dac_id == assignment.dac_id)
        .map(|t| committee_vote_types(t.role));
    committee_vote_types(assignment.role)
        .iter()
        .copied()
        .filter(|ty| retained.map_or(true, |kept| !kept.contains(ty)))
        .collect()
}

async fn relinquish_committee_seat(
    conn: &mut SqliteConnection,
    origin_id: i64,
    assignment: RoleAssignment,
    vote_types: &[VoteType],
    delegate_id: Option<i64>,
    open_elections: i64,
) -> Result<(), GovError> {
    let Some(delegate_id) = delegate_id else {
        return Ok(());
    };
    if open_elections > 0 && !vote_types.is_empty() {
        let moved = vote::queries::reassign_pending(
            &mut *conn,
            origin_id,
            delegate_id,
            vote_types,
            assignment.dac_id,
        )
        .await?;
        if moved > 0 {
            log::info!(
                "Repointed {moved} uncast votes from user {origin_id} to delegate {delegate_id}"
            );
        }
    }
    assign_committee_seat(&mut *conn, delegate_id, assignment).await?;
    Ok(())
}

/// Hand the freed seat to the delegate so repointed votes stay owned by
/// a sitting committee member. A delegate stepping into a seat loses
/// Alumni and the opposite committee role in the same DAC.
async fn assign_committee_seat(
    conn: &mut SqliteConnection,
    delegate_id: i64,
    assignment: RoleAssignment,
) -> Result<(), GovError> {
    if user::queries::has_role(&mut *conn, delegate_id, assignment).await? {
        return Ok(());
    }
    user::queries::remove_role(
        &mut *conn,
        delegate_id,
        RoleAssignment::global(RoleName::Alumni),
    )
    .await?;
    let opposite = match assignment.role {
        RoleName::Chairperson => RoleName::Member,
        _ => RoleName::Chairperson,
    };
    if let Some(dac_id) = assignment.dac_id {
        user::queries::remove_role(
            &mut *conn,
            delegate_id,
            RoleAssignment::in_dac(opposite, dac_id),
        )
        .await?;
    }
    user::queries::add_role(&mut *conn, delegate_id, assignment).await?;
    Ok(())
}

async fn relinquish_data_ownership(
    conn: &mut SqliteConnection,
    origin_id: i64,
    alternate_id: Option<i64>,
    open_elections: i64,
) -> Result<(), GovError> {
    match alternate_id {
        Some(alternate_id) => {
            if open_elections > 0 {
                let moved = vote::queries::reassign_pending(
                    &mut *conn,
                    origin_id,
                    alternate_id,
                    &[VoteType::DataOwner],
                    None,
                )
                .await?;
                if moved > 0 {
                    log::info!(
                        "Repointed {moved} uncast data owner votes from user {origin_id} \
                         to alternate {alternate_id}"
                    );
                }
            }
            dataset::queries::reassign_associations(&mut *conn, origin_id, alternate_id).await?;
            let owner = RoleAssignment::global(RoleName::DataOwner);
            if !user::queries::has_role(&mut *conn, alternate_id, owner).await? {
                user::queries::add_role(&mut *conn, alternate_id, owner).await?;
            }
        }
        None => {
            dataset::queries::delete_associations_for_user(&mut *conn, origin_id).await?;
        }
    }
    Ok(())
}

/// A departing researcher takes their open reviews with them: every open
/// DataAccess or RP election over one of their requests is canceled and
/// archived so the reference is free if the request is ever resubmitted.
async fn retire_researcher(
    conn: &mut SqliteConnection,
    origin_id: i64,
    now: DateTime<Utc>,
) -> Result<(), GovError> {
    let references = dar::queries::find_reference_ids_by_researcher(&mut *conn, origin_id).await?;
    if references.is_empty() {
        return Ok(());
    }
    let open = election::queries::find_open_by_references(
        &mut *conn,
        &references,
        &[ElectionType::DataAccess, ElectionType::Rp],
    )
    .await?;
    for election_id in &open {
        election::queries::cancel_and_archive(&mut *conn, *election_id, now).await?;
    }
    if !open.is_empty() {
        log::info!(
            "Canceled {} open elections for departing researcher {origin_id}",
            open.len()
        );
    }
    Ok(())
}

/// When the origin takes a chair another user holds, the incumbent steps
/// down to Alumni and their uncast committee votes in that DAC move to
/// the origin.
async fn replace_incumbent_chairs(
    conn: &mut SqliteConnection,
    origin_id: i64,
    dac_id: i64,
    open_elections: i64,
) -> Result<(), GovError> {
    let incumbents = dac::queries::find_chairpersons(&mut *conn, dac_id).await?;
    for incumbent in incumbents {
        if incumbent == origin_id {
            continue;
        }
        if open_elections > 0 {
            let moved = vote::queries::reassign_pending(
                &mut *conn,
                incumbent,
                origin_id,
                committee_vote_types(RoleName::Chairperson),
                Some(dac_id),
            )
            .await?;
            if moved > 0 {
                log::info!(
                    "Repointed {moved} uncast votes from outgoing chair {incumbent} \
                     to user {origin_id}"
                );
            }
        }
        user::queries::remove_role(
            &mut *conn,
            incumbent,
            RoleAssignment::in_dac(RoleName::Chairperson, dac_id),
        )
        .await?;
        let alumni = RoleAssignment::global(RoleName::Alumni);
        if !user::queries::has_role(&mut *conn, incumbent, alumni).await? {
            user::queries::add_role(&mut *conn, incumbent, alumni).await?;
        }
        log::info!("User {incumbent} stepped down as chairperson of DAC {dac_id}");
    }
    Ok(())
}
