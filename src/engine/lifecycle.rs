//! Opens review cycles for data access request collections and seeds
//! their ballots from the responsible committee's current membership.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db::DbPool;
use crate::directory::{DatasetRegistry, UserRoleDirectory};
use crate::errors::{is_unique_violation, GovError};
use crate::models::dac::DacMember;
use crate::models::dar::DarCollection;
use crate::models::enums::{ElectionStatus, ElectionType, RoleName, VoteType};
use crate::models::{election, user, vote};

pub struct ElectionLifecycleEngine {
    pool: DbPool,
    registry: DatasetRegistry,
    directory: UserRoleDirectory,
}

impl ElectionLifecycleEngine {
    pub fn new(pool: DbPool, registry: DatasetRegistry, directory: UserRoleDirectory) -> Self {
        ElectionLifecycleEngine {
            pool,
            registry,
            directory,
        }
    }

    /// Open DataAccess and RP elections for every entry of the collection
    /// the actor is allowed to act on: admins reach every entry, chairs
    /// only entries whose dataset belongs to a DAC they chair.
    ///
    /// Returns the reference ids that now have an open cycle, in entry
    /// order. Entries whose live election is closed or canceled are left
    /// alone and not reported. All inserts happen in one transaction;
    /// any failure leaves the database untouched.
    pub async fn create_elections_for_collection(
        &self,
        actor_id: i64,
        collection: &DarCollection,
    ) -> Result<Vec<String>, GovError> {
        {
            let mut conn = self.pool.acquire().await?;
            user::queries::find_by_id(&mut conn, actor_id)
                .await?
                .ok_or_else(|| GovError::NotFound(format!("user {actor_id}")))?;
        }
        if collection.entries.is_empty() {
            return Ok(Vec::new());
        }

        let roles = self.directory.find_roles_by_user_id(actor_id).await?;
        let is_admin = roles.iter().any(|r| r.role == RoleName::Admin);
        let chaired: HashSet<i64> = roles
            .iter()
            .filter(|r| r.role == RoleName::Chairperson)
            .filter_map(|r| r.dac_id)
            .collect();
        if !is_admin && chaired.is_empty() {
            log::debug!("User {actor_id} holds no seat that can open elections");
            return Ok(Vec::new());
        }

        // Resolve every entry's committee up front so a bad dataset aborts
        // the batch before anything is written.
        let mut dac_by_dataset: HashMap<i64, i64> = HashMap::new();
        let mut entry_dacs: Vec<i64> = Vec::with_capacity(collection.entries.len());
        for entry in &collection.entries {
            let dac_id = match dac_by_dataset.get(&entry.dataset_id) {
                Some(dac_id) => *dac_id,
                None => {
                    let dac_id = self.registry.resolve_dac_for_dataset(entry.dataset_id).await?;
                    dac_by_dataset.insert(entry.dataset_id, dac_id);
                    dac_id
                }
            };
            entry_dacs.push(dac_id);
        }

        // Membership snapshot for the committees the actor can seed.
        let mut members_by_dac: HashMap<i64, Vec<DacMember>> = HashMap::new();
        for &dac_id in &entry_dacs {
            if !(is_admin || chaired.contains(&dac_id)) || members_by_dac.contains_key(&dac_id) {
                continue;
            }
            let members = self.directory.find_dac_members(dac_id).await?;
            if members.is_empty() {
                return Err(GovError::NotFound(format!(
                    "DAC {dac_id} has no voting members"
                )));
            }
            members_by_dac.insert(dac_id, members);
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut touched: Vec<String> = Vec::new();
        let mut created = 0usize;
        for (entry, dac_id) in collection.entries.iter().zip(entry_dacs.iter().copied()) {
            let Some(members) = members_by_dac.get(&dac_id) else {
                log::debug!(
                    "User {actor_id} holds no seat over DAC {dac_id}; skipping DAR {}",
                    entry.reference_id
                );
                continue;
            };
            let mut has_open_cycle = false;
            for election_type in [ElectionType::DataAccess, ElectionType::Rp] {
                let existing = election::queries::find_active_for_reference(
                    &mut tx,
                    &entry.reference_id,
                    election_type,
                )
                .await?;
                match existing {
                    Some(live) if live.status == ElectionStatus::Open => {
                        has_open_cycle = true;
                    }
                    Some(live) => {
                        log::debug!(
                            "DAR {} has a {} {} election (id {}); not reopening",
                            entry.reference_id,
                            live.status,
                            election_type,
                            live.election_id
                        );
                    }
                    None => {
                        let election_id = match election::queries::create(
                            &mut tx,
                            election_type,
                            &entry.reference_id,
                            entry.dataset_id,
                            now,
                        )
                        .await
                        {
                            Ok(election_id) => election_id,
                            Err(GovError::Db(err)) if is_unique_violation(&err) => {
                                return Err(GovError::Conflict(format!(
                                    "a {election_type} election for DAR {} was created concurrently",
                                    entry.reference_id
                                )));
                            }
                            Err(err) => return Err(err),
                        };
                        seed_votes(&mut tx, election_id, election_type, members, now).await?;
                        created += 1;
                        has_open_cycle = true;
                    }
                }
            }
            if has_open_cycle && !touched.contains(&entry.reference_id) {
                touched.push(entry.reference_id.clone());
            }
        }
        tx.commit().await?;

        log::info!(
            "Created {created} elections across {} DARs for collection {}",
            touched.len(),
            collection.collection_id
        );
        Ok(touched)
    }
}

/// Every member gets a DAC vote; chairs additionally get a Chairperson
/// vote, and on DataAccess elections the FINAL and AGREEMENT votes.
async fn seed_votes(
    conn: &mut SqliteConnection,
    election_id: i64,
    election_type: ElectionType,
    members: &[DacMember],
    now: DateTime<Utc>,
) -> Result<(), GovError> {
    for member in members {
        vote::queries::create(&mut *conn, election_id, member.user_id, VoteType::Dac, now).await?;
        if member.role == RoleName::Chairperson {
            vote::queries::create(
                &mut *conn,
                election_id,
                member.user_id,
                VoteType::Chairperson,
                now,
            )
            .await?;
            if election_type == ElectionType::DataAccess {
                vote::queries::create(&mut *conn, election_id, member.user_id, VoteType::Final, now)
                    .await?;
                vote::queries::create(
                    &mut *conn,
                    election_id,
                    member.user_id,
                    VoteType::Agreement,
                    now,
                )
                .await?;
            }
        }
    }
    Ok(())
}
