//! Integration tests for the role delegation handler.
//!
//! Tests cover: update_roles validation (request shape, admin floor,
//! required delegates), uncast-vote repointing for committee seats and
//! data owners, seat handoff, incumbent chair replacement, and
//! researcher retirement.

mod common;

use sqlx::SqlitePool;

use dacgov::errors::GovError;
use dacgov::models::election::Election;
use dacgov::models::enums::{ElectionStatus, ElectionType, RoleName, VoteType};
use dacgov::models::user::{RoleAssignment, RoleChange, RoleChangeRequest};
use dacgov::models::{dar, dataset, election, user};
use common::{
    add_role, create_dac, create_dar, create_dataset, create_user, delegation_handler,
    lifecycle_engine, setup_test_db, tally_engine,
};

/// Helper: committee (chair + member), dataset, one DAR, and open
/// DataAccess/RP elections. Returns (dac_id, chair_id, member_id, access, rp).
async fn seed_committee_with_elections(
    pool: &SqlitePool,
    tag: &str,
    collection_id: i64,
) -> (i64, i64, i64, Election, Election) {
    let dac_id = create_dac(pool, &format!("dac_{tag}")).await;
    let chair_id = create_user(pool, &format!("chair_{tag}")).await;
    let member_id = create_user(pool, &format!("member_{tag}")).await;
    add_role(pool, chair_id, RoleName::Chairperson, Some(dac_id)).await;
    add_role(pool, member_id, RoleName::Member, Some(dac_id)).await;
    let dataset_id = create_dataset(pool, &format!("ds_{tag}"), dac_id).await;
    let researcher_id = create_user(pool, &format!("researcher_{tag}")).await;
    let reference_id = format!("DAR-{tag}");
    create_dar(pool, &reference_id, collection_id, researcher_id, &[dataset_id]).await;

    let mut conn = pool.acquire().await.unwrap();
    let collection = dar::queries::find_collection(&mut conn, collection_id)
        .await
        .unwrap();
    drop(conn);
    lifecycle_engine(pool)
        .create_elections_for_collection(chair_id, &collection)
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let elections = election::queries::find_by_reference(&mut conn, &reference_id)
        .await
        .unwrap();
    let access = elections
        .iter()
        .find(|e| e.election_type == ElectionType::DataAccess)
        .unwrap()
        .clone();
    let rp = elections
        .iter()
        .find(|e| e.election_type == ElectionType::Rp)
        .unwrap()
        .clone();
    (dac_id, chair_id, member_id, access, rp)
}

async fn roles_of(pool: &SqlitePool, user_id: i64) -> Vec<RoleAssignment> {
    let mut conn = pool.acquire().await.unwrap();
    user::queries::find_roles(&mut conn, user_id).await.unwrap()
}

async fn count_votes(pool: &SqlitePool) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vote")
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

async fn count_votes_owned_by(pool: &SqlitePool, user_id: i64) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vote WHERE dac_user_id = ?1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

async fn count_uncast_votes_owned_by(pool: &SqlitePool, user_id: i64) -> i64 {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM vote WHERE dac_user_id = ?1 AND vote IS NULL",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

fn self_update(origin: i64, roles: Vec<RoleAssignment>) -> RoleChangeRequest {
    RoleChangeRequest {
        origin_user_id: origin,
        changes: vec![RoleChange::SelfUpdate { roles }],
    }
}

fn delegated(origin: i64, roles: Vec<RoleAssignment>, delegate: i64) -> RoleChangeRequest {
    RoleChangeRequest {
        origin_user_id: origin,
        changes: vec![
            RoleChange::SelfUpdate { roles },
            RoleChange::DelegateTo { user_id: delegate },
        ],
    }
}

#[tokio::test]
async fn test_simple_role_update() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let dac_id = create_dac(pool, "dac_simple").await;
    let user_id = create_user(pool, "simple_user").await;
    add_role(pool, user_id, RoleName::Alumni, None).await;

    let handler = delegation_handler(pool);
    let applied = handler
        .update_roles(&self_update(
            user_id,
            vec![RoleAssignment::in_dac(RoleName::Member, dac_id)],
        ))
        .await
        .unwrap();

    assert_eq!(applied, vec![RoleAssignment::in_dac(RoleName::Member, dac_id)]);
    assert_eq!(roles_of(pool, user_id).await, applied);
}

#[tokio::test]
async fn test_admin_floor_is_enforced() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let admin_a = create_user(pool, "admin_a").await;
    let admin_b = create_user(pool, "admin_b").await;
    add_role(pool, admin_a, RoleName::Admin, None).await;
    add_role(pool, admin_b, RoleName::Admin, None).await;

    // Two admins, minimum two: nobody may step down.
    let handler = delegation_handler(pool);
    let err = handler
        .update_roles(&self_update(admin_a, vec![]))
        .await
        .unwrap_err();
    match err {
        GovError::Validation(msg) => assert!(msg.contains("at least 2 required")),
        other => panic!("expected Validation, got {other}"),
    }
    assert_eq!(
        roles_of(pool, admin_a).await,
        vec![RoleAssignment::global(RoleName::Admin)],
        "nothing persisted"
    );

    // A third admin frees the first to leave.
    let admin_c = create_user(pool, "admin_c").await;
    add_role(pool, admin_c, RoleName::Admin, None).await;
    let applied = handler
        .update_roles(&self_update(admin_a, vec![]))
        .await
        .unwrap();
    assert!(applied.is_empty());
    assert!(roles_of(pool, admin_a).await.is_empty());
}

#[tokio::test]
async fn test_chair_delegation_repoints_uncast_votes() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let (dac_id, chair_id, _member_id, access, _rp) =
        seed_committee_with_elections(pool, "chdel", 1).await;

    // The chair casts one vote before stepping down; it must stay theirs.
    let mut conn = pool.acquire().await.unwrap();
    let access_votes = dacgov::models::vote::queries::find_by_election(&mut conn, access.election_id)
        .await
        .unwrap();
    drop(conn);
    let cast = access_votes
        .iter()
        .find(|v| v.dac_user_id == chair_id && v.vote_type == VoteType::Dac)
        .unwrap();
    tally_engine(pool)
        .update_votes_with_value(&[cast.vote_id], true, None)
        .await
        .unwrap();

    let delegate_id = create_user(pool, "chdel_delegate").await;
    add_role(pool, delegate_id, RoleName::Alumni, None).await;
    let total_before = count_votes(pool).await;

    let handler = delegation_handler(pool);
    handler
        .update_roles(&delegated(chair_id, vec![], delegate_id))
        .await
        .unwrap();

    // Five uncast votes moved (CP/FINAL/AGREEMENT on access, CP/DAC on RP);
    // the cast one stayed. No vote row appeared or vanished.
    assert_eq!(count_votes(pool).await, total_before);
    assert_eq!(count_votes_owned_by(pool, delegate_id).await, 5);
    assert_eq!(count_uncast_votes_owned_by(pool, delegate_id).await, 5);
    assert_eq!(count_votes_owned_by(pool, chair_id).await, 1);
    assert_eq!(count_uncast_votes_owned_by(pool, chair_id).await, 0);

    // Seat handoff: the delegate now chairs the DAC, Alumni dropped.
    assert_eq!(
        roles_of(pool, delegate_id).await,
        vec![RoleAssignment::in_dac(RoleName::Chairperson, dac_id)]
    );
    assert!(roles_of(pool, chair_id).await.is_empty());

    println!("[PASS] test_chair_delegation_repoints_uncast_votes");
}

#[tokio::test]
async fn test_member_delegation_moves_only_dac_votes() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let (dac_id, chair_id, member_id, _access, _rp) =
        seed_committee_with_elections(pool, "memdel", 2).await;

    let delegate_id = create_user(pool, "memdel_delegate").await;
    let chair_votes_before = count_votes_owned_by(pool, chair_id).await;

    let handler = delegation_handler(pool);
    handler
        .update_roles(&delegated(member_id, vec![], delegate_id))
        .await
        .unwrap();

    // One DAC vote per election moved; the chair's ballot is untouched.
    assert_eq!(count_votes_owned_by(pool, delegate_id).await, 2);
    assert_eq!(count_votes_owned_by(pool, member_id).await, 0);
    assert_eq!(count_votes_owned_by(pool, chair_id).await, chair_votes_before);
    assert_eq!(
        roles_of(pool, delegate_id).await,
        vec![RoleAssignment::in_dac(RoleName::Member, dac_id)]
    );
}

#[tokio::test]
async fn test_pending_votes_require_a_delegate() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let (dac_id, chair_id, _member_id, _access, _rp) =
        seed_committee_with_elections(pool, "nodel", 3).await;

    let handler = delegation_handler(pool);
    let err = handler
        .update_roles(&self_update(chair_id, vec![]))
        .await
        .unwrap_err();
    match err {
        GovError::Validation(msg) => {
            assert!(msg.contains("delegate is required"), "got: {msg}");
        }
        other => panic!("expected Validation, got {other}"),
    }
    // Nothing changed: the chair keeps the seat and every vote.
    assert_eq!(
        roles_of(pool, chair_id).await,
        vec![RoleAssignment::in_dac(RoleName::Chairperson, dac_id)]
    );
    assert_eq!(count_votes_owned_by(pool, chair_id).await, 6);
}

#[tokio::test]
async fn test_no_open_elections_means_no_vote_reconciliation() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let dac_id = create_dac(pool, "dac_quiet").await;
    let chair_id = create_user(pool, "quiet_chair").await;
    add_role(pool, chair_id, RoleName::Chairperson, Some(dac_id)).await;
    let delegate_id = create_user(pool, "quiet_delegate").await;

    // No elections anywhere: stepping down needs no delegate at all,
    // but a named one still receives the seat.
    let handler = delegation_handler(pool);
    handler
        .update_roles(&delegated(chair_id, vec![], delegate_id))
        .await
        .unwrap();
    assert!(roles_of(pool, chair_id).await.is_empty());
    assert_eq!(
        roles_of(pool, delegate_id).await,
        vec![RoleAssignment::in_dac(RoleName::Chairperson, dac_id)]
    );
    assert_eq!(count_votes(pool).await, 0);
}

#[tokio::test]
async fn test_promotion_keeps_own_votes_and_replaces_incumbent() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let (dac_id, chair_id, member_id, _access, _rp) =
        seed_committee_with_elections(pool, "promo", 4).await;
    let total_before = count_votes(pool).await;

    // The member takes the chair. Their own DAC votes stay with them, so
    // no delegate is needed; the incumbent steps down to Alumni and hands
    // over every uncast vote in the DAC.
    let handler = delegation_handler(pool);
    let applied = handler
        .update_roles(&self_update(
            member_id,
            vec![RoleAssignment::in_dac(RoleName::Chairperson, dac_id)],
        ))
        .await
        .unwrap();
    assert_eq!(
        applied,
        vec![RoleAssignment::in_dac(RoleName::Chairperson, dac_id)]
    );

    assert_eq!(
        roles_of(pool, chair_id).await,
        vec![RoleAssignment::global(RoleName::Alumni)]
    );
    assert_eq!(count_votes_owned_by(pool, chair_id).await, 0);
    assert_eq!(count_votes_owned_by(pool, member_id).await, 8);
    assert_eq!(count_votes(pool).await, total_before);

    println!("[PASS] test_promotion_keeps_own_votes_and_replaces_incumbent");
}

#[tokio::test]
async fn test_alternate_data_owner_handoff() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let dac_id = create_dac(pool, "dac_owner").await;
    let dataset_id = create_dataset(pool, "ds_owner", dac_id).await;
    let owner_id = create_user(pool, "owner").await;
    let alternate_id = create_user(pool, "alternate").await;
    add_role(pool, owner_id, RoleName::DataOwner, None).await;

    // A dataset review election with the owner's uncast DATA_OWNER vote.
    let mut conn = pool.acquire().await.unwrap();
    dataset::queries::add_association(&mut conn, dataset_id, owner_id)
        .await
        .unwrap();
    let election_id = election::queries::create(
        &mut conn,
        ElectionType::DataSet,
        &format!("DS-{dataset_id}"),
        dataset_id,
        chrono::Utc::now(),
    )
    .await
    .unwrap();
    let vote_id = dacgov::models::vote::queries::create(
        &mut conn,
        election_id,
        owner_id,
        VoteType::DataOwner,
        chrono::Utc::now(),
    )
    .await
    .unwrap();
    drop(conn);

    // Without an alternate the removal is blocked.
    let handler = delegation_handler(pool);
    let err = handler
        .update_roles(&self_update(owner_id, vec![]))
        .await
        .unwrap_err();
    match err {
        GovError::Validation(msg) => assert!(msg.contains("alternate data owner")),
        other => panic!("expected Validation, got {other}"),
    }

    let request = RoleChangeRequest {
        origin_user_id: owner_id,
        changes: vec![
            RoleChange::SelfUpdate { roles: vec![] },
            RoleChange::AlternateDataOwner {
                user_id: alternate_id,
            },
        ],
    };
    handler.update_roles(&request).await.unwrap();

    // The vote, the dataset association and the role all moved.
    let mut conn = pool.acquire().await.unwrap();
    let moved = dacgov::models::vote::queries::find_by_id(&mut conn, vote_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.dac_user_id, alternate_id);
    let owner_assocs = dataset::queries::find_associations_for_user(&mut conn, owner_id)
        .await
        .unwrap();
    assert!(owner_assocs.is_empty());
    let alternate_assocs = dataset::queries::find_associations_for_user(&mut conn, alternate_id)
        .await
        .unwrap();
    assert_eq!(alternate_assocs.len(), 1);
    assert_eq!(alternate_assocs[0].dataset_id, dataset_id);
    drop(conn);
    assert_eq!(
        roles_of(pool, alternate_id).await,
        vec![RoleAssignment::global(RoleName::DataOwner)]
    );
    assert!(roles_of(pool, owner_id).await.is_empty());
}

#[tokio::test]
async fn test_data_owner_removal_without_votes_drops_associations() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let dac_id = create_dac(pool, "dac_drop").await;
    let dataset_id = create_dataset(pool, "ds_drop", dac_id).await;
    let owner_id = create_user(pool, "drop_owner").await;
    add_role(pool, owner_id, RoleName::DataOwner, None).await;
    let mut conn = pool.acquire().await.unwrap();
    dataset::queries::add_association(&mut conn, dataset_id, owner_id)
        .await
        .unwrap();
    drop(conn);

    // No uncast votes anywhere, so no alternate is needed; the orphaned
    // associations are removed with the role.
    let handler = delegation_handler(pool);
    handler
        .update_roles(&self_update(owner_id, vec![]))
        .await
        .unwrap();
    let mut conn = pool.acquire().await.unwrap();
    let assocs = dataset::queries::find_associations_for_user(&mut conn, owner_id)
        .await
        .unwrap();
    assert!(assocs.is_empty());
}

#[tokio::test]
async fn test_researcher_retirement_cancels_their_elections() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let (_dac_id, _chair_id, _member_id, access, rp) =
        seed_committee_with_elections(pool, "retire", 5).await;

    // The DAR researcher holds the Researcher role.
    let mut conn = pool.acquire().await.unwrap();
    let dar_row = dar::queries::find_by_reference(&mut conn, &access.reference_id)
        .await
        .unwrap()
        .unwrap();
    drop(conn);
    add_role(pool, dar_row.user_id, RoleName::Researcher, None).await;

    let handler = delegation_handler(pool);
    handler
        .update_roles(&self_update(dar_row.user_id, vec![]))
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    for election_id in [access.election_id, rp.election_id] {
        let e = election::queries::find_by_id(&mut conn, election_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(e.status, ElectionStatus::Canceled);
        assert!(e.archived, "canceled and archived in one step");
    }
}

#[tokio::test]
async fn test_malformed_requests_are_rejected() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let dac_id = create_dac(pool, "dac_malformed").await;
    let user_id = create_user(pool, "malformed_user").await;

    let handler = delegation_handler(pool);

    // No self update at all.
    let err = handler
        .update_roles(&RoleChangeRequest {
            origin_user_id: user_id,
            changes: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GovError::Validation(_)));

    // Two self updates.
    let err = handler
        .update_roles(&RoleChangeRequest {
            origin_user_id: user_id,
            changes: vec![
                RoleChange::SelfUpdate { roles: vec![] },
                RoleChange::SelfUpdate { roles: vec![] },
            ],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GovError::Validation(_)));

    // Delegating to oneself.
    let err = handler
        .update_roles(&delegated(user_id, vec![], user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, GovError::Validation(_)));

    // Duplicate role in the target set.
    let err = handler
        .update_roles(&self_update(
            user_id,
            vec![
                RoleAssignment::in_dac(RoleName::Member, dac_id),
                RoleAssignment::in_dac(RoleName::Member, dac_id),
            ],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, GovError::Validation(_)));

    // Committee role without a DAC, and a global role with one.
    let err = handler
        .update_roles(&self_update(
            user_id,
            vec![RoleAssignment::global(RoleName::Member)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, GovError::Validation(_)));
    let err = handler
        .update_roles(&self_update(
            user_id,
            vec![RoleAssignment::in_dac(RoleName::Admin, dac_id)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, GovError::Validation(_)));

    // Alumni cannot sit on a committee.
    let err = handler
        .update_roles(&self_update(
            user_id,
            vec![
                RoleAssignment::global(RoleName::Alumni),
                RoleAssignment::in_dac(RoleName::Member, dac_id),
            ],
        ))
        .await
        .unwrap_err();
    match err {
        GovError::Validation(msg) => assert!(msg.contains("cannot be held together")),
        other => panic!("expected Validation, got {other}"),
    }
}

#[tokio::test]
async fn test_unknown_users_are_rejected() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let user_id = create_user(pool, "known_user").await;

    let handler = delegation_handler(pool);
    let err = handler
        .update_roles(&self_update(999_999, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, GovError::NotFound(_)));

    let err = handler
        .update_roles(&delegated(user_id, vec![], 999_999))
        .await
        .unwrap_err();
    assert!(matches!(err, GovError::NotFound(_)));
}

/// The repoint gate counts elections as the role-change transaction
/// sees them: an election closed before the request keeps every vote it
/// has, and only uncast votes on still-open elections follow the
/// delegate.
#[tokio::test]
async fn test_only_open_election_votes_move_to_the_delegate() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let (dac_id, chair_id, member_id, access, rp) =
        seed_committee_with_elections(pool, "gate", 21).await;

    // Step 1: close the access election with the chair's FINAL vote.
    let mut conn = pool.acquire().await.unwrap();
    let access_votes =
        dacgov::models::vote::queries::find_by_election(&mut conn, access.election_id)
            .await
            .unwrap();
    drop(conn);
    let final_vote = access_votes
        .iter()
        .find(|v| v.vote_type == VoteType::Final)
        .unwrap();
    tally_engine(pool)
        .update_votes_with_value(&[final_vote.vote_id], true, None)
        .await
        .unwrap();

    // Step 2: the chair steps down entirely, naming a delegate.
    let delegate_id = create_user(pool, "gate_delegate").await;
    delegation_handler(pool)
        .update_roles(&delegated(chair_id, vec![], delegate_id))
        .await
        .unwrap();

    // The two uncast votes on the open RP election moved; the four
    // votes on the closed access election stayed with the chair.
    assert_eq!(count_votes_owned_by(pool, delegate_id).await, 2);
    assert_eq!(count_votes_owned_by(pool, chair_id).await, 4);
    assert_eq!(count_uncast_votes_owned_by(pool, chair_id).await, 3);
    assert_eq!(count_votes(pool).await, 8);

    let mut conn = pool.acquire().await.unwrap();
    let rp_votes = dacgov::models::vote::queries::find_by_election(&mut conn, rp.election_id)
        .await
        .unwrap();
    let access_after =
        dacgov::models::vote::queries::find_by_election(&mut conn, access.election_id)
            .await
            .unwrap();
    drop(conn);
    assert!(
        rp_votes.iter().all(|v| v.dac_user_id != chair_id),
        "chair should hold no votes on the open election"
    );
    assert_eq!(
        rp_votes
            .iter()
            .filter(|v| v.dac_user_id == member_id)
            .count(),
        1
    );
    assert!(
        access_after.iter().all(|v| v.dac_user_id != delegate_id),
        "closed election votes must not move"
    );

    assert_eq!(
        roles_of(pool, delegate_id).await,
        vec![RoleAssignment::in_dac(RoleName::Chairperson, dac_id)]
    );
    println!("[PASS] only open-election votes followed the delegate");
}
