//! End-to-end pipeline tests against the in-memory stores and the
//! scriptable mock ledger: submit, confirm or revert, and verify what
//! landed in the store.

#![allow(clippy::unwrap_used, clippy::panic)]

use cakepicnic_core::action::{ActionStatus, PortalAction};
use cakepicnic_core::clock::Clock;
use cakepicnic_core::domain::{CakeSubmission, CheckInRecord, CheckInState, Participant};
use cakepicnic_core::error::PortalError;
use cakepicnic_core::ledger::{LedgerError, Signer};
use cakepicnic_core::store::{
    CakeStore, CheckInStore, ParticipantStore, PendingActionStore, VoteStore,
};
use cakepicnic_core::types::{CakeId, Category, Fee, ParticipantId, Seat, TxHash, WalletAddress};
use cakepicnic_orchestrator::{
    ApplyOutcome, ConfirmationListener, OrchestratorConfig, PortalStores, ReconciliationApplier,
    StatusQueries, SubmitOutcome, TransactionOrchestrator,
};
use cakepicnic_testing::{
    FixedClock, InMemoryPortalStore, MockLedgerClient, RecordingMediaStore, test_clock,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

const TIER_FEE: u64 = 100;

struct Harness {
    store: Arc<InMemoryPortalStore>,
    media: Arc<RecordingMediaStore>,
    ledger: Arc<MockLedgerClient>,
    clock: Arc<FixedClock>,
    orchestrator: TransactionOrchestrator,
    applier: ReconciliationApplier,
    listener: ConfirmationListener,
    status: StatusQueries,
}

impl Harness {
    fn new() -> Self {
        let config = OrchestratorConfig {
            pending_ttl_secs: 600,
            poll_interval_ms: 1,
            poll_batch: 100,
            fee_schedule: HashMap::from([("standard".to_string(), TIER_FEE)]),
        };
        let store = Arc::new(InMemoryPortalStore::new());
        let media = Arc::new(RecordingMediaStore::new());
        let ledger = Arc::new(MockLedgerClient::new());
        let clock = Arc::new(test_clock());
        let stores = PortalStores::from_backend(store.clone(), media.clone());
        let applier = ReconciliationApplier::new(stores.clone(), clock.clone());
        let orchestrator = TransactionOrchestrator::new(
            stores.clone(),
            ledger.clone(),
            clock.clone(),
            config.clone(),
        );
        let listener = ConfirmationListener::new(
            stores.clone(),
            ledger.clone(),
            applier.clone(),
            clock.clone(),
            config,
        );
        let status = StatusQueries::new(stores);
        Self {
            store,
            media,
            ledger,
            clock,
            orchestrator,
            applier,
            listener,
            status,
        }
    }

    fn seed_participant(&self, n: u8) -> Participant {
        let participant = Participant {
            id: ParticipantId::new(),
            wallet: wallet(n),
            tier: "standard".to_string(),
            paid: true,
            registration_tx_hash: seed_hash(u64::from(n)),
            registered_at: self.clock.now(),
        };
        self.store.seed_participant(participant.clone());
        participant
    }

    fn seed_cake(&self, owner: &Participant, table: i16, seat: i16) -> CakeSubmission {
        let nonce = 0xb000 + u64::try_from(table).unwrap() * 100 + u64::try_from(seat).unwrap();
        let cake = CakeSubmission {
            id: CakeId::new(),
            owner: owner.id,
            title: "Lemon Drizzle".to_string(),
            description: "three layers".to_string(),
            media_url: format!("s3://cakes/{}.png", owner.id),
            media_type: "image/png".to_string(),
            seat: Seat::new(table, seat).unwrap(),
            story: String::new(),
            tx_hash: Some(seed_hash(nonce)),
            created_at: self.clock.now(),
        };
        self.store.seed_cake(cake.clone());
        cake
    }

    fn seed_checked_in(&self, participant: &Participant) {
        self.store.seed_check_in(CheckInRecord {
            participant: participant.id,
            state: CheckInState::In,
            checked_in_at: Some(self.clock.now()),
            checked_out_at: None,
            check_in_tx_hash: Some(seed_hash(0xc0)),
            check_out_tx_hash: None,
        });
    }

    async fn submit(&self, action: PortalAction, signer: &Signer) -> TxHash {
        match self.orchestrator.submit(action, signer).await.unwrap() {
            SubmitOutcome::Submitted { tx_hash } => tx_hash,
            SubmitOutcome::AlreadyCheckedIn => panic!("expected a submitted transaction"),
        }
    }

    async fn confirm_and_tick(&self, tx_hash: &TxHash) {
        self.ledger.confirm(tx_hash);
        self.listener.tick().await.unwrap();
    }
}

fn wallet(n: u8) -> WalletAddress {
    WalletAddress::parse(&format!("0x{n:040x}")).unwrap()
}

/// Hashes distinct from the mock ledger's nonce-derived ones.
fn seed_hash(n: u64) -> TxHash {
    TxHash::parse(&format!("0x{:064x}", 0xffff_0000_u64 + n)).unwrap()
}

fn upload_action(owner: &Participant, table: i16, seat: i16) -> PortalAction {
    PortalAction::UploadCake {
        participant: owner.id,
        cake_id: CakeId::new(),
        title: "Battenberg".to_string(),
        description: "pink and yellow".to_string(),
        media_url: format!("s3://cakes/{}.png", owner.id),
        media_type: "image/png".to_string(),
        seat: Seat::new(table, seat).unwrap(),
        story: "grandmother's recipe".to_string(),
    }
}

fn vote_action(voter: &Participant, cake: &CakeSubmission, category: Category) -> PortalAction {
    PortalAction::Vote {
        voter: voter.id,
        cake_id: cake.id,
        category,
    }
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn registration_confirms_into_a_paid_participant() {
    let h = Harness::new();
    let id = ParticipantId::new();
    let signer = Signer::new(wallet(1));
    let action = PortalAction::Register {
        participant: id,
        wallet: wallet(1),
        tier: "standard".to_string(),
        offered_fee: Fee::from_wei(TIER_FEE),
    };

    let tx = h.submit(action, &signer).await;
    assert!(ParticipantStore::find(&*h.store, id).await.unwrap().is_none());

    h.confirm_and_tick(&tx).await;

    let row = ParticipantStore::find(&*h.store, id).await.unwrap().unwrap();
    assert!(row.paid);
    assert_eq!(row.wallet, wallet(1));
    assert_eq!(row.registration_tx_hash, tx);

    // Pending row consumed; the committed index answers the status query.
    let report = h.status.status_by_hash(&tx).await.unwrap();
    assert_eq!(report.status, ActionStatus::Committed);
}

#[tokio::test]
async fn registration_preconditions_never_touch_the_ledger() {
    let h = Harness::new();
    let signer = Signer::new(wallet(1));

    let wrong_fee = PortalAction::Register {
        participant: ParticipantId::new(),
        wallet: wallet(1),
        tier: "standard".to_string(),
        offered_fee: Fee::from_wei(TIER_FEE + 1),
    };
    assert!(matches!(
        h.orchestrator.submit(wrong_fee, &signer).await,
        Err(PortalError::FeeMismatch { required: TIER_FEE, .. })
    ));

    let unknown_tier = PortalAction::Register {
        participant: ParticipantId::new(),
        wallet: wallet(1),
        tier: "imperial".to_string(),
        offered_fee: Fee::from_wei(TIER_FEE),
    };
    assert!(matches!(
        h.orchestrator.submit(unknown_tier, &signer).await,
        Err(PortalError::MalformedPayload(_))
    ));

    let foreign_wallet = PortalAction::Register {
        participant: ParticipantId::new(),
        wallet: wallet(2),
        tier: "standard".to_string(),
        offered_fee: Fee::from_wei(TIER_FEE),
    };
    assert!(matches!(
        h.orchestrator.submit(foreign_wallet, &signer).await,
        Err(PortalError::AddressMismatch { .. })
    ));

    assert!(h.ledger.submitted().is_empty());
}

#[tokio::test]
async fn registered_wallet_cannot_register_twice() {
    let h = Harness::new();
    let existing = h.seed_participant(1);
    let signer = Signer::new(existing.wallet.clone());
    let action = PortalAction::Register {
        participant: ParticipantId::new(),
        wallet: existing.wallet.clone(),
        tier: "standard".to_string(),
        offered_fee: Fee::from_wei(TIER_FEE),
    };
    assert!(matches!(
        h.orchestrator.submit(action, &signer).await,
        Err(PortalError::AlreadyRegistered(_))
    ));
}

#[tokio::test]
async fn second_registration_for_a_wallet_in_flight_is_rejected() {
    let h = Harness::new();
    let shared_wallet = wallet(9);
    let signer = Signer::new(shared_wallet.clone());

    let first = PortalAction::Register {
        participant: ParticipantId::new(),
        wallet: shared_wallet.clone(),
        tier: "standard".to_string(),
        offered_fee: Fee::from_wei(TIER_FEE),
    };
    h.submit(first, &signer).await;

    // A retry mints a fresh participant id, so dedup has to go by wallet.
    let retry = PortalAction::Register {
        participant: ParticipantId::new(),
        wallet: shared_wallet,
        tier: "standard".to_string(),
        offered_fee: Fee::from_wei(TIER_FEE),
    };
    assert!(matches!(
        h.orchestrator.submit(retry, &signer).await,
        Err(PortalError::DuplicateInFlight)
    ));
    assert_eq!(h.ledger.submitted().len(), 1);
}

// ============================================================================
// Uploads and the seat race
// ============================================================================

#[tokio::test]
async fn confirmed_upload_reserves_the_seat() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    let signer = Signer::new(owner.wallet.clone());

    let tx = h.submit(upload_action(&owner, 3, 2), &signer).await;
    h.confirm_and_tick(&tx).await;

    let cake = h.store.active_for_owner(owner.id).await.unwrap().unwrap();
    assert_eq!(cake.seat, Seat::new(3, 2).unwrap());
    assert_eq!(cake.tx_hash, Some(tx));
    assert!(h.store.seat_taken(Seat::new(3, 2).unwrap()).await.unwrap());
}

#[tokio::test]
async fn second_upload_while_first_in_flight_is_rejected() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    let signer = Signer::new(owner.wallet.clone());

    h.submit(upload_action(&owner, 3, 2), &signer).await;
    assert!(matches!(
        h.orchestrator.submit(upload_action(&owner, 4, 1), &signer).await,
        Err(PortalError::DuplicateInFlight)
    ));
}

#[tokio::test]
async fn seat_race_loser_resolves_commit_failed_not_overwrite() {
    let h = Harness::new();
    let first = h.seed_participant(1);
    let second = h.seed_participant(2);

    // Both submissions pass preconditions: neither cake is committed yet.
    let tx_first = h
        .submit(upload_action(&first, 5, 5), &Signer::new(first.wallet.clone()))
        .await;
    let tx_second = h
        .submit(upload_action(&second, 5, 5), &Signer::new(second.wallet.clone()))
        .await;

    h.confirm_and_tick(&tx_first).await;
    h.confirm_and_tick(&tx_second).await;

    // Winner holds the seat.
    let winner = h.store.active_for_owner(first.id).await.unwrap().unwrap();
    assert_eq!(winner.seat, Seat::new(5, 5).unwrap());
    assert!(h.store.active_for_owner(second.id).await.unwrap().is_none());

    // Loser is queryable, with the constraint violation as the reason.
    let report = h.status.status_by_hash(&tx_second).await.unwrap();
    assert_eq!(report.status, ActionStatus::CommitFailed);
    assert!(report.reason.unwrap().contains("Seat already taken"));

    let support_view = h.status.pending_for_participant(second.id).await.unwrap();
    assert_eq!(support_view.len(), 1);
    assert_eq!(support_view[0].status, ActionStatus::CommitFailed);
}

#[tokio::test]
async fn failed_upload_is_compensated_by_on_chain_withdrawal() {
    let h = Harness::new();
    let first = h.seed_participant(1);
    let second = h.seed_participant(2);
    let second_signer = Signer::new(second.wallet.clone());

    let tx_first = h
        .submit(upload_action(&first, 5, 5), &Signer::new(first.wallet.clone()))
        .await;
    let tx_second = h.submit(upload_action(&second, 5, 5), &second_signer).await;
    h.confirm_and_tick(&tx_first).await;
    h.confirm_and_tick(&tx_second).await;

    let withdrawal = h
        .orchestrator
        .compensate_failed_upload(&tx_second, &second_signer)
        .await
        .unwrap();
    assert!(h.ledger.submitted().contains(&withdrawal));
    assert_eq!(h.media.deleted(), vec![format!("s3://cakes/{}.png", second.id)]);

    // The audit row stays.
    let report = h.status.status_by_hash(&tx_second).await.unwrap();
    assert_eq!(report.status, ActionStatus::CommitFailed);
}

#[tokio::test]
async fn removal_releases_seat_and_media() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    let signer = Signer::new(owner.wallet.clone());
    let cake = h.seed_cake(&owner, 2, 2);

    let tx = h
        .submit(
            PortalAction::RemoveCake {
                participant: owner.id,
                cake_id: cake.id,
            },
            &signer,
        )
        .await;
    h.confirm_and_tick(&tx).await;

    assert!(h.store.active_for_owner(owner.id).await.unwrap().is_none());
    assert!(!h.store.seat_taken(cake.seat).await.unwrap());
    assert_eq!(h.media.deleted(), vec![cake.media_url]);
}

#[tokio::test]
async fn removal_commits_even_when_media_delete_fails() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    let signer = Signer::new(owner.wallet.clone());
    let cake = h.seed_cake(&owner, 2, 2);

    let tx = h
        .submit(
            PortalAction::RemoveCake {
                participant: owner.id,
                cake_id: cake.id,
            },
            &signer,
        )
        .await;
    h.media.fail_next();
    h.confirm_and_tick(&tx).await;

    // The domain write stands; the media delete is best-effort because
    // the consumed pending row leaves nothing to retry.
    assert!(h.store.active_for_owner(owner.id).await.unwrap().is_none());
    assert!(!h.store.seat_taken(cake.seat).await.unwrap());
    assert!(h.media.deleted().is_empty());
    assert!(
        PendingActionStore::find(&*h.store, &tx)
            .await
            .unwrap()
            .is_none()
    );
}

// ============================================================================
// Votes
// ============================================================================

#[tokio::test]
async fn duplicate_confirmation_of_a_vote_commits_once() {
    let h = Harness::new();
    let voter = h.seed_participant(1);
    let baker = h.seed_participant(2);
    let cake = h.seed_cake(&baker, 1, 1);
    h.seed_cake(&voter, 1, 2);
    h.seed_checked_in(&voter);

    let tx = h
        .submit(
            vote_action(&voter, &cake, Category::Beautiful),
            &Signer::new(voter.wallet.clone()),
        )
        .await;
    h.ledger.confirm(&tx);

    // At-least-once delivery: the same confirmation lands twice.
    assert_eq!(h.applier.apply_confirmed(&tx).await.unwrap(), ApplyOutcome::Applied);
    assert_eq!(h.applier.apply_confirmed(&tx).await.unwrap(), ApplyOutcome::Duplicate);
    assert_eq!(h.store.vote_count(), 1);

    let tally = h.store.tally(cake.id).await.unwrap();
    let beautiful = &tally.categories[0];
    assert_eq!(beautiful.category, Category::Beautiful);
    assert_eq!(beautiful.count, 1);
    assert_eq!(beautiful.voters, vec![voter.wallet]);
}

#[tokio::test]
async fn votes_require_presence_and_one_per_category() {
    let h = Harness::new();
    let voter = h.seed_participant(1);
    let baker = h.seed_participant(2);
    let cake = h.seed_cake(&baker, 1, 1);
    let signer = Signer::new(voter.wallet.clone());

    // Not checked in yet.
    assert!(matches!(
        h.orchestrator
            .submit(vote_action(&voter, &cake, Category::Beautiful), &signer)
            .await,
        Err(PortalError::NotCheckedIn)
    ));

    h.seed_cake(&voter, 1, 2);
    h.seed_checked_in(&voter);
    let tx = h
        .submit(vote_action(&voter, &cake, Category::Beautiful), &signer)
        .await;
    h.confirm_and_tick(&tx).await;

    assert!(matches!(
        h.orchestrator
            .submit(vote_action(&voter, &cake, Category::Beautiful), &signer)
            .await,
        Err(PortalError::AlreadyVoted(Category::Beautiful))
    ));
}

#[tokio::test]
async fn advisory_ledger_view_blocks_a_vote_the_store_missed() {
    let h = Harness::new();
    let voter = h.seed_participant(1);
    let baker = h.seed_participant(2);
    let cake = h.seed_cake(&baker, 1, 1);
    h.seed_cake(&voter, 1, 2);
    h.seed_checked_in(&voter);

    h.ledger.mark_voted(&voter.wallet, Category::Delicious);
    assert!(matches!(
        h.orchestrator
            .submit(
                vote_action(&voter, &cake, Category::Delicious),
                &Signer::new(voter.wallet.clone())
            )
            .await,
        Err(PortalError::AlreadyVoted(Category::Delicious))
    ));
}

#[tokio::test]
async fn advisory_read_outage_does_not_block_submission() {
    let h = Harness::new();
    let voter = h.seed_participant(1);
    let baker = h.seed_participant(2);
    let cake = h.seed_cake(&baker, 1, 1);
    h.seed_cake(&voter, 1, 2);
    h.seed_checked_in(&voter);
    let uploader = h.seed_participant(3);

    h.ledger.fail_advisory_reads();

    // The ledger view is advisory; the store's unique constraints still
    // decide at commit, so a node outage must not stall the portal.
    h.submit(
        vote_action(&voter, &cake, Category::Delicious),
        &Signer::new(voter.wallet.clone()),
    )
    .await;
    h.submit(
        upload_action(&uploader, 4, 4),
        &Signer::new(uploader.wallet.clone()),
    )
    .await;
    assert_eq!(h.ledger.submitted().len(), 2);
}

// ============================================================================
// Check-in lifecycle
// ============================================================================

#[tokio::test]
async fn check_in_requires_an_active_cake() {
    let h = Harness::new();
    let participant = h.seed_participant(1);
    let signer = Signer::new(participant.wallet.clone());

    assert!(matches!(
        h.orchestrator
            .submit(PortalAction::CheckIn { participant: participant.id }, &signer)
            .await,
        Err(PortalError::MissingCake)
    ));
}

#[tokio::test]
async fn check_in_whose_cake_vanished_resolves_commit_failed() {
    let h = Harness::new();
    let participant = h.seed_participant(1);
    let cake = h.seed_cake(&participant, 1, 1);

    let tx = h
        .submit(
            PortalAction::CheckIn {
                participant: participant.id,
            },
            &Signer::new(participant.wallet.clone()),
        )
        .await;

    // A removal confirming first takes the active cake out from under
    // the in-flight check-in.
    h.store.release(cake.id).await.unwrap();
    h.confirm_and_tick(&tx).await;

    let record = h.store.record_for(participant.id).await.unwrap();
    assert_eq!(record.state, CheckInState::None);

    let report = h.status.status_by_hash(&tx).await.unwrap();
    assert_eq!(report.status, ActionStatus::CommitFailed);
    assert!(report.reason.unwrap().contains("active cake"));
}

#[tokio::test]
async fn repeated_check_in_is_idempotent_and_submits_nothing() {
    let h = Harness::new();
    let participant = h.seed_participant(1);
    h.seed_cake(&participant, 1, 1);
    h.seed_checked_in(&participant);

    let outcome = h
        .orchestrator
        .submit(
            PortalAction::CheckIn { participant: participant.id },
            &Signer::new(participant.wallet.clone()),
        )
        .await
        .unwrap();
    assert_eq!(outcome, SubmitOutcome::AlreadyCheckedIn);
    assert!(h.ledger.submitted().is_empty());
}

#[tokio::test]
async fn incomplete_checkout_names_the_missing_category() {
    let h = Harness::new();
    let voter = h.seed_participant(1);
    let baker = h.seed_participant(2);
    let cake = h.seed_cake(&baker, 1, 1);
    h.seed_cake(&voter, 1, 2);
    h.seed_checked_in(&voter);
    let signer = Signer::new(voter.wallet.clone());

    let tx = h
        .submit(vote_action(&voter, &cake, Category::Beautiful), &signer)
        .await;
    h.confirm_and_tick(&tx).await;

    let err = h
        .orchestrator
        .submit(PortalAction::CheckOut { participant: voter.id }, &signer)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PortalError::IncompleteVoting {
            missing: vec![Category::Delicious]
        }
    );
    assert!(err.to_string().contains("delicious"));
}

#[tokio::test]
async fn full_lifecycle_ends_in_terminal_out() {
    let h = Harness::new();
    let voter = h.seed_participant(1);
    let baker = h.seed_participant(2);
    let cake = h.seed_cake(&baker, 1, 1);
    h.seed_cake(&voter, 1, 2);
    let signer = Signer::new(voter.wallet.clone());

    let check_in = h
        .submit(PortalAction::CheckIn { participant: voter.id }, &signer)
        .await;
    h.confirm_and_tick(&check_in).await;

    for category in Category::ALL {
        let tx = h.submit(vote_action(&voter, &cake, category), &signer).await;
        h.confirm_and_tick(&tx).await;
    }

    let check_out = h
        .submit(PortalAction::CheckOut { participant: voter.id }, &signer)
        .await;
    h.confirm_and_tick(&check_out).await;

    let record = h.store.record_for(voter.id).await.unwrap();
    assert_eq!(record.state, CheckInState::Out);
    assert_eq!(record.check_out_tx_hash, Some(check_out));

    // OUT is terminal; no way back in.
    assert!(matches!(
        h.orchestrator
            .submit(PortalAction::CheckIn { participant: voter.id }, &signer)
            .await,
        Err(PortalError::AlreadyCheckedOut)
    ));
}

// ============================================================================
// Reverts, timeouts, late confirmations
// ============================================================================

#[tokio::test]
async fn reverted_transaction_is_recorded_with_its_reason() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    let signer = Signer::new(owner.wallet.clone());

    let tx = h.submit(upload_action(&owner, 3, 2), &signer).await;
    h.ledger.revert(&tx, "out of gas");
    h.listener.tick().await.unwrap();

    let report = h.status.status_by_hash(&tx).await.unwrap();
    assert_eq!(report.status, ActionStatus::Reverted);
    assert_eq!(report.reason.as_deref(), Some("out of gas"));
    assert!(h.store.active_for_owner(owner.id).await.unwrap().is_none());
}

#[tokio::test]
async fn wallet_rejection_surfaces_synchronously() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    h.ledger.reject_next(LedgerError::InsufficientFunds);

    let err = h
        .orchestrator
        .submit(upload_action(&owner, 1, 1), &Signer::new(owner.wallet.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::LedgerRejected { .. }));
    assert!(h.status.pending_for_participant(owner.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unconfirmed_action_times_out_after_ttl() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    let signer = Signer::new(owner.wallet.clone());

    let tx = h.submit(upload_action(&owner, 3, 2), &signer).await;
    h.clock.advance(chrono::Duration::minutes(11));
    assert_eq!(h.listener.tick().await.unwrap(), 1);

    let report = h.status.status_by_hash(&tx).await.unwrap();
    assert_eq!(report.status, ActionStatus::TimedOut);

    // Timed-out rows leave the poll set; a second pass resolves nothing.
    assert_eq!(h.listener.tick().await.unwrap(), 0);
}

#[tokio::test]
async fn late_confirmation_of_a_timed_out_action_still_applies() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    let signer = Signer::new(owner.wallet.clone());

    let tx = h.submit(upload_action(&owner, 3, 2), &signer).await;
    h.clock.advance(chrono::Duration::minutes(11));
    h.listener.tick().await.unwrap();

    // The block arrives after the portal gave up. The fee already moved,
    // so the store catches up when support re-checks the hash.
    h.ledger.confirm(&tx);
    assert_eq!(
        h.listener.recheck(&tx).await.unwrap(),
        Some(ApplyOutcome::Applied)
    );
    assert!(h.store.active_for_owner(owner.id).await.unwrap().is_some());
}

#[tokio::test]
async fn await_resolution_bounds_the_wait() {
    let h = Harness::new();
    let owner = h.seed_participant(1);
    let signer = Signer::new(owner.wallet.clone());

    let tx = h.submit(upload_action(&owner, 3, 2), &signer).await;
    h.ledger.confirm(&tx);
    let status = h
        .listener
        .await_resolution(&tx, StdDuration::from_millis(250))
        .await
        .unwrap();
    assert_eq!(status, ActionStatus::Committed);

    let other = h.seed_participant(2);
    let tx = h
        .submit(upload_action(&other, 4, 4), &Signer::new(other.wallet.clone()))
        .await;
    // Never mined within the wait.
    assert!(matches!(
        h.listener.await_resolution(&tx, StdDuration::from_millis(20)).await,
        Err(PortalError::CommitTimeout)
    ));
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn vote_reset_deletes_only_the_targets_votes() {
    let h = Harness::new();
    let voter = h.seed_participant(1);
    let other = h.seed_participant(2);
    let baker = h.seed_participant(3);
    let cake = h.seed_cake(&baker, 1, 1);
    h.seed_cake(&voter, 1, 2);
    h.seed_cake(&other, 1, 3);
    h.seed_checked_in(&voter);
    h.seed_checked_in(&other);

    for (participant, category) in [
        (&voter, Category::Beautiful),
        (&voter, Category::Delicious),
        (&other, Category::Beautiful),
    ] {
        let tx = h
            .submit(
                vote_action(participant, &cake, category),
                &Signer::new(participant.wallet.clone()),
            )
            .await;
        h.confirm_and_tick(&tx).await;
    }

    assert_eq!(h.orchestrator.reset_votes(voter.id).await.unwrap(), 2);
    assert_eq!(h.store.vote_count(), 1);
    assert!(!h.store.has_voted(voter.id, Category::Beautiful).await.unwrap());
    assert!(h.store.has_voted(other.id, Category::Beautiful).await.unwrap());
}
