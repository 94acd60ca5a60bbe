//! Scriptable mock ledger client.
//!
//! Write calls hand out deterministic transaction hashes; tests then drive
//! the confirmation side explicitly with [`MockLedgerClient::confirm`] and
//! [`MockLedgerClient::revert`], including delivering the same receipt more
//! than once to exercise at-least-once handling.

use async_trait::async_trait;
use cakepicnic_core::ledger::{LedgerClient, LedgerError, LedgerReceipt, LedgerResult, Signer};
use cakepicnic_core::types::{Category, Fee, Seat, TxHash, WalletAddress};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct LedgerState {
    next_nonce: u64,
    receipts: HashMap<TxHash, LedgerReceipt>,
    rejections: VecDeque<LedgerError>,
    occupied_seats: HashSet<(i16, i16)>,
    voted: HashSet<(String, Category)>,
    user_cakes: HashMap<String, Vec<String>>,
    submitted: Vec<TxHash>,
    advisory_down: bool,
}

/// Mock ledger client for orchestrator tests.
#[derive(Clone, Default)]
pub struct MockLedgerClient {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedgerClient {
    /// Create a mock with no mined transactions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|_| LedgerError::Unavailable {
            message: "ledger mutex poisoned".to_string(),
        })
    }

    fn submit(&self) -> LedgerResult<TxHash> {
        let mut state = self.lock()?;
        if let Some(err) = state.rejections.pop_front() {
            return Err(err);
        }
        state.next_nonce += 1;
        let hash = Self::hash_for_nonce(state.next_nonce);
        state.submitted.push(hash.clone());
        Ok(hash)
    }

    /// The deterministic hash handed out for the nth submission (1-based).
    ///
    /// # Panics
    ///
    /// Never panics; the generated string is always a valid hash.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn hash_for_nonce(nonce: u64) -> TxHash {
        TxHash::parse(&format!("0x{nonce:064x}")).unwrap()
    }

    /// Script the next write call to fail before submission.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn reject_next(&self, err: LedgerError) {
        self.state.lock().unwrap().rejections.push_back(err);
    }

    /// Mark a transaction as mined and confirmed.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn confirm(&self, tx_hash: &TxHash) {
        self.state
            .lock()
            .unwrap()
            .receipts
            .insert(tx_hash.clone(), LedgerReceipt::Confirmed);
    }

    /// Mark a transaction as mined but reverted.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn revert(&self, tx_hash: &TxHash, reason: &str) {
        self.state.lock().unwrap().receipts.insert(
            tx_hash.clone(),
            LedgerReceipt::Reverted {
                reason: reason.to_string(),
            },
        );
    }

    /// Script the advisory seat view.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn occupy_seat(&self, seat: Seat) {
        self.state
            .lock()
            .unwrap()
            .occupied_seats
            .insert((seat.table, seat.seat));
    }

    /// Script the advisory voted view.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn mark_voted(&self, address: &WalletAddress, category: Category) {
        self.state
            .lock()
            .unwrap()
            .voted
            .insert((address.as_str().to_string(), category));
    }

    /// Make every advisory read view fail with `Unavailable`, simulating a
    /// node outage while writes still go through.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn fail_advisory_reads(&self) {
        self.state.lock().unwrap().advisory_down = true;
    }

    fn advisory<T>(state: &MutexGuard<'_, LedgerState>, value: T) -> LedgerResult<T> {
        if state.advisory_down {
            return Err(LedgerError::Unavailable {
                message: "read view unavailable".to_string(),
            });
        }
        Ok(value)
    }

    /// Hashes of every transaction submitted so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn submitted(&self) -> Vec<TxHash> {
        self.state.lock().unwrap().submitted.clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn register(&self, _signer: &Signer, _tier: &str, _fee: Fee) -> LedgerResult<TxHash> {
        self.submit()
    }

    async fn upload_cake(
        &self,
        _signer: &Signer,
        _title: &str,
        _description: &str,
        _media_url: &str,
        _media_type: &str,
        _seat: Seat,
        _story: &str,
    ) -> LedgerResult<TxHash> {
        self.submit()
    }

    async fn remove_cake(&self, _signer: &Signer, _cake_ref: &str) -> LedgerResult<TxHash> {
        self.submit()
    }

    async fn vote(
        &self,
        _signer: &Signer,
        _cake_ref: &str,
        _category: Category,
    ) -> LedgerResult<TxHash> {
        self.submit()
    }

    async fn check_in(&self, _signer: &Signer) -> LedgerResult<TxHash> {
        self.submit()
    }

    async fn check_out(&self, _signer: &Signer) -> LedgerResult<TxHash> {
        self.submit()
    }

    async fn receipt(&self, tx_hash: &TxHash) -> LedgerResult<Option<LedgerReceipt>> {
        Ok(self.lock()?.receipts.get(tx_hash).cloned())
    }

    async fn has_voted_in_category(
        &self,
        address: &WalletAddress,
        category: Category,
    ) -> LedgerResult<bool> {
        let state = self.lock()?;
        let voted = state.voted.contains(&(address.as_str().to_string(), category));
        Self::advisory(&state, voted)
    }

    async fn user_cakes(&self, address: &WalletAddress) -> LedgerResult<Vec<String>> {
        let state = self.lock()?;
        let cakes = state
            .user_cakes
            .get(address.as_str())
            .cloned()
            .unwrap_or_default();
        Self::advisory(&state, cakes)
    }

    async fn is_seat_occupied(&self, seat: Seat) -> LedgerResult<bool> {
        let state = self.lock()?;
        let occupied = state.occupied_seats.contains(&(seat.table, seat.seat));
        Self::advisory(&state, occupied)
    }
}
