//! The ledger client seam.
//!
//! Wraps the already-deployed contract surface. Every write call is
//! fire-and-forget-then-await-receipt; the orchestrator never retries a
//! write (a resubmission would mint a second on-chain transaction and
//! double-spend the fee). Read views are advisory cross-checks only; the
//! relational store's unique constraints stay authoritative for off-chain
//! invariants.

use crate::types::{Category, Fee, Seat, TxHash, WalletAddress};
use async_trait::async_trait;

/// Ledger client result
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger client error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Wallet-side rejection (user declined, bad signature)
    WalletRejected {
        /// Rejection reason
        reason: String,
    },
    /// Offered value does not cover the fee
    InsufficientFunds,
    /// Contract reverted the call outright
    ContractReverted {
        /// Revert reason, if surfaced
        reason: String,
    },
    /// Node unreachable or call timed out
    Unavailable {
        /// Transport-level detail
        message: String,
    },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WalletRejected { reason } => write!(f, "Wallet rejected: {reason}"),
            Self::InsufficientFunds => write!(f, "Insufficient funds"),
            Self::ContractReverted { reason } => write!(f, "Contract reverted: {reason}"),
            Self::Unavailable { message } => write!(f, "Ledger unavailable: {message}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<LedgerError> for crate::error::PortalError {
    fn from(err: LedgerError) -> Self {
        Self::LedgerRejected {
            reason: err.to_string(),
        }
    }
}

/// A signer handle scoped to one action.
///
/// Passed explicitly into every submission; there is no ambient "current
/// wallet". The actual signing happens client-side; the portal only needs
/// the address for binding checks and read views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signer {
    /// Address the transaction will be signed with
    pub address: WalletAddress,
}

impl Signer {
    /// Create a signer handle for an address.
    #[must_use]
    pub const fn new(address: WalletAddress) -> Self {
        Self { address }
    }
}

/// Outcome of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerReceipt {
    /// Accepted as final by the ledger
    Confirmed,
    /// Mined but reverted
    Reverted {
        /// Revert reason, if surfaced
        reason: String,
    },
}

/// Client for the deployed event contract.
///
/// Write calls return the transaction hash as soon as the transaction is
/// accepted into the mempool; [`LedgerClient::receipt`] is polled until the
/// transaction is mined or the pending action's TTL elapses.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit the payable `register(category)` call.
    ///
    /// # Errors
    ///
    /// Returns error on wallet rejection, insufficient funds, or node
    /// failure; the transaction was not submitted in that case.
    async fn register(&self, signer: &Signer, tier: &str, fee: Fee) -> LedgerResult<TxHash>;

    /// Submit `uploadCake(title, description, mediaUrl, mediaType, table, seat, story)`.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction could not be submitted.
    #[allow(clippy::too_many_arguments)]
    async fn upload_cake(
        &self,
        signer: &Signer,
        title: &str,
        description: &str,
        media_url: &str,
        media_type: &str,
        seat: Seat,
        story: &str,
    ) -> LedgerResult<TxHash>;

    /// Submit `removeCake(cakeId)` for the signer's on-chain cake.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction could not be submitted.
    async fn remove_cake(&self, signer: &Signer, cake_ref: &str) -> LedgerResult<TxHash>;

    /// Submit `vote(cakeId, category)`.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction could not be submitted.
    async fn vote(&self, signer: &Signer, cake_ref: &str, category: Category) -> LedgerResult<TxHash>;

    /// Submit `checkIn()`.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction could not be submitted.
    async fn check_in(&self, signer: &Signer) -> LedgerResult<TxHash>;

    /// Submit `checkOut()`.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction could not be submitted.
    async fn check_out(&self, signer: &Signer) -> LedgerResult<TxHash>;

    /// Fetch the receipt for a submitted transaction.
    ///
    /// `None` means not yet mined. At-least-once semantics: the same
    /// receipt may be observed more than once.
    ///
    /// # Errors
    ///
    /// Returns error only on node failure; an unmined transaction is `Ok(None)`.
    async fn receipt(&self, tx_hash: &TxHash) -> LedgerResult<Option<LedgerReceipt>>;

    /// Advisory read view: `hasVotedInCategory(address, category)`.
    ///
    /// # Errors
    ///
    /// Returns error on node failure.
    async fn has_voted_in_category(
        &self,
        address: &WalletAddress,
        category: Category,
    ) -> LedgerResult<bool>;

    /// Advisory read view: `getUserCakes(address)`, on-chain cake refs.
    ///
    /// # Errors
    ///
    /// Returns error on node failure.
    async fn user_cakes(&self, address: &WalletAddress) -> LedgerResult<Vec<String>>;

    /// Advisory read view: `isSeatOccupied(table, seat)`.
    ///
    /// # Errors
    ///
    /// Returns error on node failure.
    async fn is_seat_occupied(&self, seat: Seat) -> LedgerResult<bool>;
}
