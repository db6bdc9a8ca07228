//! Domain failure taxonomy
//!
//! Every failure a command can produce is an expected outcome: it is caught
//! at the dispatcher boundary and rendered as the response line. The
//! connection stays open. Transport failures are handled in the server and
//! never appear here.

use thiserror::Error;

use crate::price_source::PriceSourceError;

#[derive(Debug, Error, PartialEq)]
pub enum WalletError {
    /// Unknown verb (or empty line). Distinct from argument-shape failures.
    #[error("This request is invalid, please check the help menu")]
    UnknownCommand,

    /// Wrong argument count, blank argument, or unparseable number.
    /// Resolved entirely in the dispatcher - never reaches the ledger.
    #[error("User's input is invalid, check the help menu")]
    InvalidInput,

    #[error("Deposited amount of money must be positive")]
    NonPositiveDeposit,

    #[error("User is not currently logged in")]
    NotLoggedIn,

    #[error("User with this name already exists")]
    DuplicateUser,

    /// Unknown username and wrong password deliberately collapse into the
    /// same failure so the response does not leak which part was wrong.
    #[error("Invalid username or password")]
    AuthenticationFailure,

    #[error("You don't have enough money")]
    InsufficientFunds,

    #[error("This cryptocurrency is not currently offered")]
    UnknownAsset,

    #[error("You can't sell cryptocurrency that you haven't bought")]
    InvalidSale,

    /// Propagated from the price source; fails the triggering request only.
    #[error(transparent)]
    PriceSource(#[from] PriceSourceError),
}
