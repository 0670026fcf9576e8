use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("ticket sales are closed")]
    CycleClosed,

    #[error("cycle {cycle} is still open for sales")]
    CycleStillOpen { cycle: u64 },

    #[error("cycle {cycle} is closed but has not been rewarded yet")]
    RewardsPending { cycle: u64 },

    #[error("no closed cycle is waiting for a draw")]
    NoPendingDraw,

    #[error("count of tickets can not be 0")]
    ZeroCount,

    #[error("requested {requested} tickets but only {available} are left in this cycle")]
    SoldOut { requested: u64, available: u64 },

    #[error("insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: Uint128, available: Uint128 },

    #[error("referrer is already set to another user")]
    ReferrerConflict,

    #[error("invalid referrer: {reason}")]
    InvalidReferrer { reason: String },

    #[error("monthly jackpot can not run before {next_execution}")]
    TooEarly { next_execution: u64 },

    #[error("no registered participants for the jackpot")]
    NoParticipants,

    #[error("ticket {ticket} has no owner")]
    TicketNotFound { ticket: u64 },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("invalid percentage: {field} = {value} (must be <= 100)")]
    InvalidPercentage { field: String, value: u64 },
}
