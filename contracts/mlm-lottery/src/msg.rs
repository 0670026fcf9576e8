use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Empty, Timestamp, Uint128};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{
    BonusParameters, CommissionTier, Config, CycleInfo, LotteryState, UserInfo, WinningTicket,
    CASCADE_LEVELS, PRIZE_TIERS,
};

#[cw_serde]
pub struct InstantiateMsg {
    pub bank: String,
    pub payment_token: String,
    pub ticket_registry: String,
    pub jackpot_pool: String,
    pub ticket_price: Uint128,
    pub tickets_per_cycle: u64,
    pub winning_amounts: [Uint128; PRIZE_TIERS],
    pub winning_ticket_counts: [u64; PRIZE_TIERS],
    pub cascade_percentages: [u64; CASCADE_LEVELS],
    /// Defaults to 5% below four tickets and 10% from four tickets on.
    pub commission_tiers: Option<Vec<CommissionTier>>,
    pub cycle_jackpot_contribution: Uint128,
    /// Defaults to 30 days.
    pub jackpot_interval_seconds: Option<u64>,
    pub bonus: BonusParameters,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Open ticket sales for a new cycle. Admin only.
    StartNewCycle {},
    /// Stop ticket sales before the cycle sells out. Admin only.
    CloseCycle {},
    /// Buy `count` tickets. `referrer_id` 0 means no referrer requested.
    BuyTickets { count: u64, referrer_id: u64 },
    /// Draw the winners of the closed cycle and pay them. Admin only.
    RewardWinners {},
    /// Pay the accumulated jackpot to one random registered user.
    /// Admin or admin-flagged addresses.
    ExecuteMonthlyJackpot {},
    /// Update addresses and sale parameters. Admin only.
    UpdateConfig {
        bank: Option<String>,
        payment_token: Option<String>,
        ticket_registry: Option<String>,
        jackpot_pool: Option<String>,
        ticket_price: Option<Uint128>,
        tickets_per_cycle: Option<u64>,
        cycle_jackpot_contribution: Option<Uint128>,
        jackpot_interval_seconds: Option<u64>,
    },
    /// Update prize amounts and winning ticket counts. Admin only.
    UpdatePrizeTiers {
        winning_amounts: Option<[Uint128; PRIZE_TIERS]>,
        winning_ticket_counts: Option<[u64; PRIZE_TIERS]>,
    },
    /// Update the prize cascade and purchase commission. Admin only.
    UpdateReferralRewards {
        cascade_percentages: Option<[u64; CASCADE_LEVELS]>,
        commission_tiers: Option<Vec<CommissionTier>>,
    },
    /// Replace the bonus parameters. Admin only.
    UpdateBonusParameters { bonus: BonusParameters },
    /// Flag or unflag an address as jackpot operator. Admin only.
    SetAdminStatus { address: String, status: bool },
}

#[cw_serde]
pub struct MigrateMsg {}

/// Grouped update of the sale parameters, built from `ExecuteMsg::UpdateConfig`.
pub struct UpdateConfigParams {
    pub bank: Option<String>,
    pub payment_token: Option<String>,
    pub ticket_registry: Option<String>,
    pub jackpot_pool: Option<String>,
    pub ticket_price: Option<Uint128>,
    pub tickets_per_cycle: Option<u64>,
    pub cycle_jackpot_contribution: Option<Uint128>,
    pub jackpot_interval_seconds: Option<u64>,
}

/// Execute messages of the cw20 payment token used by this contract.
#[cw_serde]
pub enum TokenExecuteMsg {
    TransferFrom {
        owner: String,
        recipient: String,
        amount: Uint128,
    },
}

/// Query messages of the cw20 payment token used by this contract.
#[cw_serde]
pub enum TokenQueryMsg {
    Allowance { owner: String, spender: String },
}

/// Mirrors the cw20 allowance response. The expiration is not needed here
/// and is ignored when present.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AllowanceResponse {
    pub allowance: Uint128,
}

/// Execute messages of the cw721 ticket registry used by this contract.
#[cw_serde]
pub enum TicketExecuteMsg {
    Mint {
        token_id: String,
        owner: String,
        token_uri: Option<String>,
        extension: Empty,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(Config)]
    Config {},
    #[returns(LotteryState)]
    State {},
    #[returns(CycleInfo)]
    Cycle { cycle: u64 },
    #[returns(CycleHistoryResponse)]
    CycleHistory {
        start_after: Option<u64>,
        limit: Option<u32>,
    },
    #[returns(Vec<WinningTicket>)]
    WinningTickets { cycle: u64 },
    #[returns(Option<UserInfo>)]
    UserInfo { address: String },
    #[returns(Option<Addr>)]
    UserById { id: u64 },
    #[returns(TicketOwnerResponse)]
    TicketOwner { ticket: u64 },
    #[returns(Option<Addr>)]
    Referrer { address: String },
    #[returns(Vec<Addr>)]
    Ancestors { address: String },
    #[returns(bool)]
    IsAdmin { address: String },
    #[returns(JackpotResponse)]
    Jackpot {},
}

#[cw_serde]
pub struct CycleHistoryResponse {
    pub cycles: Vec<CycleInfo>,
}

#[cw_serde]
pub struct TicketOwnerResponse {
    pub ticket: u64,
    pub owner: Addr,
    pub cycle: u64,
}

#[cw_serde]
pub struct JackpotResponse {
    pub amount: Uint128,
    pub last_execution: Timestamp,
    pub next_execution: Timestamp,
    pub executions: u64,
    pub last_winner: Option<Addr>,
}
