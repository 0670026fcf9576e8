use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Order, StdResult, Storage, Timestamp, Uint128};
use cw_storage_plus::{Bound, Item, Map};
use mlm_lottery_common::types::{CycleStatus, TicketRange};

pub const CONFIG: Item<Config> = Item::new("config");
pub const LOTTERY_STATE: Item<LotteryState> = Item::new("lottery_state");
pub const CYCLES: Map<u64, CycleInfo> = Map::new("cycles");
pub const JACKPOT: Item<JackpotState> = Item::new("jackpot");

/// Per-user account, keyed by address. The administrator is stored too (id 0).
pub const USERS: Map<&Addr, UserInfo> = Map::new("users");
/// Stable user id -> address. Ids are handed out on first purchase.
pub const USER_IDS: Map<u64, Addr> = Map::new("user_ids");
/// Ticket ranges keyed by their first ticket number. Ranges never overlap,
/// so the owner of ticket `t` is the last range starting at or before `t`.
pub const TICKET_RANGES: Map<u64, TicketOwnership> = Map::new("ticket_ranges");
/// Addresses allowed to trigger the monthly jackpot besides the administrator.
pub const ADMINS: Map<&Addr, bool> = Map::new("admins");

pub const PRIZE_TIERS: usize = 4;
pub const CASCADE_LEVELS: usize = 3;

#[cw_serde]
pub struct Config {
    pub admin: Addr,
    /// Account that receives ticket proceeds and funds every payout
    pub bank: Addr,
    /// cw20 stable coin used for purchases and payouts
    pub payment_token: Addr,
    /// cw721 contract minting one NFT per ticket
    pub ticket_registry: Addr,
    /// Account holding the monthly jackpot funds
    pub jackpot_pool: Addr,
    pub ticket_price: Uint128,
    pub tickets_per_cycle: u64,
    /// Prize per winning ticket, by tier
    pub winning_amounts: [Uint128; PRIZE_TIERS],
    /// Number of winning tickets per tier
    pub winning_ticket_counts: [u64; PRIZE_TIERS],
    /// Share of a prize paid to each ancestor level, in percent
    pub cascade_percentages: [u64; CASCADE_LEVELS],
    /// Direct referrer commission on purchases, sorted by `min_tickets`
    pub commission_tiers: Vec<CommissionTier>,
    /// Added to the jackpot on every reward distribution. The jackpot pool
    /// account holds the funds and pays the monthly winner directly.
    pub cycle_jackpot_contribution: Uint128,
    pub jackpot_interval_seconds: u64,
    pub bonus: BonusParameters,
}

#[cw_serde]
pub struct CommissionTier {
    pub min_tickets: u64,
    pub percent: u64,
}

#[cw_serde]
pub struct BonusParameters {
    /// Flat bonus to the direct referrer of a qualifying purchase
    pub direct_referral_bonus: Uint128,
    /// Flat bonus to the referrer's referrer of a qualifying purchase
    pub second_level_bonus: Uint128,
    /// Paid when a user wins in `streak_threshold` consecutive cycles
    pub streak_bonus: Uint128,
    /// Deducted from the price of a qualifying first purchase
    pub first_purchase_discount: Uint128,
    pub direct_referral_bonus_min_tickets: u64,
    pub second_level_bonus_min_tickets: u64,
    pub streak_threshold: u64,
    pub first_purchase_min_tickets: u64,
}

#[cw_serde]
pub struct LotteryState {
    pub current_cycle: u64,
    pub status: CycleStatus,
    /// Number the next sold ticket receives. Never reset.
    pub next_ticket: u64,
    /// Registered users including the administrator
    pub users_count: u64,
    pub total_tickets_sold: u64,
    pub total_rewards_distributed: Uint128,
}

#[cw_serde]
pub struct CycleInfo {
    pub id: u64,
    pub started_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    pub rewarded_at: Option<Timestamp>,
    /// First ticket number sold in this cycle
    pub first_ticket: u64,
    /// `tickets_per_cycle` when the cycle started
    pub ticket_cap: u64,
    pub tickets_sold: u64,
    pub winning_tickets: Vec<WinningTicket>,
    /// Prizes, cascades and streak bonuses paid for this cycle
    pub total_paid: Uint128,
}

#[cw_serde]
pub struct WinningTicket {
    pub ticket: u64,
    pub tier: u8,
    pub winner: Addr,
    pub amount: Uint128,
}

#[cw_serde]
pub struct UserInfo {
    pub id: u64,
    /// `None` only for the administrator, the root of the referral forest
    pub referrer: Option<Addr>,
    pub cycle_tickets: u64,
    pub total_tickets: u64,
    pub last_active_cycle: u64,
    pub last_winning_cycle: u64,
    pub win_streak: u64,
    /// Users who named this user as referrer
    pub referrals_count: u64,
    /// Tickets bought by direct referrals
    pub referral_tickets: u64,
    /// Ranges bought during `last_active_cycle`
    pub cycle_ranges: Vec<TicketRange>,
    pub total_won: Uint128,
}

impl UserInfo {
    pub fn new(id: u64, referrer: Option<Addr>) -> Self {
        UserInfo {
            id,
            referrer,
            cycle_tickets: 0,
            total_tickets: 0,
            last_active_cycle: 0,
            last_winning_cycle: 0,
            win_streak: 0,
            referrals_count: 0,
            referral_tickets: 0,
            cycle_ranges: vec![],
            total_won: Uint128::zero(),
        }
    }
}

#[cw_serde]
pub struct TicketOwnership {
    pub owner: Addr,
    pub cycle: u64,
    /// Last ticket of the range (inclusive)
    pub end: u64,
}

#[cw_serde]
pub struct JackpotState {
    pub amount: Uint128,
    pub last_execution: Timestamp,
    pub executions: u64,
    pub last_winner: Option<Addr>,
}

/// Resolve the range holding `ticket`, if it was ever sold.
pub fn ticket_owner(storage: &dyn Storage, ticket: u64) -> StdResult<Option<TicketOwnership>> {
    let found = TICKET_RANGES
        .range(
            storage,
            None,
            Some(Bound::inclusive(ticket)),
            Order::Descending,
        )
        .next()
        .transpose()?;

    Ok(found.and_then(|(_, ownership)| (ticket <= ownership.end).then_some(ownership)))
}
