use cosmwasm_std::{to_json_binary, Binary, Deps, Order, StdError, StdResult};
use cw_storage_plus::Bound;

use crate::msg::{CycleHistoryResponse, JackpotResponse, TicketOwnerResponse};
use crate::referral::{ancestors, MAX_REFERRAL_DEPTH};
use crate::state::{
    ticket_owner, ADMINS, CONFIG, CYCLES, JACKPOT, LOTTERY_STATE, USERS, USER_IDS,
};

pub fn query_config(deps: Deps) -> StdResult<Binary> {
    let config = CONFIG.load(deps.storage)?;
    to_json_binary(&config)
}

pub fn query_state(deps: Deps) -> StdResult<Binary> {
    let state = LOTTERY_STATE.load(deps.storage)?;
    to_json_binary(&state)
}

pub fn query_cycle(deps: Deps, cycle: u64) -> StdResult<Binary> {
    let cycle = CYCLES.load(deps.storage, cycle)?;
    to_json_binary(&cycle)
}

pub fn query_cycle_history(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<Binary> {
    let limit = limit.unwrap_or(20).min(100) as usize;
    let start = start_after.map(Bound::exclusive);

    let cycles: Vec<_> = CYCLES
        .range(deps.storage, start, None, Order::Ascending)
        .take(limit)
        .filter_map(|r| r.ok())
        .map(|(_, cycle)| cycle)
        .collect();

    to_json_binary(&CycleHistoryResponse { cycles })
}

pub fn query_winning_tickets(deps: Deps, cycle: u64) -> StdResult<Binary> {
    let cycle = CYCLES.load(deps.storage, cycle)?;
    to_json_binary(&cycle.winning_tickets)
}

/// Per-cycle counters are reset lazily on the next purchase, so a user who
/// has not bought in the current cycle is reported with zeroed cycle fields.
pub fn query_user_info(deps: Deps, address: String) -> StdResult<Binary> {
    let addr = deps.api.addr_validate(&address)?;
    let state = LOTTERY_STATE.load(deps.storage)?;

    let user = USERS.may_load(deps.storage, &addr)?.map(|mut user| {
        if user.last_active_cycle != state.current_cycle {
            user.cycle_tickets = 0;
            user.cycle_ranges.clear();
        }
        user
    });

    to_json_binary(&user)
}

pub fn query_user_by_id(deps: Deps, id: u64) -> StdResult<Binary> {
    let addr = USER_IDS.may_load(deps.storage, id)?;
    to_json_binary(&addr)
}

pub fn query_ticket_owner(deps: Deps, ticket: u64) -> StdResult<Binary> {
    let ownership = ticket_owner(deps.storage, ticket)?
        .ok_or_else(|| StdError::not_found(format!("ticket {}", ticket)))?;

    to_json_binary(&TicketOwnerResponse {
        ticket,
        owner: ownership.owner,
        cycle: ownership.cycle,
    })
}

pub fn query_referrer(deps: Deps, address: String) -> StdResult<Binary> {
    let addr = deps.api.addr_validate(&address)?;
    let referrer = USERS
        .may_load(deps.storage, &addr)?
        .and_then(|user| user.referrer);
    to_json_binary(&referrer)
}

pub fn query_ancestors(deps: Deps, address: String) -> StdResult<Binary> {
    let addr = deps.api.addr_validate(&address)?;
    let config = CONFIG.load(deps.storage)?;
    let chain = ancestors(deps.storage, &config.admin, &addr, MAX_REFERRAL_DEPTH)?;
    to_json_binary(&chain)
}

pub fn query_is_admin(deps: Deps, address: String) -> StdResult<Binary> {
    let addr = deps.api.addr_validate(&address)?;
    let config = CONFIG.load(deps.storage)?;
    let flagged = ADMINS.may_load(deps.storage, &addr)?.unwrap_or(false);
    to_json_binary(&(addr == config.admin || flagged))
}

pub fn query_jackpot(deps: Deps) -> StdResult<Binary> {
    let config = CONFIG.load(deps.storage)?;
    let jackpot = JACKPOT.load(deps.storage)?;

    to_json_binary(&JackpotResponse {
        amount: jackpot.amount,
        last_execution: jackpot.last_execution,
        next_execution: jackpot
            .last_execution
            .plus_seconds(config.jackpot_interval_seconds),
        executions: jackpot.executions,
        last_winner: jackpot.last_winner,
    })
}
