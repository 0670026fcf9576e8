use cosmwasm_std::{
    entry_point, Binary, Deps, DepsMut, Env, MessageInfo, Response, StdResult, Uint128,
};
use cw2::{get_contract_version, set_contract_version};
use mlm_lottery_common::types::CycleStatus;

use crate::error::ContractError;
use crate::execute;
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg, UpdateConfigParams};
use crate::query;
use crate::state::{
    Config, JackpotState, LotteryState, UserInfo, CONFIG, JACKPOT, LOTTERY_STATE, USERS,
    USER_IDS,
};

const CONTRACT_NAME: &str = "crates.io:mlm-lottery";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User id reserved for the administrator.
const ADMIN_USER_ID: u64 = 0;

#[entry_point]
pub fn instantiate(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let commission_tiers = msg
        .commission_tiers
        .unwrap_or_else(execute::default_commission_tiers);
    execute::validate_cascade_percentages(&msg.cascade_percentages)?;
    execute::validate_commission_tiers(&commission_tiers)?;
    execute::winning_ticket_total(&msg.winning_ticket_counts)?;

    let config = Config {
        admin: info.sender.clone(),
        bank: deps.api.addr_validate(&msg.bank)?,
        payment_token: deps.api.addr_validate(&msg.payment_token)?,
        ticket_registry: deps.api.addr_validate(&msg.ticket_registry)?,
        jackpot_pool: deps.api.addr_validate(&msg.jackpot_pool)?,
        ticket_price: msg.ticket_price,
        tickets_per_cycle: msg.tickets_per_cycle,
        winning_amounts: msg.winning_amounts,
        winning_ticket_counts: msg.winning_ticket_counts,
        cascade_percentages: msg.cascade_percentages,
        commission_tiers,
        cycle_jackpot_contribution: msg.cycle_jackpot_contribution,
        jackpot_interval_seconds: msg
            .jackpot_interval_seconds
            .unwrap_or(execute::DEFAULT_JACKPOT_INTERVAL_SECS),
        bonus: msg.bonus,
    };
    execute::validate_sale_params(&config)?;
    CONFIG.save(deps.storage, &config)?;

    // The administrator is the root of the referral forest
    USER_IDS.save(deps.storage, ADMIN_USER_ID, &info.sender)?;
    USERS.save(
        deps.storage,
        &info.sender,
        &UserInfo::new(ADMIN_USER_ID, None),
    )?;

    let state = LotteryState {
        current_cycle: 0,
        status: CycleStatus::Idle,
        next_ticket: 1,
        users_count: 1,
        total_tickets_sold: 0,
        total_rewards_distributed: Uint128::zero(),
    };
    LOTTERY_STATE.save(deps.storage, &state)?;

    JACKPOT.save(
        deps.storage,
        &JackpotState {
            amount: Uint128::zero(),
            last_execution: env.block.time,
            executions: 0,
            last_winner: None,
        },
    )?;

    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("contract", "mlm-lottery")
        .add_attribute("admin", info.sender.to_string()))
}

#[entry_point]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::StartNewCycle {} => execute::start_new_cycle(deps, env, info),
        ExecuteMsg::CloseCycle {} => execute::close_cycle(deps, env, info),
        ExecuteMsg::BuyTickets { count, referrer_id } => {
            execute::buy_tickets(deps, env, info, count, referrer_id)
        }
        ExecuteMsg::RewardWinners {} => execute::reward_winners(deps, env, info),
        ExecuteMsg::ExecuteMonthlyJackpot {} => execute::execute_monthly_jackpot(deps, env, info),
        ExecuteMsg::UpdateConfig {
            bank,
            payment_token,
            ticket_registry,
            jackpot_pool,
            ticket_price,
            tickets_per_cycle,
            cycle_jackpot_contribution,
            jackpot_interval_seconds,
        } => execute::update_config(
            deps,
            env,
            info,
            UpdateConfigParams {
                bank,
                payment_token,
                ticket_registry,
                jackpot_pool,
                ticket_price,
                tickets_per_cycle,
                cycle_jackpot_contribution,
                jackpot_interval_seconds,
            },
        ),
        ExecuteMsg::UpdatePrizeTiers {
            winning_amounts,
            winning_ticket_counts,
        } => execute::update_prize_tiers(deps, info, winning_amounts, winning_ticket_counts),
        ExecuteMsg::UpdateReferralRewards {
            cascade_percentages,
            commission_tiers,
        } => execute::update_referral_rewards(deps, info, cascade_percentages, commission_tiers),
        ExecuteMsg::UpdateBonusParameters { bonus } => {
            execute::update_bonus_parameters(deps, info, bonus)
        }
        ExecuteMsg::SetAdminStatus { address, status } => {
            execute::set_admin_status(deps, info, address, status)
        }
    }
}

#[entry_point]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => query::query_config(deps),
        QueryMsg::State {} => query::query_state(deps),
        QueryMsg::Cycle { cycle } => query::query_cycle(deps, cycle),
        QueryMsg::CycleHistory { start_after, limit } => {
            query::query_cycle_history(deps, start_after, limit)
        }
        QueryMsg::WinningTickets { cycle } => query::query_winning_tickets(deps, cycle),
        QueryMsg::UserInfo { address } => query::query_user_info(deps, address),
        QueryMsg::UserById { id } => query::query_user_by_id(deps, id),
        QueryMsg::TicketOwner { ticket } => query::query_ticket_owner(deps, ticket),
        QueryMsg::Referrer { address } => query::query_referrer(deps, address),
        QueryMsg::Ancestors { address } => query::query_ancestors(deps, address),
        QueryMsg::IsAdmin { address } => query::query_is_admin(deps, address),
        QueryMsg::Jackpot {} => query::query_jackpot(deps),
    }
}

#[entry_point]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    let stored = get_contract_version(deps.storage)?;
    if stored.contract != CONTRACT_NAME {
        return Err(ContractError::Unauthorized {
            reason: "Cannot migrate from different contract type".to_string(),
        });
    }

    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    Ok(Response::new()
        .add_attribute("action", "migrate")
        .add_attribute("from_version", stored.version)
        .add_attribute("to_version", CONTRACT_VERSION))
}
