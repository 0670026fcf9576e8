use cosmwasm_std::{
    to_json_binary, Addr, CosmosMsg, DepsMut, Empty, Env, Event, MessageInfo, QuerierWrapper,
    Response, Storage, Uint128, WasmMsg,
};
use mlm_lottery_common::draw::{
    draw_seed, draw_without_replacement, jackpot_seed, seed_to_u128, tier_for_index,
};
use mlm_lottery_common::types::{CycleStatus, TicketRange};

use crate::error::ContractError;
use crate::msg::{
    AllowanceResponse, TicketExecuteMsg, TokenExecuteMsg, TokenQueryMsg, UpdateConfigParams,
};
use crate::referral::{ancestors, payable_referrer, resolve_referrer, MAX_REFERRAL_DEPTH};
use crate::state::{
    ticket_owner, BonusParameters, CommissionTier, Config, CycleInfo, TicketOwnership, UserInfo,
    WinningTicket, ADMINS, CASCADE_LEVELS, CONFIG, CYCLES, JACKPOT, LOTTERY_STATE, PRIZE_TIERS,
    TICKET_RANGES, USERS, USER_IDS,
};

/// 30 days in seconds between monthly jackpot executions
pub const DEFAULT_JACKPOT_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

/// 5% for one to three tickets, 10% from four tickets on
pub fn default_commission_tiers() -> Vec<CommissionTier> {
    vec![
        CommissionTier {
            min_tickets: 1,
            percent: 5,
        },
        CommissionTier {
            min_tickets: 4,
            percent: 10,
        },
    ]
}

/// Open ticket sales for the next cycle. Admin only.
pub fn start_new_cycle(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized {
            reason: "only admin can start a cycle".to_string(),
        });
    }

    let mut state = LOTTERY_STATE.load(deps.storage)?;
    match state.status {
        CycleStatus::Open => {
            return Err(ContractError::CycleStillOpen {
                cycle: state.current_cycle,
            })
        }
        CycleStatus::Closed => {
            return Err(ContractError::RewardsPending {
                cycle: state.current_cycle,
            })
        }
        CycleStatus::Idle => {}
    }

    state.current_cycle += 1;
    state.status = CycleStatus::Open;

    let cycle = CycleInfo {
        id: state.current_cycle,
        started_at: env.block.time,
        closed_at: None,
        rewarded_at: None,
        first_ticket: state.next_ticket,
        ticket_cap: config.tickets_per_cycle,
        tickets_sold: 0,
        winning_tickets: vec![],
        total_paid: Uint128::zero(),
    };
    CYCLES.save(deps.storage, cycle.id, &cycle)?;
    LOTTERY_STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_attribute("action", "start_new_cycle")
        .add_attribute("cycle", cycle.id.to_string())
        .add_attribute("status", state.status.as_str())
        .add_event(
            Event::new("mlm_cycle_started")
                .add_attribute("admin", info.sender.to_string())
                .add_attribute("cycle", cycle.id.to_string())
                .add_attribute("timestamp", env.block.time.seconds().to_string())
                .add_attribute("first_ticket", cycle.first_ticket.to_string()),
        ))
}

/// Stop ticket sales before the cycle sells out. Admin only.
pub fn close_cycle(deps: DepsMut, env: Env, info: MessageInfo) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized {
            reason: "only admin can close a cycle".to_string(),
        });
    }

    let mut state = LOTTERY_STATE.load(deps.storage)?;
    if state.status != CycleStatus::Open {
        return Err(ContractError::CycleClosed);
    }

    let mut cycle = CYCLES.load(deps.storage, state.current_cycle)?;
    cycle.closed_at = Some(env.block.time);
    state.status = CycleStatus::Closed;
    CYCLES.save(deps.storage, cycle.id, &cycle)?;
    LOTTERY_STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_attribute("action", "close_cycle")
        .add_attribute("cycle", cycle.id.to_string())
        .add_attribute("status", state.status.as_str())
        .add_event(cycle_closed_event(&cycle, "admin")))
}

/// Buy `count` tickets in the open cycle.
///
/// The buyer pays `price * count` (less a qualifying first purchase discount)
/// into the bank; the bank then pays the direct referrer's commission and any
/// referral bonus. Tickets are numbered contiguously and minted one NFT each.
pub fn buy_tickets(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    count: u64,
    referrer_id: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut state = LOTTERY_STATE.load(deps.storage)?;

    if state.status != CycleStatus::Open {
        return Err(ContractError::CycleClosed);
    }
    if count == 0 {
        return Err(ContractError::ZeroCount);
    }

    let mut cycle = CYCLES.load(deps.storage, state.current_cycle)?;
    let available = cycle.ticket_cap.saturating_sub(cycle.tickets_sold);
    if count > available {
        return Err(ContractError::SoldOut {
            requested: count,
            available,
        });
    }

    let total_price = config.ticket_price.checked_mul(Uint128::from(count))?;
    let allowance = query_allowance(
        deps.querier,
        &config.payment_token,
        &info.sender,
        &env.contract.address,
    )?;
    if allowance < total_price {
        return Err(ContractError::InsufficientAllowance {
            needed: total_price,
            available: allowance,
        });
    }

    // Referral attribution
    let existing = USERS.may_load(deps.storage, &info.sender)?;
    let referrer = resolve_referrer(
        deps.storage,
        &config.admin,
        &info.sender,
        existing.as_ref(),
        referrer_id,
    )?;
    let is_new_user = existing.is_none();
    let mut user = match existing {
        Some(user) => user,
        None => {
            let id = state.users_count;
            state.users_count += 1;
            USER_IDS.save(deps.storage, id, &info.sender)?;
            UserInfo::new(id, referrer.clone())
        }
    };
    let first_purchase = user.total_tickets == 0;

    // Ticket allocation
    let range = TicketRange {
        start: state.next_ticket,
        end: state.next_ticket + count - 1,
    };
    state.next_ticket += count;
    state.total_tickets_sold += count;
    cycle.tickets_sold += count;

    if user.last_active_cycle != state.current_cycle {
        user.cycle_tickets = 0;
        user.cycle_ranges.clear();
        user.last_active_cycle = state.current_cycle;
    }
    user.cycle_tickets += count;
    user.total_tickets += count;
    user.cycle_ranges.push(range.clone());
    USERS.save(deps.storage, &info.sender, &user)?;

    TICKET_RANGES.save(
        deps.storage,
        range.start,
        &TicketOwnership {
            owner: info.sender.clone(),
            cycle: cycle.id,
            end: range.end,
        },
    )?;

    // Payments
    let mut messages: Vec<CosmosMsg> = vec![];
    let discount = first_purchase_discount(&config.bonus, first_purchase, count, total_price);
    let to_bank = total_price.checked_sub(discount)?;
    push_transfer(
        &mut messages,
        &config.payment_token,
        &info.sender,
        &config.bank,
        to_bank,
    )?;

    let mut commission = Uint128::zero();
    let mut referral_bonus = Uint128::zero();
    let mut second_level_bonus = Uint128::zero();
    if let Some(parent) = payable_referrer(&config.admin, referrer.as_ref()) {
        let mut parent_info = USERS.load(deps.storage, &parent)?;
        if is_new_user {
            parent_info.referrals_count += 1;
        }
        parent_info.referral_tickets += count;
        USERS.save(deps.storage, &parent, &parent_info)?;

        commission = total_price.multiply_ratio(
            commission_percent(&config.commission_tiers, count),
            100u128,
        );
        push_transfer(
            &mut messages,
            &config.payment_token,
            &config.bank,
            &parent,
            commission,
        )?;

        if qualifies(config.bonus.direct_referral_bonus_min_tickets, count) {
            referral_bonus = config.bonus.direct_referral_bonus;
            push_transfer(
                &mut messages,
                &config.payment_token,
                &config.bank,
                &parent,
                referral_bonus,
            )?;
        }

        let grandparent = payable_referrer(&config.admin, parent_info.referrer.as_ref());
        if let Some(grandparent) = grandparent {
            if qualifies(config.bonus.second_level_bonus_min_tickets, count) {
                second_level_bonus = config.bonus.second_level_bonus;
                push_transfer(
                    &mut messages,
                    &config.payment_token,
                    &config.bank,
                    &grandparent,
                    second_level_bonus,
                )?;
            }
        }
    }

    for ticket in range.start..=range.end {
        messages.push(mint_ticket_msg(
            &config.ticket_registry,
            ticket,
            &info.sender,
        )?);
    }

    // Selling the last ticket ends sales; the draw stays an explicit admin call
    let sold_out = cycle.tickets_sold >= cycle.ticket_cap;
    if sold_out {
        cycle.closed_at = Some(env.block.time);
        state.status = CycleStatus::Closed;
    }
    CYCLES.save(deps.storage, cycle.id, &cycle)?;
    LOTTERY_STATE.save(deps.storage, &state)?;

    let referrer_str = referrer.as_ref().map(Addr::to_string).unwrap_or_default();
    let mut response = Response::new()
        .add_messages(messages)
        .add_attribute("action", "buy_tickets")
        .add_attribute("buyer", info.sender.to_string())
        .add_attribute("count", count.to_string())
        .add_event(
            Event::new("mlm_tickets_bought")
                .add_attribute("buyer", info.sender.to_string())
                .add_attribute("count", count.to_string())
                .add_attribute("cycle", cycle.id.to_string())
                .add_attribute("first_ticket", range.start.to_string())
                .add_attribute("last_ticket", range.end.to_string())
                .add_attribute("user_id", user.id.to_string())
                .add_attribute("referrer", referrer_str)
                .add_attribute("paid_to_bank", to_bank.to_string())
                .add_attribute("discount", discount.to_string())
                .add_attribute("commission", commission.to_string())
                .add_attribute("referral_bonus", referral_bonus.to_string())
                .add_attribute("second_level_bonus", second_level_bonus.to_string()),
        );

    if sold_out {
        response = response.add_event(cycle_closed_event(&cycle, "sold_out"));
    }

    Ok(response)
}

/// Draw the winners of the closed cycle, pay prizes and referral cascades,
/// and return the lottery to idle. Admin only.
///
/// 1. Draw `sum(winning_ticket_counts)` distinct tickets from the cycle
/// 2. Pay each ticket's owner the prize of its tier
/// 3. Pay up to three referrers above the owner their cascade share
/// 4. Update win streaks and pay streak bonuses
/// 5. Route the per-cycle jackpot contribution
///
/// Every storage write happens before the transfers are dispatched.
pub fn reward_winners(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized {
            reason: "only admin can reward winners".to_string(),
        });
    }

    let mut state = LOTTERY_STATE.load(deps.storage)?;
    match state.status {
        CycleStatus::Open => {
            return Err(ContractError::CycleStillOpen {
                cycle: state.current_cycle,
            })
        }
        CycleStatus::Idle => return Err(ContractError::NoPendingDraw),
        CycleStatus::Closed => {}
    }

    let mut cycle = CYCLES.load(deps.storage, state.current_cycle)?;
    let current = cycle.id;

    // 1. Draw
    let time = env.block.time.seconds();
    let height = env.block.height;
    let admin = config.admin.as_str();
    let winning_count = winning_ticket_total(&config.winning_ticket_counts)?;
    let positions = draw_without_replacement(cycle.tickets_sold, winning_count, |i| {
        draw_seed(time, height, admin, i)
    });

    let mut messages: Vec<CosmosMsg> = vec![];
    let mut events: Vec<Event> = vec![];
    let mut winning_tickets = Vec::with_capacity(positions.len());
    let mut total_paid = Uint128::zero();

    for (index, position) in positions.iter().enumerate() {
        let Some(tier) = tier_for_index(&config.winning_ticket_counts, index as u64) else {
            break;
        };
        let ticket = cycle.first_ticket + position;
        let winner = ticket_owner(deps.storage, ticket)?
            .ok_or(ContractError::TicketNotFound { ticket })?
            .owner;
        let amount = config.winning_amounts[tier];

        // 2. Prize
        push_transfer(
            &mut messages,
            &config.payment_token,
            &config.bank,
            &winner,
            amount,
        )?;
        total_paid = total_paid.checked_add(amount)?;

        // 3. Cascade, nearest referrer first
        let chain = ancestors(deps.storage, &config.admin, &winner, MAX_REFERRAL_DEPTH)?;
        for (level, ancestor) in chain.iter().enumerate() {
            let share = amount.multiply_ratio(config.cascade_percentages[level], 100u128);
            push_transfer(
                &mut messages,
                &config.payment_token,
                &config.bank,
                ancestor,
                share,
            )?;
            total_paid = total_paid.checked_add(share)?;
        }

        // 4. Streak, counted once per winner per cycle
        let mut winner_info = USERS.load(deps.storage, &winner)?;
        winner_info.total_won = winner_info.total_won.checked_add(amount)?;
        if winner_info.last_winning_cycle != current {
            winner_info.win_streak = if winner_info.last_winning_cycle + 1 == current {
                winner_info.win_streak + 1
            } else {
                1
            };
            winner_info.last_winning_cycle = current;

            let threshold = config.bonus.streak_threshold;
            if threshold > 0 && winner_info.win_streak >= threshold {
                push_transfer(
                    &mut messages,
                    &config.payment_token,
                    &config.bank,
                    &winner,
                    config.bonus.streak_bonus,
                )?;
                total_paid = total_paid.checked_add(config.bonus.streak_bonus)?;
                events.push(
                    Event::new("mlm_streak_bonus")
                        .add_attribute("cycle", current.to_string())
                        .add_attribute("winner", winner.to_string())
                        .add_attribute("streak", winner_info.win_streak.to_string())
                        .add_attribute("amount", config.bonus.streak_bonus.to_string()),
                );
                winner_info.win_streak = 0;
            }
        }
        USERS.save(deps.storage, &winner, &winner_info)?;

        events.push(
            Event::new("mlm_winning_ticket")
                .add_attribute("cycle", current.to_string())
                .add_attribute("index", index.to_string())
                .add_attribute("tier", tier.to_string())
                .add_attribute("ticket", ticket.to_string())
                .add_attribute("winner", winner.to_string())
                .add_attribute("amount", amount.to_string())
                .add_attribute("cascade_levels", chain.len().to_string()),
        );
        winning_tickets.push(WinningTicket {
            ticket,
            tier: tier as u8,
            winner,
            amount,
        });
    }

    // 5. Jackpot contribution, funded by the pool account itself
    let contribution = config.cycle_jackpot_contribution;
    if !contribution.is_zero() {
        let mut jackpot = JACKPOT.load(deps.storage)?;
        jackpot.amount = jackpot.amount.checked_add(contribution)?;
        JACKPOT.save(deps.storage, &jackpot)?;
    }

    let drawn = winning_tickets.len();
    cycle.winning_tickets = winning_tickets;
    cycle.total_paid = total_paid;
    cycle.rewarded_at = Some(env.block.time);
    CYCLES.save(deps.storage, current, &cycle)?;

    state.status = CycleStatus::Idle;
    state.total_rewards_distributed = state
        .total_rewards_distributed
        .checked_add(total_paid)?;
    LOTTERY_STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_messages(messages)
        .add_attribute("action", "reward_winners")
        .add_attribute("cycle", current.to_string())
        .add_attribute("status", state.status.as_str())
        .add_attribute("winning_tickets", drawn.to_string())
        .add_attribute("total_paid", total_paid.to_string())
        .add_events(events)
        .add_event(
            Event::new("mlm_rewards_distributed")
                .add_attribute("admin", info.sender.to_string())
                .add_attribute("cycle", current.to_string())
                .add_attribute("tickets_sold", cycle.tickets_sold.to_string())
                .add_attribute("winning_tickets", drawn.to_string())
                .add_attribute("total_paid", total_paid.to_string())
                .add_attribute("jackpot_contribution", contribution.to_string())
                .add_attribute("block_height", height.to_string())
                .add_attribute("timestamp", time.to_string()),
        ))
}

/// Pay the whole accumulated jackpot to one registered user picked from the
/// block seed. The administrator (id 0) is never picked.
/// Admin or admin-flagged addresses, at most once per interval.
pub fn execute_monthly_jackpot(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let flagged = ADMINS
        .may_load(deps.storage, &info.sender)?
        .unwrap_or(false);
    if info.sender != config.admin && !flagged {
        return Err(ContractError::Unauthorized {
            reason: "only admins can execute the monthly jackpot".to_string(),
        });
    }

    let mut jackpot = JACKPOT.load(deps.storage)?;
    let next_execution = jackpot
        .last_execution
        .plus_seconds(config.jackpot_interval_seconds);
    if env.block.time < next_execution {
        return Err(ContractError::TooEarly {
            next_execution: next_execution.seconds(),
        });
    }

    let state = LOTTERY_STATE.load(deps.storage)?;
    if state.users_count <= 1 {
        return Err(ContractError::NoParticipants);
    }

    let seed = jackpot_seed(
        env.block.time.seconds(),
        env.block.height,
        config.admin.as_str(),
    );
    let participants = (state.users_count - 1) as u128;
    let winner_id = (seed_to_u128(&seed) % participants) as u64 + 1;
    let winner = USER_IDS.load(deps.storage, winner_id)?;

    let amount = jackpot.amount;
    jackpot.amount = Uint128::zero();
    jackpot.last_execution = env.block.time;
    jackpot.executions += 1;
    jackpot.last_winner = Some(winner.clone());
    JACKPOT.save(deps.storage, &jackpot)?;

    let mut messages: Vec<CosmosMsg> = vec![];
    push_transfer(
        &mut messages,
        &config.payment_token,
        &config.jackpot_pool,
        &winner,
        amount,
    )?;

    Ok(Response::new()
        .add_messages(messages)
        .add_attribute("action", "execute_monthly_jackpot")
        .add_attribute("winner", winner.to_string())
        .add_attribute("amount", amount.to_string())
        .add_event(
            Event::new("mlm_jackpot_executed")
                .add_attribute("winner", winner.to_string())
                .add_attribute("winner_id", winner_id.to_string())
                .add_attribute("amount", amount.to_string())
                .add_attribute("execution", jackpot.executions.to_string())
                .add_attribute("seed", hex::encode(seed))
                .add_attribute("timestamp", env.block.time.seconds().to_string()),
        ))
}

/// Update addresses and sale parameters. Admin only.
pub fn update_config(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    params: UpdateConfigParams,
) -> Result<Response, ContractError> {
    let UpdateConfigParams {
        bank,
        payment_token,
        ticket_registry,
        jackpot_pool,
        ticket_price,
        tickets_per_cycle,
        cycle_jackpot_contribution,
        jackpot_interval_seconds,
    } = params;

    let mut config = load_config_as_admin(deps.storage, &info)?;

    if let Some(bank) = bank {
        config.bank = deps.api.addr_validate(&bank)?;
    }
    if let Some(token) = payment_token {
        config.payment_token = deps.api.addr_validate(&token)?;
    }
    if let Some(registry) = ticket_registry {
        config.ticket_registry = deps.api.addr_validate(&registry)?;
    }
    if let Some(pool) = jackpot_pool {
        config.jackpot_pool = deps.api.addr_validate(&pool)?;
    }
    if let Some(price) = ticket_price {
        config.ticket_price = price;
    }
    if let Some(tickets) = tickets_per_cycle {
        config.tickets_per_cycle = tickets;
    }
    if let Some(contribution) = cycle_jackpot_contribution {
        config.cycle_jackpot_contribution = contribution;
    }
    if let Some(interval) = jackpot_interval_seconds {
        config.jackpot_interval_seconds = interval;
    }
    validate_sale_params(&config)?;

    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new().add_attribute("action", "update_config"))
}

/// Update prize amounts and winning ticket counts. Admin only.
pub fn update_prize_tiers(
    deps: DepsMut,
    info: MessageInfo,
    winning_amounts: Option<[Uint128; PRIZE_TIERS]>,
    winning_ticket_counts: Option<[u64; PRIZE_TIERS]>,
) -> Result<Response, ContractError> {
    let mut config = load_config_as_admin(deps.storage, &info)?;

    if let Some(amounts) = winning_amounts {
        config.winning_amounts = amounts;
    }
    if let Some(counts) = winning_ticket_counts {
        winning_ticket_total(&counts)?;
        config.winning_ticket_counts = counts;
    }
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("action", "update_prize_tiers")
        .add_attribute(
            "winning_ticket_counts",
            format!("{:?}", config.winning_ticket_counts),
        ))
}

/// Update the prize cascade percentages and purchase commission tiers. Admin only.
pub fn update_referral_rewards(
    deps: DepsMut,
    info: MessageInfo,
    cascade_percentages: Option<[u64; CASCADE_LEVELS]>,
    commission_tiers: Option<Vec<CommissionTier>>,
) -> Result<Response, ContractError> {
    let mut config = load_config_as_admin(deps.storage, &info)?;

    if let Some(percentages) = cascade_percentages {
        validate_cascade_percentages(&percentages)?;
        config.cascade_percentages = percentages;
    }
    if let Some(tiers) = commission_tiers {
        validate_commission_tiers(&tiers)?;
        config.commission_tiers = tiers;
    }
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("action", "update_referral_rewards")
        .add_attribute(
            "cascade_percentages",
            format!("{:?}", config.cascade_percentages),
        ))
}

/// Replace the bonus parameters. Admin only.
pub fn update_bonus_parameters(
    deps: DepsMut,
    info: MessageInfo,
    bonus: BonusParameters,
) -> Result<Response, ContractError> {
    let mut config = load_config_as_admin(deps.storage, &info)?;
    config.bonus = bonus;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new().add_attribute("action", "update_bonus_parameters"))
}

/// Flag or unflag a jackpot operator. Admin only.
pub fn set_admin_status(
    deps: DepsMut,
    info: MessageInfo,
    address: String,
    status: bool,
) -> Result<Response, ContractError> {
    load_config_as_admin(deps.storage, &info)?;

    let addr = deps.api.addr_validate(&address)?;
    if status {
        ADMINS.save(deps.storage, &addr, &true)?;
    } else {
        ADMINS.remove(deps.storage, &addr);
    }

    Ok(Response::new()
        .add_attribute("action", "set_admin_status")
        .add_attribute("address", address)
        .add_attribute("status", status.to_string()))
}

pub fn validate_sale_params(config: &Config) -> Result<(), ContractError> {
    if config.ticket_price.is_zero() {
        return Err(ContractError::InvalidConfig {
            reason: "ticket price must be greater than 0".to_string(),
        });
    }
    if config.tickets_per_cycle == 0 {
        return Err(ContractError::InvalidConfig {
            reason: "tickets per cycle must be greater than 0".to_string(),
        });
    }
    if config.jackpot_interval_seconds == 0 {
        return Err(ContractError::InvalidConfig {
            reason: "jackpot interval must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Total number of winning tickets drawn per cycle.
pub fn winning_ticket_total(counts: &[u64; PRIZE_TIERS]) -> Result<u64, ContractError> {
    counts
        .iter()
        .try_fold(0u64, |total, count| total.checked_add(*count))
        .ok_or_else(|| ContractError::InvalidConfig {
            reason: "winning ticket counts overflow".to_string(),
        })
}

pub fn validate_cascade_percentages(
    percentages: &[u64; CASCADE_LEVELS],
) -> Result<(), ContractError> {
    for (level, value) in percentages.iter().enumerate() {
        if *value > 100 {
            return Err(ContractError::InvalidPercentage {
                field: format!("cascade_percentages[{}]", level),
                value: *value,
            });
        }
    }
    let total: u64 = percentages.iter().sum();
    if total > 100 {
        return Err(ContractError::InvalidPercentage {
            field: "cascade_percentages (sum)".to_string(),
            value: total,
        });
    }
    Ok(())
}

pub fn validate_commission_tiers(tiers: &[CommissionTier]) -> Result<(), ContractError> {
    match tiers.first() {
        Some(first) if first.min_tickets == 1 => {}
        _ => {
            return Err(ContractError::InvalidConfig {
                reason: "first commission tier must start at 1 ticket".to_string(),
            })
        }
    }
    for pair in tiers.windows(2) {
        if pair[1].min_tickets <= pair[0].min_tickets {
            return Err(ContractError::InvalidConfig {
                reason: "commission tiers must have increasing min_tickets".to_string(),
            });
        }
    }
    for tier in tiers {
        if tier.percent > 100 {
            return Err(ContractError::InvalidPercentage {
                field: "commission_tiers.percent".to_string(),
                value: tier.percent,
            });
        }
    }
    Ok(())
}

/// Percentage of the purchase price owed to the direct referrer: the last
/// tier whose `min_tickets` the purchase reaches.
pub fn commission_percent(tiers: &[CommissionTier], count: u64) -> u64 {
    tiers
        .iter()
        .take_while(|tier| tier.min_tickets <= count)
        .last()
        .map(|tier| tier.percent)
        .unwrap_or(0)
}

fn first_purchase_discount(
    bonus: &BonusParameters,
    first_purchase: bool,
    count: u64,
    total_price: Uint128,
) -> Uint128 {
    if first_purchase && qualifies(bonus.first_purchase_min_tickets, count) {
        bonus.first_purchase_discount.min(total_price)
    } else {
        Uint128::zero()
    }
}

/// A zero threshold disables the bonus.
fn qualifies(min_tickets: u64, count: u64) -> bool {
    min_tickets > 0 && count >= min_tickets
}

fn load_config_as_admin(
    storage: &dyn Storage,
    info: &MessageInfo,
) -> Result<Config, ContractError> {
    let config = CONFIG.load(storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized {
            reason: "only admin can update config".to_string(),
        });
    }
    Ok(config)
}

fn query_allowance(
    querier: QuerierWrapper,
    token: &Addr,
    owner: &Addr,
    spender: &Addr,
) -> Result<Uint128, ContractError> {
    let response: AllowanceResponse = querier.query_wasm_smart(
        token,
        &TokenQueryMsg::Allowance {
            owner: owner.to_string(),
            spender: spender.to_string(),
        },
    )?;
    Ok(response.allowance)
}

/// Queue a cw20 `TransferFrom`. Zero amounts are skipped.
fn push_transfer(
    messages: &mut Vec<CosmosMsg>,
    token: &Addr,
    from: &Addr,
    to: &Addr,
    amount: Uint128,
) -> Result<(), ContractError> {
    if amount.is_zero() {
        return Ok(());
    }
    messages.push(
        WasmMsg::Execute {
            contract_addr: token.to_string(),
            msg: to_json_binary(&TokenExecuteMsg::TransferFrom {
                owner: from.to_string(),
                recipient: to.to_string(),
                amount,
            })?,
            funds: vec![],
        }
        .into(),
    );
    Ok(())
}

fn mint_ticket_msg(registry: &Addr, ticket: u64, owner: &Addr) -> Result<CosmosMsg, ContractError> {
    Ok(WasmMsg::Execute {
        contract_addr: registry.to_string(),
        msg: to_json_binary(&TicketExecuteMsg::Mint {
            token_id: ticket.to_string(),
            owner: owner.to_string(),
            token_uri: None,
            extension: Empty {},
        })?,
        funds: vec![],
    }
    .into())
}

fn cycle_closed_event(cycle: &CycleInfo, reason: &str) -> Event {
    Event::new("mlm_cycle_closed")
        .add_attribute("cycle", cycle.id.to_string())
        .add_attribute("tickets_sold", cycle.tickets_sold.to_string())
        .add_attribute("reason", reason)
}
