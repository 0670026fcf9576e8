use cosmwasm_schema::cw_serde;

/// Lifecycle of a lottery cycle.
///
/// `Idle` before the first cycle and after every reward distribution, `Open`
/// while tickets are on sale, `Closed` once sales ended and the draw is pending.
#[cw_serde]
pub enum CycleStatus {
    Idle,
    Open,
    Closed,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Idle => "idle",
            CycleStatus::Open => "open",
            CycleStatus::Closed => "closed",
        }
    }
}

/// An inclusive range of ticket numbers allocated by a single purchase.
#[cw_serde]
pub struct TicketRange {
    pub start: u64,
    pub end: u64,
}

impl TicketRange {
    pub fn contains(&self, ticket: u64) -> bool {
        ticket >= self.start && ticket <= self.end
    }

    /// Number of tickets in the range.
    pub fn count(&self) -> u64 {
        self.end - self.start + 1
    }
}
