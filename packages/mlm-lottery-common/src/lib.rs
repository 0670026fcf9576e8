pub mod draw;
pub mod types;

pub use draw::{draw_seed, draw_without_replacement, jackpot_seed, seed_to_u128, tier_for_index};
pub use types::{CycleStatus, TicketRange};
