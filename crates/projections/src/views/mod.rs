//! Read model views.

mod active_holds;
mod daily_revenue;
mod movie_revenue;
mod tickets;

pub use active_holds::{ActiveHoldsView, HoldEntry};
pub use daily_revenue::{DailyRevenueSummary, DailyRevenueView};
pub use movie_revenue::{MovieRevenue, MovieRevenueView};
pub use tickets::{TicketRecord, TicketStatus, TicketsView};
