pub mod investor;
pub mod result;

pub use investor::{HoldingStatus, Investor, PortfolioCompany};
pub use result::{RunResult, TokenUsage};
