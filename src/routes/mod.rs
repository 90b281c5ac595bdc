pub mod funds;
pub mod health;
pub mod valuation;
