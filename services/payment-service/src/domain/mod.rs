pub mod audit;
pub mod ledger;
pub mod order;
pub mod payment;
pub mod receipt;
pub mod reconciliation;
pub mod refund;
pub mod report;
