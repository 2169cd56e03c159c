pub mod extract;
pub mod payment_handler;
