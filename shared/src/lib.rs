// Shared library untuk laundry back-office services
pub mod models;
pub mod utils;
