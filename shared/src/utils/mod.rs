pub mod jwt;
pub mod token_extraction;
pub mod validation;
