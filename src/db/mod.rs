pub mod accounts;
pub mod audit;
pub mod reset_tokens;
