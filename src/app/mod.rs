pub mod context;
pub mod user_transfer;
