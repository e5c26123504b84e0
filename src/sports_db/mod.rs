pub mod client;
pub mod parse;
pub mod provider;

pub use client::TheSportsDb;
pub use provider::SportsDataSource;
