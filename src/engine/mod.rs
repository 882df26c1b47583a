pub mod bot;
pub mod filter;
pub mod report;
