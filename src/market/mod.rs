pub mod cache;
pub mod provider;
pub mod types;
pub mod yahoo_client;

pub use cache::CachedQuotes;
pub use provider::{QuoteError, QuoteProvider};
pub use yahoo_client::YahooQuoteClient;
