pub mod yahoo;

pub use yahoo::YahooQuoteGateway;
