//! Feed fetching, decoding, and date normalization.
//!
//! The pieces of one fetch-and-parse cycle:
//!
//! - [`fetcher`] - HTTP retrieval with a deadline and a body size cap
//! - [`parser`] - RSS channel/item decoding from XML
//! - [`normalize`] - publication-date parsing into UTC timestamps

pub mod fetcher;
pub mod normalize;
pub mod parser;

pub use fetcher::{FetchError, Fetcher};
pub use normalize::{parse_pub_date, DateFormatUnrecognized};
pub use parser::{Channel, Item, ParseError};
