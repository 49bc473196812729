//! Telemint NFT state decoding
//!
//! Telemint items (Fragment usernames and anonymous numbers) expose their
//! state through three get-methods, each returning a cell:
//! - token name: the username or number the item stands for
//! - auction state: last bid, minimal next bid, end time
//! - auction config: beneficiary and bidding rules
//!
//! [`SnapshotLoader`] calls the methods through a [`GetMethodProvider`] and
//! decodes the results with the decoders in [`layout`].

pub mod error;
pub mod exit_code;
pub mod layout;
pub mod loader;
pub mod types;
#[cfg(test)]
mod tests;

pub use error::{FetchError, TelemintError};
pub use exit_code::ExitCode;
pub use layout::{
    Layout, TOKEN_TYPE_PHONE, TOKEN_TYPE_USERNAME, decode_auction_config,
    decode_auction_config_boc, decode_auction_state, decode_auction_state_boc,
    decode_token_name, decode_token_name_boc,
};
pub use loader::{GetMethodProvider, LoaderConfig, SnapshotLoader, StaticProvider};
pub use types::{AuctionConfig, AuctionState, LastBid, RawResponses, Snapshot, TokenName};
