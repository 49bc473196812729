use crate::tvm::Address;
use serde::Serialize;
use std::fmt;

/// Name of a Telemint item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TokenName {
    /// Anonymous number; ASCII digits only, no leading `+`
    PhoneNumber(String),
    /// Fragment username, without the leading `@`
    Username(String),
}

impl TokenName {
    pub fn as_str(&self) -> &str {
        match self {
            TokenName::PhoneNumber(digits) => digits,
            TokenName::Username(text) => text,
        }
    }

    pub fn is_phone_number(&self) -> bool {
        matches!(self, TokenName::PhoneNumber(_))
    }
}

impl fmt::Display for TokenName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenName::PhoneNumber(digits) => write!(f, "+{}", digits),
            TokenName::Username(text) => write!(f, "@{}", text),
        }
    }
}

/// Highest bid placed so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastBid {
    pub bidder_address: Address,
    /// Nanotons
    pub bid: u128,
    /// Unix seconds
    pub bid_ts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuctionState {
    /// `None` until the first bid is placed
    pub last_bid: Option<LastBid>,
    pub min_bid: u128,
    pub end_time: u32,
}

impl AuctionState {
    /// Bidder of the last bid; `None` when nobody has bid yet
    pub fn bidder_address(&self) -> Option<&Address> {
        self.last_bid.as_ref().map(|b| &b.bidder_address)
    }

    /// Amount of the last bid, 0 when nobody has bid yet
    pub fn bid(&self) -> u128 {
        self.last_bid.as_ref().map_or(0, |b| b.bid)
    }

    /// Time of the last bid, 0 when nobody has bid yet
    pub fn bid_ts(&self) -> u32 {
        self.last_bid.as_ref().map_or(0, |b| b.bid_ts)
    }

    pub fn has_bids(&self) -> bool {
        self.last_bid.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuctionConfig {
    pub beneficiary_address: Address,
    pub initial_min_bid: u128,
    /// 0 means no buyout price
    pub max_bid: u128,
    /// Percent
    pub min_bid_step: u8,
    /// Seconds
    pub min_extend_time: u32,
    /// Seconds
    pub duration: u32,
}

/// Decoded state of one Telemint item at the time of the fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub address: Address,
    pub token_name: TokenName,
    /// `None` when no auction is running
    pub auction_state: Option<AuctionState>,
    pub auction_config: Option<AuctionConfig>,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Telemint item at {}", self.address)?;
        writeln!(f, "  token_name: {}", self.token_name)?;

        match &self.auction_state {
            None => writeln!(f, "  auction_state: none")?,
            Some(state) => {
                writeln!(f, "  auction_state:")?;
                match state.bidder_address() {
                    Some(bidder) => writeln!(f, "    bidder_address: {}", bidder)?,
                    None => writeln!(f, "    bidder_address: none")?,
                }
                writeln!(f, "    bid: {}", state.bid())?;
                writeln!(f, "    bid_ts: {}", state.bid_ts())?;
                writeln!(f, "    min_bid: {}", state.min_bid)?;
                writeln!(f, "    end_time: {}", state.end_time)?;
            }
        }

        match &self.auction_config {
            None => writeln!(f, "  auction_config: none"),
            Some(config) => {
                writeln!(f, "  auction_config:")?;
                writeln!(f, "    beneficiary_address: {}", config.beneficiary_address)?;
                writeln!(f, "    initial_min_bid: {}", config.initial_min_bid)?;
                writeln!(f, "    max_bid: {}", config.max_bid)?;
                writeln!(f, "    min_bid_step: {}", config.min_bid_step)?;
                writeln!(f, "    min_extend_time: {}", config.min_extend_time)?;
                writeln!(f, "    duration: {}", config.duration)
            }
        }
    }
}

/// Raw BoC bytes returned by the three get-methods of one item
///
/// A `None` or empty response means the method produced nothing, which for
/// the auction state is the "no auction" case and elsewhere an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponses {
    pub token_name: Vec<u8>,
    pub auction_state: Option<Vec<u8>>,
    pub auction_config: Option<Vec<u8>>,
}
