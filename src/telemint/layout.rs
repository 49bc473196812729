//! Field layouts of the Telemint records
//!
//! Each decoder takes a cursor positioned at the root of a record and reads
//! its fields in order. Two layout versions exist:
//!
//! - [`Layout::Flat`]: fixed-width fields as laid out by the get-methods.
//!   Amounts are 64-bit, timestamps 32-bit, the token name carries a type tag.
//! - [`Layout::Tlb`]: the contract's stored TL-B objects (`telemint.tlb`).
//!   Amounts are `Grams`, the last bid sits behind a `Maybe ^Cell`.
//!
//! Decoding is all-or-nothing: the cursor is taken by value, so a failed
//! decode never leaves a half-read record behind.

use crate::telemint::error::{Result, TelemintError};
use crate::telemint::types::{AuctionConfig, AuctionState, LastBid, TokenName};
use crate::tvm::{Address, Slice, deserialize_boc};
use std::fmt;
use std::str::FromStr;

/// Flat token name tag for usernames
pub const TOKEN_TYPE_USERNAME: u8 = 0x00;

/// Flat token name tag for anonymous numbers
pub const TOKEN_TYPE_PHONE: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    #[default]
    Flat,
    Tlb,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Flat => write!(f, "flat"),
            Layout::Tlb => write!(f, "tlb"),
        }
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Layout::Flat),
            "tlb" | "tl-b" => Ok(Layout::Tlb),
            other => Err(format!("Unknown layout '{}', expected 'flat' or 'tlb'", other)),
        }
    }
}

fn malformed(msg: impl Into<String>) -> TelemintError {
    TelemintError::MalformedCell(msg.into())
}

/// Reads an 8-bit length followed by that many bytes
fn load_text_bytes(slice: &mut Slice, what: &str) -> Result<Vec<u8>> {
    let len = slice.load_byte()? as usize;
    if len == 0 {
        return Err(malformed(format!("Empty {}", what)));
    }
    Ok(slice.load_bytes(len)?)
}

fn phone_number(bytes: Vec<u8>) -> Result<TokenName> {
    if let Some(bad) = bytes.iter().find(|b| !b.is_ascii_digit()) {
        return Err(malformed(format!("Non-digit byte 0x{:02x} in phone number", bad)));
    }
    // ASCII digits are valid UTF-8
    let digits = String::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
    Ok(TokenName::PhoneNumber(digits))
}

fn username(bytes: Vec<u8>) -> Result<TokenName> {
    String::from_utf8(bytes)
        .map(TokenName::Username)
        .map_err(|e| malformed(format!("Username is not valid UTF-8: {}", e)))
}

/// Reads a `MsgAddressInt`, which has no `addr_none` form
fn load_required_address(slice: &mut Slice, what: &str) -> Result<Address> {
    slice
        .load_address()?
        .ok_or_else(|| malformed(format!("{} is addr_none", what)))
}

pub fn decode_token_name(mut slice: Slice, layout: Layout) -> Result<TokenName> {
    match layout {
        Layout::Flat => {
            let tag = slice.load_byte()?;
            match tag {
                TOKEN_TYPE_USERNAME => username(load_text_bytes(&mut slice, "username")?),
                TOKEN_TYPE_PHONE => phone_number(load_text_bytes(&mut slice, "phone number")?),
                other => Err(TelemintError::UnknownTokenType(other)),
            }
        }
        Layout::Tlb => {
            // telemint_text$_ len:(## 8) text:(bits (len * 8))
            let bytes = load_text_bytes(&mut slice, "token name")?;
            if bytes.iter().all(u8::is_ascii_digit) {
                phone_number(bytes)
            } else {
                username(bytes)
            }
        }
    }
}

pub fn decode_auction_state(mut slice: Slice, layout: Layout) -> Result<AuctionState> {
    match layout {
        Layout::Flat => {
            let bidder = slice.load_address()?;
            let bid = slice.load_uint(64)? as u128;
            let bid_ts = slice.load_u32()?;
            let min_bid = slice.load_uint(64)? as u128;
            let end_time = slice.load_u32()?;

            let last_bid = match bidder {
                Some(bidder_address) => Some(LastBid {
                    bidder_address,
                    bid,
                    bid_ts,
                }),
                None if bid == 0 && bid_ts == 0 => None,
                None => {
                    return Err(malformed(format!(
                        "Bid {} at {} without a bidder",
                        bid, bid_ts
                    )));
                }
            };

            Ok(AuctionState {
                last_bid,
                min_bid,
                end_time,
            })
        }
        Layout::Tlb => {
            // teleitem_auction_state$_ last_bid:(Maybe ^TeleitemLastBid) min_bid:Grams end_time:uint32
            let last_bid = match slice.load_maybe_ref()? {
                Some(cell) => {
                    // teleitem_last_bid bidder_address:MsgAddressInt bid:Grams bid_ts:uint32
                    let mut bid_slice = Slice::new(cell);
                    Some(LastBid {
                        bidder_address: load_required_address(&mut bid_slice, "Bidder address")?,
                        bid: bid_slice.load_coins()?,
                        bid_ts: bid_slice.load_u32()?,
                    })
                }
                None => None,
            };

            Ok(AuctionState {
                last_bid,
                min_bid: slice.load_coins()?,
                end_time: slice.load_u32()?,
            })
        }
    }
}

pub fn decode_auction_config(mut slice: Slice, layout: Layout) -> Result<AuctionConfig> {
    let beneficiary_address = load_required_address(&mut slice, "Beneficiary address")?;

    let (initial_min_bid, max_bid) = match layout {
        Layout::Flat => (
            slice.load_uint(64)? as u128,
            slice.load_uint(64)? as u128,
        ),
        Layout::Tlb => (slice.load_coins()?, slice.load_coins()?),
    };

    Ok(AuctionConfig {
        beneficiary_address,
        initial_min_bid,
        max_bid,
        min_bid_step: slice.load_byte()?,
        min_extend_time: slice.load_u32()?,
        duration: slice.load_u32()?,
    })
}

pub fn decode_token_name_boc(boc: &[u8], layout: Layout) -> Result<TokenName> {
    decode_token_name(Slice::new(deserialize_boc(boc)?), layout)
}

pub fn decode_auction_state_boc(boc: &[u8], layout: Layout) -> Result<AuctionState> {
    decode_auction_state(Slice::new(deserialize_boc(boc)?), layout)
}

pub fn decode_auction_config_boc(boc: &[u8], layout: Layout) -> Result<AuctionConfig> {
    decode_auction_config(Slice::new(deserialize_boc(boc)?), layout)
}
