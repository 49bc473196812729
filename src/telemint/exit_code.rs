//! Exit codes thrown by the Telemint contracts
//!
//! Values follow `func/common.fc` of the Telemint sources. A get-method that
//! fails reports one of these as its TVM exit code.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCode {
    Success,
    SuccessAlt,
    InvalidLength,
    InvalidSignature,
    WrongSubwalletId,
    NotYetValidSignature,
    ExpiredSignature,
    NotEnoughFunds,
    WrongTopupComment,
    UnknownOp,
    Uninited,
    TooSmallStake,
    ExpectedOnchainContent,
    ForbiddenNotDeploy,
    ForbiddenNotStake,
    ForbiddenTopup,
    ForbiddenTransfer,
    ForbiddenChangeDns,
    ForbiddenTouch,
    /// No auction is running for the item
    NoAuction,
    ForbiddenAuction,
    AlreadyHasStakes,
    AuctionAlreadyStarted,
    InvalidAuctionConfig,
    IncorrectWorkchain,
    NoFirstZeroByte,
    BadSubdomainLength,
    /// Any code the contract does not define
    Unknown(i32),
}

impl ExitCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ExitCode::Success,
            1 => ExitCode::SuccessAlt,
            201 => ExitCode::InvalidLength,
            202 => ExitCode::InvalidSignature,
            203 => ExitCode::WrongSubwalletId,
            204 => ExitCode::NotYetValidSignature,
            205 => ExitCode::ExpiredSignature,
            206 => ExitCode::NotEnoughFunds,
            207 => ExitCode::WrongTopupComment,
            208 => ExitCode::UnknownOp,
            210 => ExitCode::Uninited,
            211 => ExitCode::TooSmallStake,
            212 => ExitCode::ExpectedOnchainContent,
            213 => ExitCode::ForbiddenNotDeploy,
            214 => ExitCode::ForbiddenNotStake,
            215 => ExitCode::ForbiddenTopup,
            216 => ExitCode::ForbiddenTransfer,
            217 => ExitCode::ForbiddenChangeDns,
            218 => ExitCode::ForbiddenTouch,
            219 => ExitCode::NoAuction,
            220 => ExitCode::ForbiddenAuction,
            221 => ExitCode::AlreadyHasStakes,
            222 => ExitCode::AuctionAlreadyStarted,
            223 => ExitCode::InvalidAuctionConfig,
            333 => ExitCode::IncorrectWorkchain,
            413 => ExitCode::NoFirstZeroByte,
            70 => ExitCode::BadSubdomainLength,
            other => ExitCode::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::SuccessAlt => 1,
            ExitCode::InvalidLength => 201,
            ExitCode::InvalidSignature => 202,
            ExitCode::WrongSubwalletId => 203,
            ExitCode::NotYetValidSignature => 204,
            ExitCode::ExpiredSignature => 205,
            ExitCode::NotEnoughFunds => 206,
            ExitCode::WrongTopupComment => 207,
            ExitCode::UnknownOp => 208,
            ExitCode::Uninited => 210,
            ExitCode::TooSmallStake => 211,
            ExitCode::ExpectedOnchainContent => 212,
            ExitCode::ForbiddenNotDeploy => 213,
            ExitCode::ForbiddenNotStake => 214,
            ExitCode::ForbiddenTopup => 215,
            ExitCode::ForbiddenTransfer => 216,
            ExitCode::ForbiddenChangeDns => 217,
            ExitCode::ForbiddenTouch => 218,
            ExitCode::NoAuction => 219,
            ExitCode::ForbiddenAuction => 220,
            ExitCode::AlreadyHasStakes => 221,
            ExitCode::AuctionAlreadyStarted => 222,
            ExitCode::InvalidAuctionConfig => 223,
            ExitCode::IncorrectWorkchain => 333,
            ExitCode::NoFirstZeroByte => 413,
            ExitCode::BadSubdomainLength => 70,
            ExitCode::Unknown(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success | ExitCode::SuccessAlt)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode::from_code(code)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Unknown(code) => write!(f, "unknown exit code {}", code),
            known => write!(f, "exit code {} ({:?})", known.code(), known),
        }
    }
}
