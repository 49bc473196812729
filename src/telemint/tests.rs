//! Tests for the telemint module

use super::*;
use crate::tvm::{Address, Builder, serialize_boc};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Mutex;

const CONTRACT: &str = "EQBqs8pl1dJOZeXC3lspnYneBHag7VbQ9zKkv4IpQT3nnn5g";
const BIDDER: &str = "EQAV4pVmtxgOXz-Aj241MUePgGAjkn7znrHZRXb6cCGiRJ_b";
const BENEFICIARY: &str = "EQBAjaOyi2wGWlk-EDkSabqqnF-MrrwMadnwqrurKpkla9nE";

const TOKEN_NAME_METHOD: &str = "get_telemint_token_name";
const AUCTION_STATE_METHOD: &str = "get_telemint_auction_state";
const AUCTION_CONFIG_METHOD: &str = "get_telemint_auction_config";

fn addr(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

fn boc_of(build: impl FnOnce(&mut Builder)) -> Vec<u8> {
    let mut builder = Builder::new();
    build(&mut builder);
    serialize_boc(&builder.build().unwrap(), false).unwrap()
}

fn flat_username_boc(name: &str) -> Vec<u8> {
    boc_of(|b| {
        b.store_byte(TOKEN_TYPE_USERNAME).unwrap();
        b.store_byte(name.len() as u8).unwrap();
        b.store_bytes(name.as_bytes()).unwrap();
    })
}

fn flat_state_boc(bidder: Option<&Address>, bid: u64, bid_ts: u32, min_bid: u64, end_time: u32) -> Vec<u8> {
    boc_of(|b| {
        b.store_address(bidder).unwrap();
        b.store_u64(bid).unwrap();
        b.store_u32(bid_ts).unwrap();
        b.store_u64(min_bid).unwrap();
        b.store_u32(end_time).unwrap();
    })
}

fn flat_config_boc(beneficiary: &Address) -> Vec<u8> {
    boc_of(|b| {
        b.store_address(Some(beneficiary)).unwrap();
        b.store_u64(5_050_000_000_000).unwrap();
        b.store_u64(0).unwrap();
        b.store_byte(5).unwrap();
        b.store_u32(3600).unwrap();
        b.store_u32(604_800).unwrap();
    })
}

fn dage_responses() -> RawResponses {
    RawResponses {
        token_name: flat_username_boc("dage"),
        auction_state: Some(flat_state_boc(
            Some(&addr(BIDDER)),
            5_050_000_000_000,
            1_673_275_014,
            5_302_500_000_000,
            1_673_879_814,
        )),
        auction_config: Some(flat_config_boc(&addr(BENEFICIARY))),
    }
}

fn dage_provider() -> StaticProvider {
    let responses = dage_responses();
    StaticProvider::new()
        .with_response(TOKEN_NAME_METHOD, responses.token_name)
        .with_response(AUCTION_STATE_METHOD, responses.auction_state.unwrap())
        .with_response(AUCTION_CONFIG_METHOD, responses.auction_config.unwrap())
}

fn assert_dage(snapshot: &Snapshot) {
    assert_eq!(snapshot.address.to_string(), CONTRACT);
    assert_eq!(snapshot.token_name, TokenName::Username("dage".to_string()));

    let state = snapshot.auction_state.as_ref().unwrap();
    assert_eq!(state.bidder_address().unwrap().to_string(), BIDDER);
    assert_eq!(state.bid(), 5_050_000_000_000);
    assert_eq!(state.bid_ts(), 1_673_275_014);
    assert_eq!(state.min_bid, 5_302_500_000_000);
    assert_eq!(state.end_time, 1_673_879_814);

    let config = snapshot.auction_config.as_ref().unwrap();
    assert_eq!(config.beneficiary_address.to_string(), BENEFICIARY);
    assert_eq!(config.initial_min_bid, 5_050_000_000_000);
    assert_eq!(config.max_bid, 0);
    assert_eq!(config.min_bid_step, 5);
    assert_eq!(config.min_extend_time, 3600);
    assert_eq!(config.duration, 604_800);
}

/// Provider wrapper that records which methods were called
struct RecordingProvider {
    inner: StaticProvider,
    calls: Mutex<Vec<String>>,
}

impl RecordingProvider {
    fn new(inner: StaticProvider) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GetMethodProvider for RecordingProvider {
    async fn call_get_method(
        &self,
        address: &Address,
        method: &str,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(method.to_string());
        self.inner.call_get_method(address, method).await
    }
}

#[tokio::test]
async fn test_load_dage_end_to_end() {
    let loader = SnapshotLoader::new(dage_provider(), None);
    let snapshot = loader.load(&addr(CONTRACT)).await.unwrap();
    assert_dage(&snapshot);
}

#[test]
fn test_decode_dage_without_io() {
    let snapshot = Snapshot::decode(&addr(CONTRACT), &dage_responses(), Layout::Flat).unwrap();
    assert_dage(&snapshot);
}

#[tokio::test]
async fn test_no_auction_exit_code_skips_config() {
    let provider = RecordingProvider::new(
        StaticProvider::new()
            .with_response(TOKEN_NAME_METHOD, flat_username_boc("dage"))
            .with_error(AUCTION_STATE_METHOD, FetchError::ExitCode(ExitCode::NoAuction))
            .with_response(AUCTION_CONFIG_METHOD, flat_config_boc(&addr(BENEFICIARY))),
    );
    let loader = SnapshotLoader::new(provider, None);

    let snapshot = loader.load(&addr(CONTRACT)).await.unwrap();
    assert_eq!(snapshot.auction_state, None);
    assert_eq!(snapshot.auction_config, None);
    assert_eq!(
        loader.provider().calls(),
        vec![TOKEN_NAME_METHOD.to_string(), AUCTION_STATE_METHOD.to_string()]
    );
}

#[tokio::test]
async fn test_empty_state_means_no_auction() {
    let provider = StaticProvider::new()
        .with_response(TOKEN_NAME_METHOD, flat_username_boc("dage"))
        .with_response(AUCTION_STATE_METHOD, Vec::new());
    let loader = SnapshotLoader::new(provider, None);

    let snapshot = loader.load(&addr(CONTRACT)).await.unwrap();
    assert!(snapshot.auction_state.is_none());
    assert!(snapshot.auction_config.is_none());
}

#[tokio::test]
async fn test_auction_without_bids() {
    let provider = StaticProvider::new()
        .with_response(TOKEN_NAME_METHOD, flat_username_boc("dage"))
        .with_response(
            AUCTION_STATE_METHOD,
            flat_state_boc(None, 0, 0, 5_050_000_000_000, 1_673_879_814),
        )
        .with_response(AUCTION_CONFIG_METHOD, flat_config_boc(&addr(BENEFICIARY)));
    let loader = SnapshotLoader::new(provider, None);

    let snapshot = loader.load(&addr(CONTRACT)).await.unwrap();
    let state = snapshot.auction_state.unwrap();
    assert!(!state.has_bids());
    assert_eq!(state.bidder_address(), None);
    assert_eq!(state.bid(), 0);
    assert_eq!(state.min_bid, 5_050_000_000_000);
    assert!(snapshot.auction_config.is_some());
}

#[tokio::test]
async fn test_other_exit_code_is_fetch_failure() {
    let provider = StaticProvider::new()
        .with_response(TOKEN_NAME_METHOD, flat_username_boc("dage"))
        .with_error(AUCTION_STATE_METHOD, FetchError::ExitCode(ExitCode::from_code(11)));
    let loader = SnapshotLoader::new(provider, None);

    match loader.load(&addr(CONTRACT)).await {
        Err(TelemintError::FetchFailed { method, source }) => {
            assert_eq!(method, AUCTION_STATE_METHOD);
            assert_eq!(source, FetchError::ExitCode(ExitCode::Unknown(11)));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_token_name_is_fetch_failure() {
    let loader = SnapshotLoader::new(StaticProvider::new(), None);
    let err = loader.load(&addr(CONTRACT)).await.unwrap_err();
    assert_eq!(
        err,
        TelemintError::FetchFailed {
            method: TOKEN_NAME_METHOD.to_string(),
            source: FetchError::Empty,
        }
    );
}

#[tokio::test]
async fn test_missing_config_is_fetch_failure() {
    let responses = dage_responses();
    let provider = StaticProvider::new()
        .with_response(TOKEN_NAME_METHOD, responses.token_name)
        .with_response(AUCTION_STATE_METHOD, responses.auction_state.unwrap())
        .with_error(AUCTION_CONFIG_METHOD, FetchError::Transport("timeout".to_string()));
    let loader = SnapshotLoader::new(provider, None);

    assert!(matches!(
        loader.load(&addr(CONTRACT)).await,
        Err(TelemintError::FetchFailed { source: FetchError::Transport(_), .. })
    ));
}

#[tokio::test]
async fn test_unknown_token_type_propagates() {
    let provider = StaticProvider::new().with_response(
        TOKEN_NAME_METHOD,
        boc_of(|b| {
            b.store_byte(0x7f).unwrap();
            b.store_byte(1).unwrap();
            b.store_byte(b'x').unwrap();
        }),
    );
    let loader = SnapshotLoader::new(provider, None);
    assert_eq!(
        loader.load(&addr(CONTRACT)).await,
        Err(TelemintError::UnknownTokenType(0x7f))
    );
}

#[tokio::test]
async fn test_malformed_responses() {
    let garbage = StaticProvider::new().with_response(TOKEN_NAME_METHOD, vec![0xb5, 0xee, 0x9c]);
    let loader = SnapshotLoader::new(garbage, None);
    assert!(matches!(
        loader.load(&addr(CONTRACT)).await,
        Err(TelemintError::MalformedBoc(_))
    ));

    // Valid BoC, but the state cell stops after the bidder address
    let truncated_state = boc_of(|b| {
        b.store_address(Some(&addr(BIDDER))).unwrap();
    });
    let provider = StaticProvider::new()
        .with_response(TOKEN_NAME_METHOD, flat_username_boc("dage"))
        .with_response(AUCTION_STATE_METHOD, truncated_state);
    let loader = SnapshotLoader::new(provider, None);
    assert!(matches!(
        loader.load(&addr(CONTRACT)).await,
        Err(TelemintError::MalformedCell(_))
    ));
}

#[tokio::test]
async fn test_tlb_layout_end_to_end() {
    let mut last_bid = Builder::new();
    last_bid.store_address(Some(&addr(BIDDER))).unwrap();
    last_bid.store_coins(5_050_000_000_000).unwrap();
    last_bid.store_u32(1_673_275_014).unwrap();
    let last_bid = last_bid.build().unwrap();

    let name = boc_of(|b| {
        b.store_byte(4).unwrap();
        b.store_bytes(b"dage").unwrap();
    });
    let state = boc_of(|b| {
        b.store_maybe_ref(Some(last_bid)).unwrap();
        b.store_coins(5_302_500_000_000).unwrap();
        b.store_u32(1_673_879_814).unwrap();
    });
    let config = boc_of(|b| {
        b.store_address(Some(&addr(BENEFICIARY))).unwrap();
        b.store_coins(5_050_000_000_000).unwrap();
        b.store_coins(0).unwrap();
        b.store_byte(5).unwrap();
        b.store_u32(3600).unwrap();
        b.store_u32(604_800).unwrap();
    });

    let provider = StaticProvider::new()
        .with_response(TOKEN_NAME_METHOD, name)
        .with_response(AUCTION_STATE_METHOD, state)
        .with_response(AUCTION_CONFIG_METHOD, config);
    let config = LoaderConfig {
        layout: Layout::Tlb,
        ..Default::default()
    };
    let loader = SnapshotLoader::new(provider, Some(config));

    let snapshot = loader.load(&addr(CONTRACT)).await.unwrap();
    assert_dage(&snapshot);
}

#[tokio::test]
async fn test_custom_method_names() {
    let responses = dage_responses();
    let provider = StaticProvider::new().with_response("token_name", responses.token_name);
    let config = LoaderConfig {
        token_name_method: "token_name".to_string(),
        auction_state_method: "auction_state".to_string(),
        ..Default::default()
    };
    let loader = SnapshotLoader::new(provider, Some(config));

    let snapshot = loader.load(&addr(CONTRACT)).await.unwrap();
    assert_eq!(snapshot.token_name.as_str(), "dage");
    assert!(snapshot.auction_state.is_none());
}

#[test]
fn test_load_many_keeps_order() {
    let loader = SnapshotLoader::new(dage_provider(), None);
    let first = addr(CONTRACT);
    let second = Address::new(0, [0u8; 32]);

    let results = tokio_test::block_on(loader.load_many(&[first.clone(), second.clone()]));
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().address, first);
    assert_eq!(results[1].as_ref().unwrap().address, second);
}

#[test]
fn test_decode_ignores_config_without_state() {
    let mut responses = dage_responses();
    responses.auction_state = None;

    let snapshot = Snapshot::decode(&addr(CONTRACT), &responses, Layout::Flat).unwrap();
    assert!(snapshot.auction_state.is_none());
    assert!(snapshot.auction_config.is_none());
}

#[test]
fn test_decode_requires_config_for_running_auction() {
    for missing in [None, Some(Vec::new())] {
        let mut responses = dage_responses();
        responses.auction_config = missing;

        assert_eq!(
            Snapshot::decode(&addr(CONTRACT), &responses, Layout::Flat),
            Err(TelemintError::FetchFailed {
                method: AUCTION_CONFIG_METHOD.to_string(),
                source: FetchError::Empty,
            })
        );
    }
}

#[tokio::test]
async fn test_load_and_decode_agree_on_missing_config() {
    let mut responses = dage_responses();
    responses.auction_config = None;
    let provider = StaticProvider::new()
        .with_response(TOKEN_NAME_METHOD, responses.token_name.clone())
        .with_response(AUCTION_STATE_METHOD, responses.auction_state.clone().unwrap());
    let loader = SnapshotLoader::new(provider, None);

    assert_eq!(
        loader.load(&addr(CONTRACT)).await,
        Snapshot::decode(&addr(CONTRACT), &responses, Layout::Flat)
    );
}

#[test]
fn test_decode_empty_state_means_no_auction() {
    let mut responses = dage_responses();
    responses.auction_state = Some(Vec::new());

    let snapshot = Snapshot::decode(&addr(CONTRACT), &responses, Layout::Flat).unwrap();
    assert!(snapshot.auction_state.is_none());
    assert!(snapshot.auction_config.is_none());
}

#[test]
fn test_decode_is_all_or_nothing() {
    let mut responses = dage_responses();
    responses.auction_config = Some(vec![0u8; 8]);

    assert!(matches!(
        Snapshot::decode(&addr(CONTRACT), &responses, Layout::Flat),
        Err(TelemintError::MalformedBoc(_))
    ));
}

#[test]
fn test_snapshot_display() {
    let snapshot = Snapshot::decode(&addr(CONTRACT), &dage_responses(), Layout::Flat).unwrap();
    let rendered = snapshot.to_string();

    assert!(rendered.starts_with(&format!("Telemint item at {}\n", CONTRACT)));
    assert!(rendered.contains("  token_name: @dage\n"));
    assert!(rendered.contains(&format!("    bidder_address: {}\n", BIDDER)));
    assert!(rendered.contains("    bid: 5050000000000\n"));
    assert!(rendered.contains("    min_extend_time: 3600\n"));
}

#[test]
fn test_snapshot_json() {
    let snapshot = Snapshot::decode(&addr(CONTRACT), &dage_responses(), Layout::Flat).unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(json["address"], CONTRACT);
    assert_eq!(json["token_name"]["type"], "username");
    assert_eq!(json["token_name"]["value"], "dage");
    assert_eq!(json["auction_state"]["last_bid"]["bidder_address"], BIDDER);
    assert_eq!(json["auction_state"]["last_bid"]["bid_ts"], 1_673_275_014u32);
    assert_eq!(json["auction_config"]["beneficiary_address"], BENEFICIARY);
    assert_eq!(json["auction_config"]["duration"], 604_800u32);
}

#[test]
fn test_tvm_errors_convert() {
    use crate::tvm::TvmError;

    assert_eq!(
        TelemintError::from(TvmError::MalformedBoc("x".to_string())),
        TelemintError::MalformedBoc("x".to_string())
    );
    assert_eq!(
        TelemintError::from(TvmError::MalformedCell("y".to_string())),
        TelemintError::MalformedCell("y".to_string())
    );
}
