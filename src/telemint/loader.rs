//! Snapshot assembly on top of a get-method provider
//!
//! The loader only knows how to ask for raw get-method results; how they
//! travel (liteserver, HTTP API, fixtures) is the provider's business.

use crate::telemint::error::{FetchError, Result, TelemintError};
use crate::telemint::exit_code::ExitCode;
use crate::telemint::layout::{
    Layout, decode_auction_config_boc, decode_auction_state_boc, decode_token_name_boc,
};
use crate::telemint::types::{RawResponses, Snapshot};
use crate::tvm::Address;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;

/// Something that can run a get-method on a contract and hand back the
/// resulting cell as BoC bytes
#[async_trait]
pub trait GetMethodProvider: Send + Sync {
    async fn call_get_method(
        &self,
        address: &Address,
        method: &str,
    ) -> std::result::Result<Vec<u8>, FetchError>;
}

/// In-memory provider answering every address with the same canned responses
///
/// Methods without a response report [`FetchError::Empty`].
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    responses: HashMap<String, std::result::Result<Vec<u8>, FetchError>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, method: impl Into<String>, boc: Vec<u8>) -> Self {
        self.responses.insert(method.into(), Ok(boc));
        self
    }

    pub fn with_error(mut self, method: impl Into<String>, error: FetchError) -> Self {
        self.responses.insert(method.into(), Err(error));
        self
    }
}

#[async_trait]
impl GetMethodProvider for StaticProvider {
    async fn call_get_method(
        &self,
        _address: &Address,
        method: &str,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        self.responses
            .get(method)
            .cloned()
            .unwrap_or(Err(FetchError::Empty))
    }
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub layout: Layout,
    pub token_name_method: String,
    pub auction_state_method: String,
    pub auction_config_method: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Flat,
            token_name_method: "get_telemint_token_name".to_string(),
            auction_state_method: "get_telemint_auction_state".to_string(),
            auction_config_method: "get_telemint_auction_config".to_string(),
        }
    }
}

pub struct SnapshotLoader<P> {
    provider: P,
    config: LoaderConfig,
}

impl<P: GetMethodProvider> SnapshotLoader<P> {
    pub fn new(provider: P, config: Option<LoaderConfig>) -> Self {
        Self {
            provider,
            config: config.unwrap_or_default(),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn fetch(&self, address: &Address, method: &str) -> std::result::Result<Vec<u8>, FetchError> {
        log::trace!("Calling {} on {}", method, address);
        match self.provider.call_get_method(address, method).await {
            Ok(bytes) if bytes.is_empty() => Err(FetchError::Empty),
            other => other,
        }
    }

    async fn fetch_required(&self, address: &Address, method: &str) -> Result<Vec<u8>> {
        self.fetch(address, method)
            .await
            .map_err(|source| TelemintError::FetchFailed {
                method: method.to_string(),
                source,
            })
    }

    /// Fetches and decodes the full state of one item
    ///
    /// An auction state call that comes back empty or with exit code 219
    /// means no auction is running; the config is then not requested.
    pub async fn load(&self, address: &Address) -> Result<Snapshot> {
        let layout = self.config.layout;
        log::debug!("Loading Telemint item {} ({} layout)", address, layout);

        let name_boc = self
            .fetch_required(address, &self.config.token_name_method)
            .await?;
        let token_name = decode_token_name_boc(&name_boc, layout)?;

        let method = &self.config.auction_state_method;
        let auction_state = match self.fetch(address, method).await {
            Ok(boc) => Some(decode_auction_state_boc(&boc, layout)?),
            Err(FetchError::Empty) | Err(FetchError::ExitCode(ExitCode::NoAuction)) => {
                log::debug!("No auction running for {}", address);
                None
            }
            Err(source) => {
                return Err(TelemintError::FetchFailed {
                    method: method.clone(),
                    source,
                });
            }
        };

        let auction_config = match auction_state {
            Some(_) => {
                let boc = self
                    .fetch_required(address, &self.config.auction_config_method)
                    .await?;
                Some(decode_auction_config_boc(&boc, layout)?)
            }
            None => None,
        };

        Ok(Snapshot {
            address: address.clone(),
            token_name,
            auction_state,
            auction_config,
        })
    }

    /// Loads several items concurrently, one result per address in order
    pub async fn load_many(&self, addresses: &[Address]) -> Vec<Result<Snapshot>> {
        let results = join_all(addresses.iter().map(|address| self.load(address))).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            log::warn!("{} of {} snapshots failed to load", failed, addresses.len());
        }

        results
    }
}

impl Snapshot {
    /// Decodes already fetched get-method results without any I/O
    ///
    /// Follows the same rules as [`SnapshotLoader::load`]: an absent or empty
    /// auction state means no auction and the config is ignored; a running
    /// auction without a config response is a `FetchFailed` error.
    pub fn decode(address: &Address, responses: &RawResponses, layout: Layout) -> Result<Snapshot> {
        fn present(response: &Option<Vec<u8>>) -> Option<&[u8]> {
            response.as_deref().filter(|boc| !boc.is_empty())
        }

        let methods = LoaderConfig::default();

        if responses.token_name.is_empty() {
            return Err(TelemintError::FetchFailed {
                method: methods.token_name_method,
                source: FetchError::Empty,
            });
        }
        let token_name = decode_token_name_boc(&responses.token_name, layout)?;

        let auction_state = present(&responses.auction_state)
            .map(|boc| decode_auction_state_boc(boc, layout))
            .transpose()?;

        let auction_config = match (&auction_state, present(&responses.auction_config)) {
            (Some(_), Some(boc)) => Some(decode_auction_config_boc(boc, layout)?),
            (Some(_), None) => {
                return Err(TelemintError::FetchFailed {
                    method: methods.auction_config_method,
                    source: FetchError::Empty,
                });
            }
            (None, _) => None,
        };

        Ok(Snapshot {
            address: address.clone(),
            token_name,
            auction_state,
            auction_config,
        })
    }
}
