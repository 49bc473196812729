use clap::{Parser, Subcommand};
use crate::telemint::{Layout, LoaderConfig, SnapshotLoader, StaticProvider};
use crate::tvm::{Address, Slice, deserialize_boc_roots, has_boc_magic};
use crate::utils::method_id;
use anyhow::{Context, Result};
use base64::Engine;
use std::str::FromStr;
use std::time::Instant;

/// telemint-rs CLI
#[derive(Parser, Debug)]
#[command(name = "telemint-rs")]
#[command(about = "Decode Telemint NFT get-method results", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode the get-method results of one Telemint item
    Decode {
        /// Item contract address
        #[arg(short = 'a', long)]
        address: String,
        /// get_telemint_token_name result (hex, base64 or @file)
        #[arg(short = 'n', long)]
        token_name: String,
        /// get_telemint_auction_state result; omit when no auction is running
        #[arg(short = 's', long)]
        auction_state: Option<String>,
        /// get_telemint_auction_config result
        #[arg(short = 'c', long)]
        auction_config: Option<String>,
        /// Field layout of the cells (flat or tlb)
        #[arg(short = 'l', long, default_value = "flat")]
        layout: Layout,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the cell tree of a BoC
    Inspect {
        /// BoC bytes (hex, base64 or @file)
        #[arg(short = 'b', long)]
        boc: String,
    },
    /// Print the ids of the Telemint get-methods
    MethodIds,
}

/// Reads BoC bytes given as `@path`, hex or base64
///
/// Text valid in both encodings goes to whichever decodes to a BoC magic,
/// falling back to hex.
async fn read_boc_arg(arg: &str) -> Result<Vec<u8>> {
    if let Some(path) = arg.strip_prefix('@') {
        return tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read BoC from {}", path));
    }

    let compact: String = arg.chars().filter(|c| !c.is_whitespace()).collect();
    let from_hex = hex::decode(&compact).ok();
    let from_base64 = base64::engine::general_purpose::STANDARD
        .decode(&compact)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(&compact))
        .ok();

    match (from_hex, from_base64) {
        (Some(bytes), _) if has_boc_magic(&bytes) => Ok(bytes),
        (_, Some(bytes)) if has_boc_magic(&bytes) => Ok(bytes),
        (Some(bytes), _) | (None, Some(bytes)) => {
            log::warn!("BoC argument does not start with a BoC magic number");
            Ok(bytes)
        }
        (None, None) => Err(anyhow::anyhow!("BoC argument is neither hex nor base64")),
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Decode {
                address,
                token_name,
                auction_state,
                auction_config,
                layout,
                json,
            } => {
                self.execute_decode(
                    address,
                    token_name,
                    auction_state.as_deref(),
                    auction_config.as_deref(),
                    *layout,
                    *json,
                )
                .await
            }
            Commands::Inspect { boc } => self.execute_inspect(boc).await,
            Commands::MethodIds => self.execute_method_ids(),
        }
    }

    async fn execute_decode(
        &self,
        address: &str,
        token_name: &str,
        auction_state: Option<&str>,
        auction_config: Option<&str>,
        layout: Layout,
        json: bool,
    ) -> Result<()> {
        let address = Address::from_str(address)?;
        let config = LoaderConfig {
            layout,
            ..Default::default()
        };

        let mut provider = StaticProvider::new()
            .with_response(config.token_name_method.clone(), read_boc_arg(token_name).await?);
        if let Some(state) = auction_state {
            provider = provider
                .with_response(config.auction_state_method.clone(), read_boc_arg(state).await?);
        }
        if let Some(auction_config) = auction_config {
            provider = provider.with_response(
                config.auction_config_method.clone(),
                read_boc_arg(auction_config).await?,
            );
        }

        let loader = SnapshotLoader::new(provider, Some(config));

        let op_start = Instant::now();
        let snapshot = loader.load(&address).await?;
        log::info!("⏱️  decode: {:.3}ms", op_start.elapsed().as_secs_f64() * 1000.0);

        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            print!("{}", snapshot);
        }
        Ok(())
    }

    async fn execute_inspect(&self, boc: &str) -> Result<()> {
        let bytes = read_boc_arg(boc).await?;
        let roots = deserialize_boc_roots(&bytes)?;
        log::info!("BoC of {} bytes with {} root(s)", bytes.len(), roots.len());

        for (i, root) in roots.iter().enumerate() {
            let slice = Slice::new(root.clone());
            println!(
                "root #{}: hash {} depth {} ({} bits, {} refs)",
                i,
                hex::encode(root.hash()),
                root.depth(),
                slice.remaining_bits(),
                slice.remaining_refs()
            );
            print!("{}", root);
        }
        Ok(())
    }

    fn execute_method_ids(&self) -> Result<()> {
        let config = LoaderConfig::default();
        for method in [
            &config.token_name_method,
            &config.auction_state_method,
            &config.auction_config_method,
        ] {
            println!("{} {}", method_id(method), method);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_boc_arg_formats() {
        let bytes = vec![0xb5, 0xee, 0x9c, 0x72];
        assert_eq!(read_boc_arg("b5ee9c72").await.unwrap(), bytes);
        assert_eq!(read_boc_arg("b5ee 9c72").await.unwrap(), bytes);
        assert_eq!(read_boc_arg("te6ccg==").await.unwrap(), bytes);
        assert!(read_boc_arg("@/nonexistent/telemint.boc").await.is_err());
        assert!(read_boc_arg("not a boc!").await.is_err());
    }

    #[tokio::test]
    async fn test_read_boc_arg_prefers_magic() {
        use crate::tvm::{Builder, boc_to_base64, boc_to_hex, serialize_boc};

        let mut builder = Builder::new();
        builder.store_u32(0xDEADBEEF).unwrap();
        let cell = builder.build().unwrap();
        let bytes = serialize_boc(&cell, true).unwrap();

        let b64 = boc_to_base64(&cell, true).unwrap();
        assert!(b64.starts_with("te6cc"));
        assert_eq!(read_boc_arg(&b64).await.unwrap(), bytes);
        assert_eq!(read_boc_arg(&boc_to_hex(&cell, true).unwrap()).await.unwrap(), bytes);

        // "abcd" is valid in both encodings; neither yields a magic, so hex wins
        assert_eq!(read_boc_arg("abcd").await.unwrap(), vec![0xab, 0xcd]);
    }

    #[test]
    fn test_parse_decode_command() {
        let cli = Cli::try_parse_from([
            "telemint-rs",
            "decode",
            "--address",
            "EQBqs8pl1dJOZeXC3lspnYneBHag7VbQ9zKkv4IpQT3nnn5g",
            "--token-name",
            "b5ee9c72",
            "--layout",
            "tlb",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Decode {
                layout,
                json,
                auction_state,
                ..
            } => {
                assert_eq!(layout, Layout::Tlb);
                assert!(json);
                assert!(auction_state.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_decode_and_inspect() {
        use crate::tvm::{Builder, boc_to_hex};

        let mut name = Builder::new();
        name.store_byte(crate::telemint::TOKEN_TYPE_USERNAME).unwrap();
        name.store_byte(4).unwrap();
        name.store_bytes(b"dage").unwrap();
        let name_hex = boc_to_hex(&name.build().unwrap(), true).unwrap();

        let decode = Cli::try_parse_from([
            "telemint-rs",
            "decode",
            "-a",
            "0:0000000000000000000000000000000000000000000000000000000000000000",
            "-n",
            &name_hex,
        ])
        .unwrap();
        decode.execute().await.unwrap();

        let inspect = Cli::try_parse_from(["telemint-rs", "inspect", "--boc", &name_hex]).unwrap();
        inspect.execute().await.unwrap();
    }
}
