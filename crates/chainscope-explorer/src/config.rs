use anyhow::{Context, Result, anyhow};
use chainscope_core::HttpConfig;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAINNET_API: &str = "https://api.etherscan.io/api";
pub const DEFAULT_TESTNET_API: &str = "https://api-sepolia.etherscan.io/api";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl std::str::FromStr for Network {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" | "sepolia" => Ok(Network::Testnet),
            _ => Err(anyhow!("Invalid network '{s}'. Valid options: mainnet, testnet")),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

/// Chainscope - terminal blockchain explorer
///
/// Configuration priority: CLI args > Environment variables > config file > Defaults
#[derive(Parser, Debug)]
#[command(name = "chainscope")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Network status, gas, price and block lookups", long_about = None)]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(short, long, env = "CHAINSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Network: mainnet or testnet
    #[arg(short, long, env = "CHAINSCOPE_NETWORK", value_parser = clap::value_parser!(Network))]
    pub network: Option<Network>,

    /// API key appended to every request
    #[arg(long, env = "CHAINSCOPE_API_KEY")]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub page: Page,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Page {
    /// Price and gas at a glance
    Status,
    /// Gas oracle tiers
    Gas,
    /// ETH price in USD and BTC
    Price,
    /// Total ether supply
    Supply,
    /// Block reward lookup (latest block when no number is given)
    Block { number: Option<u64> },
}

impl Page {
    pub fn title(&self) -> String {
        match self {
            Page::Status => "status".into(),
            Page::Gas => "gas".into(),
            Page::Price => "price".into(),
            Page::Supply => "supply".into(),
            Page::Block { number: Some(n) } => format!("block {n}"),
            Page::Block { number: None } => "latest block".into(),
        }
    }
}

/// API base URL per network.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub mainnet: String,
    pub testnet: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            mainnet: DEFAULT_MAINNET_API.into(),
            testnet: DEFAULT_TESTNET_API.into(),
        }
    }
}

impl Endpoints {
    pub fn api(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.mainnet,
            Network::Testnet => &self.testnet,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExplorerConfig {
    pub network: Network,
    pub api_key: Option<String>,
    pub http: HttpConfig,
    pub endpoints: Endpoints,
}

impl ExplorerConfig {
    /// File (if any), then CLI/env overrides.
    pub fn load(cli: &CliArgs) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::load_from_file(path)?
            }
            None => Self::default(),
        };
        if let Some(network) = cli.network {
            config.network = network;
        }
        if let Some(key) = &cli.api_key {
            config.api_key = Some(key.clone());
        }
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn validate(&self) -> Result<()> {
        for network in [Network::Mainnet, Network::Testnet] {
            let url = self.endpoints.api(network);
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!("{network} endpoint must be an http(s) URL, got '{url}'"));
            }
        }
        if self.http.timeout_ms == 0 {
            return Err(anyhow!("http.timeout_ms must be positive"));
        }
        Ok(())
    }
}
