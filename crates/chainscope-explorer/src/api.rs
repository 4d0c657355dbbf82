//! Etherscan-style endpoint URLs and the shapes of their `result` payloads.

use serde::{Deserialize, Serialize};

use crate::config::{ExplorerConfig, Network};

pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// URL builder for one network. The network is resolved here, up front, and
/// reaches the data states only as part of their URL arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Api {
    base: String,
    api_key: Option<String>,
}

impl Api {
    pub fn new(base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base: base.into(),
            api_key,
        }
    }

    pub fn for_network(config: &ExplorerConfig, network: Network) -> Self {
        Self::new(config.endpoints.api(network), config.api_key.clone())
    }

    pub fn url(&self, module: &str, action: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}?module={module}&action={action}", self.base);
        for (name, value) in params {
            url.push_str(&format!("&{name}={value}"));
        }
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&apikey={key}"));
        }
        url
    }

    pub fn eth_price(&self) -> String {
        self.url("stats", "ethprice", &[])
    }

    pub fn eth_supply(&self) -> String {
        self.url("stats", "ethsupply", &[])
    }

    pub fn gas_oracle(&self) -> String {
        self.url("gastracker", "gasoracle", &[])
    }

    pub fn block_reward(&self, number: u64) -> String {
        self.url("block", "getblockreward", &[("blockno", number.to_string())])
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EthPrice {
    pub ethusd: String,
    pub ethbtc: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasOracle {
    pub last_block: String,
    pub safe_gas_price: String,
    pub propose_gas_price: String,
    pub fast_gas_price: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReward {
    pub block_number: String,
    pub time_stamp: String,
    pub block_miner: String,
    pub block_reward: String,
}

/// `wei` as ether with two decimals, truncated.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let cents = (wei % WEI_PER_ETHER) / (WEI_PER_ETHER / 100);
    format!("{whole}.{cents:02} ETH")
}

/// Parses a decimal wei string as returned by the API.
pub fn parse_wei(raw: &str) -> anyhow::Result<u128> {
    raw.trim()
        .parse::<u128>()
        .map_err(|e| anyhow::anyhow!("invalid wei amount '{raw}': {e}"))
}
