//! Explorer pages.
//!
//! A page is a component function: it declares its data states through
//! `remember_data_state` and returns a view over them. [`run`] renders the
//! component repeatedly on one scope, waiting for the fetches each pass
//! launched, until a pass launches nothing. Unchanged arguments never
//! refetch, so this settles once every prerequisite has resolved.

use std::rc::Rc;

use chainscope_core::{DataState, FetchConfig, HttpClient, Scope, remember_data_state};
use chainscope_ui::*;

use crate::api::{Api, BlockReward, EthPrice, GasOracle, WEI_PER_ETHER, format_ether, parse_wei};
use crate::config::{Network, Page};
use crate::tasks::LocalTasks;

const MAX_PASSES: usize = 8;

pub struct PageContext {
    pub network: Network,
    pub api: Api,
    pub client: Rc<dyn HttpClient>,
}

trait View {
    fn render(&self) -> Fragment;
}

/// Renders `page` once all of its data has settled.
pub async fn run(page: &Page, ctx: &PageContext) -> Fragment {
    let tasks = LocalTasks::new();
    let scope = Scope::with_spawner(tasks.clone());
    let mut view = scope.run(|| mount(page, ctx));
    for pass in 1..=MAX_PASSES {
        let launched = tasks.drain().await;
        log::debug!("{}: render pass {pass} launched {launched} fetch(es)", page.title());
        if launched == 0 {
            break;
        }
        if pass == MAX_PASSES {
            log::warn!("{}: still fetching after {MAX_PASSES} passes", page.title());
            break;
        }
        view = scope.run(|| mount(page, ctx));
    }
    let header = Text(format!("== {} ({}) ==", page.title(), ctx.network));
    let body = view.render();
    scope.dispose();
    Column(vec![header, body])
}

fn mount(page: &Page, ctx: &PageContext) -> Box<dyn View> {
    match page {
        Page::Status => Box::new(StatusView::mount(ctx)),
        Page::Gas => Box::new(GasView::mount(ctx)),
        Page::Price => Box::new(PriceView::mount(ctx)),
        Page::Supply => Box::new(SupplyView::mount(ctx)),
        Page::Block { number } => Box::new(BlockView::mount(ctx, *number)),
    }
}

fn row(label: &str, value: Fragment) -> Fragment {
    Row(vec![Text(label), value])
}

fn use_gas(ctx: &PageContext) -> DataState<GasOracle> {
    remember_data_state(
        "gas_oracle",
        FetchConfig::json(ctx.client.clone(), ctx.api.gas_oracle()).error_prefix("gas:"),
    )
}

fn use_price(ctx: &PageContext) -> DataState<EthPrice> {
    remember_data_state(
        "eth_price",
        FetchConfig::json(ctx.client.clone(), ctx.api.eth_price()).error_prefix("price:"),
    )
}

fn usd(price: &DataState<EthPrice>) -> DataState<f64> {
    price.transform(|p| Ok(p.ethusd.parse::<f64>()?))
}

struct StatusView {
    usd: DataState<f64>,
    gas: DataState<GasOracle>,
    summary: DataState<(f64, GasOracle)>,
}

impl StatusView {
    fn mount(ctx: &PageContext) -> Self {
        let usd = usd(&use_price(ctx));
        let gas = use_gas(ctx);
        let summary = usd.compose(&gas);
        Self { usd, gas, summary }
    }
}

impl View for StatusView {
    fn render(&self) -> Fragment {
        let dollars = RenderConfig::new().children(|usd: &f64, _| Ok(Text(format!("${usd:.2}"))));
        let tiers = RenderConfig::new()
            .children(|g: &GasOracle, _| {
                Ok(Text(format!(
                    "{} / {} / {} gwei",
                    g.safe_gas_price, g.propose_gas_price, g.fast_gas_price
                )))
            })
            .error_substitute("n/a");
        let summary = RenderConfig::new()
            .children(|(usd, gas): &(f64, GasOracle), _| {
                // 21k gas transfer at the safe price, priced in USD.
                let gwei: f64 = gas.safe_gas_price.parse()?;
                let fee = gwei * 21_000.0 * 1e-9 * usd;
                Ok(Text(format!("transfer fee ~${fee:.2}")))
            })
            .class_name("summary");
        Column(vec![
            row("ETH/USD", self.usd.render(&dollars)),
            row("Gas", self.gas.render(&tiers)),
            row("Summary", self.summary.render(&summary)),
        ])
    }
}

struct GasView {
    gas: DataState<GasOracle>,
}

impl GasView {
    fn mount(ctx: &PageContext) -> Self {
        Self { gas: use_gas(ctx) }
    }
}

impl View for GasView {
    fn render(&self) -> Fragment {
        let tier = |field: &str| {
            RenderConfig::<GasOracle>::new()
                .field(field)
                .static_content("000")
                .error_substitute("n/a")
        };
        Column(vec![
            row("Last block", self.gas.render(&RenderConfig::new().field("LastBlock"))),
            row("Safe (gwei)", self.gas.render(&tier("SafeGasPrice"))),
            row("Propose (gwei)", self.gas.render(&tier("ProposeGasPrice"))),
            row("Fast (gwei)", self.gas.render(&tier("FastGasPrice"))),
        ])
    }
}

struct PriceView {
    price: DataState<EthPrice>,
    usd: DataState<f64>,
}

impl PriceView {
    fn mount(ctx: &PageContext) -> Self {
        let price = use_price(ctx);
        let usd = usd(&price);
        Self { price, usd }
    }
}

impl View for PriceView {
    fn render(&self) -> Fragment {
        let dollars = RenderConfig::new()
            .children(|usd: &f64, _| Ok(Text(format!("${usd:.2}"))))
            .loading_message("fetching price");
        let btc = RenderConfig::new().field("ethbtc").error_substitute("n/a");
        Column(vec![
            row("ETH/USD", self.usd.render(&dollars)),
            row("ETH/BTC", self.price.render(&btc)),
        ])
    }
}

struct SupplyView {
    ether: DataState<String>,
}

impl SupplyView {
    fn mount(ctx: &PageContext) -> Self {
        let wei: DataState<String> = remember_data_state(
            "eth_supply",
            FetchConfig::json(ctx.client.clone(), ctx.api.eth_supply()).error_prefix("supply:"),
        );
        let ether = wei.transform_with(WEI_PER_ETHER, |raw, unit| {
            Ok(format!("{} ETH", parse_wei(raw)? / unit))
        });
        Self { ether }
    }
}

impl View for SupplyView {
    fn render(&self) -> Fragment {
        row("Supply", self.ether.render(&RenderConfig::new().display()))
    }
}

struct BlockView {
    latest: Option<DataState<u64>>,
    reward: DataState<BlockReward>,
    ether: DataState<String>,
}

impl BlockView {
    /// Without an explicit number the page first needs the latest block from
    /// the gas oracle; the reward lookup stays gated until then.
    fn mount(ctx: &PageContext, number: Option<u64>) -> Self {
        let latest = match number {
            Some(_) => None,
            None => Some(use_gas(ctx).transform(|g| Ok(g.last_block.parse::<u64>()?))),
        };
        let number = number.or_else(|| latest.as_ref().and_then(|l| l.root().into_value()));
        let reward: DataState<BlockReward> = remember_data_state(
            "block_reward",
            FetchConfig::json(ctx.client.clone(), number.map(|n| ctx.api.block_reward(n)))
                .error_prefix("block reward:"),
        );
        let ether = reward.transform(|r| Ok(format_ether(parse_wei(&r.block_reward)?)));
        Self {
            latest,
            reward,
            ether,
        }
    }
}

impl View for BlockView {
    fn render(&self) -> Fragment {
        // A failed lookup of the latest block leaves the reward gated forever.
        if let Some(latest) = &self.latest
            && latest.with_root(|root| root.as_error().is_some())
        {
            return row("Block", latest.render(&RenderConfig::new().display()));
        }
        Column(vec![
            row("Block", self.reward.render(&RenderConfig::new().field("blockNumber"))),
            row(
                "Miner",
                self.reward
                    .render(&RenderConfig::new().field("blockMiner").show_fallback(false)),
            ),
            row(
                "Reward",
                self.ether
                    .render(&RenderConfig::new().display().show_fallback(false)),
            ),
        ])
    }
}
