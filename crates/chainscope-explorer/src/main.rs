mod api;
mod config;
mod pages;
mod tasks;

use std::rc::Rc;

use anyhow::{Context, Result};
use chainscope_core::ReqwestClient;
use clap::Parser;

use crate::api::Api;
use crate::config::{CliArgs, ExplorerConfig};
use crate::pages::PageContext;

fn main() -> Result<()> {
    env_logger::init();

    let cli = CliArgs::parse();
    let config = ExplorerConfig::load(&cli).context("Failed to load configuration")?;
    log::debug!("config: {config:?}");

    let client = ReqwestClient::new(&config.http).context("Failed to build HTTP client")?;
    let ctx = PageContext {
        network: config.network,
        api: Api::for_network(&config, config.network),
        client: Rc::new(client),
    };

    // Data states are single-threaded; fetches run on a LocalSet.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    let fragment = local.block_on(&runtime, pages::run(&cli.page, &ctx));

    println!("{}", fragment.to_plain_text());
    Ok(())
}
