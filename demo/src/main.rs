use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bigdecimal::BigDecimal;
use clap::{Parser, Subcommand};
use eth_contract_sdk::binding::{ContractInterface, HostType, MethodDecl, Returns};
use eth_contract_sdk::multicall::{Call3, MULTICALL3_ADDRESS, aggregate3};
use eth_contract_sdk::{
    Abi, Address, Arg, DispatchConfig, PrivateKeySigner, RpcClient, U256, Url, abi_record, bind,
    bind_read_only,
};
use log::info;

const ERC20_ABI: &str = include_str!("../abi/erc20.json");

abi_record! {
    #[derive(Debug)]
    struct Transfer {
        from: Address,
        to: Address,
        value: U256,
    }
}

/// The subset of ERC-20 this program uses.
struct Erc20;

impl ContractInterface for Erc20 {
    fn methods() -> Vec<MethodDecl> {
        vec![
            MethodDecl::new("decimals").returns(Returns::Value(HostType::Integer)),
            MethodDecl::new("balanceOf")
                .param(HostType::Address)
                .returns(Returns::Value(HostType::Integer)),
            MethodDecl::new("transfer")
                .param(HostType::Address)
                .param(HostType::Integer)
                .returns(Returns::Receipt),
        ]
    }
}

/// Program to inspect and transfer ERC-20 tokens
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the Ethereum node
    #[arg(short, long, default_value = "http://localhost:8545")]
    url: String,

    /// Token contract address
    #[arg(short, long)]
    token: Address,

    /// Command to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show token metadata, fetched in one Multicall3 batch
    Info,
    /// Show the balance of an account
    Balance {
        /// Account to inspect
        owner: Address,
    },
    /// List `Transfer` events
    Transfers {
        /// First block to scan
        #[arg(long)]
        from_block: Option<u64>,
        /// Last block to scan
        #[arg(long)]
        to_block: Option<u64>,
    },
    /// Transfer tokens
    Send {
        /// Recipient
        #[arg(long)]
        to: Address,
        /// Amount in base units
        #[arg(long)]
        amount: U256,
        /// Hex-encoded private key of the sender
        #[arg(long)]
        private_key: String,
        /// Seconds to wait for the transaction to be mined
        #[arg(long, default_value = "120")]
        timeout: u64,
    },
}

fn scale(amount: U256, decimals: u8) -> Result<BigDecimal> {
    Ok(BigDecimal::from_str(&amount.to_string())?
        / BigDecimal::from_str(&format!("1e{decimals}"))?)
}

async fn handle_info(client: RpcClient, token: Address) -> Result<()> {
    let abi = Abi::from_json(ERC20_ABI)?;
    let calls = ["name", "symbol", "decimals", "totalSupply"]
        .into_iter()
        .map(|name| abi.encode_function(name, &[]))
        .collect::<Result<Vec<_>, _>>()?;
    let batch: Vec<Call3> = calls.iter().map(|call| Call3::new(token, call)).collect();

    info!("Querying {} through Multicall3 at {MULTICALL3_ADDRESS}", token);
    let results = aggregate3(&client, &batch).await?;
    anyhow::ensure!(
        results.len() == calls.len(),
        "Multicall returned {} results for {} calls",
        results.len(),
        calls.len()
    );

    let name: String = results[0].decode(&calls[0])?;
    let symbol: String = results[1].decode(&calls[1])?;
    let decimals: u8 = results[2].decode(&calls[2])?;
    let supply: U256 = results[3].decode(&calls[3])?;
    println!("{name} ({symbol})");
    println!("  decimals:     {decimals}");
    println!("  total supply: {}", scale(supply, decimals)?);
    Ok(())
}

async fn handle_balance(client: RpcClient, token: Address, owner: Address) -> Result<()> {
    let token = bind_read_only::<Erc20, _>(token, ERC20_ABI, Arc::new(client))?;
    let decimals: u8 = token.call("decimals", &[]).await?;
    let balance: U256 = token.call("balanceOf", &[Arg::from(owner)]).await?;
    println!("{owner}: {}", scale(balance, decimals)?);
    Ok(())
}

async fn handle_transfers(
    client: RpcClient,
    token: Address,
    from_block: Option<u64>,
    to_block: Option<u64>,
) -> Result<()> {
    let token = bind_read_only::<Erc20, _>(token, ERC20_ABI, Arc::new(client))?;
    let transfers: Vec<Transfer> = token.events("Transfer", from_block, to_block).await?;
    println!("Found {} transfers", transfers.len());
    for transfer in transfers {
        println!("  {} -> {}: {}", transfer.from, transfer.to, transfer.value);
    }
    Ok(())
}

async fn handle_send(
    url: Url,
    token: Address,
    to: Address,
    amount: U256,
    private_key: &str,
    timeout: u64,
) -> Result<()> {
    let signer = PrivateKeySigner::from_str(private_key)?;
    info!("Sending from {}", signer.address());
    let client = RpcClient::builder().rpc_url(url).wallet(signer).build();
    let token = bind::<Erc20, _>(token, ERC20_ABI, Arc::new(client))?.with_config(DispatchConfig {
        confirmation_timeout: Duration::from_secs(timeout),
        ..DispatchConfig::default()
    });

    let receipt = token
        .send("transfer", &[Arg::from(to), Arg::from(amount)])
        .await?;
    if let Some(receipt) = receipt {
        println!(
            "Transfer mined in block {:?}: {}",
            receipt.block_number, receipt.transaction_hash
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let url = Url::parse(&args.url)?;

    match args.command {
        Command::Info => handle_info(RpcClient::builder().rpc_url(url).build(), args.token).await,
        Command::Balance { owner } => {
            handle_balance(RpcClient::builder().rpc_url(url).build(), args.token, owner).await
        }
        Command::Transfers {
            from_block,
            to_block,
        } => {
            handle_transfers(
                RpcClient::builder().rpc_url(url).build(),
                args.token,
                from_block,
                to_block,
            )
            .await
        }
        Command::Send {
            to,
            amount,
            private_key,
            timeout,
        } => handle_send(url, args.token, to, amount, &private_key, timeout).await,
    }
}
