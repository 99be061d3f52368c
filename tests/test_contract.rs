use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256, address, keccak256};
use alloy_sol_types::SolValue;
use anyhow::Result;
use serial_test::serial;

use eth_contract_sdk::binding::{AbiBinding, ContractInterface, HostType, MethodDecl, Returns};
use eth_contract_sdk::client::Error as ClientError;
use eth_contract_sdk::{
    Abi, AbiType, Arg, BindingError, DispatchConfig, DispatchError, Error, Outcome, abi_record,
    bind, bind_read_only,
};
use eth_contract_sdk_test_utils::{
    ERC20_ABI, MockChain, VAULT_ABI, address_topic, init_logger, log_entry,
};

const TOKEN: Address = address!("0x0000000000000000000000000000000000000777");
const VAULT: Address = address!("0x0000000000000000000000000000000000000888");
const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

struct Erc20;

impl ContractInterface for Erc20 {
    fn methods() -> Vec<MethodDecl> {
        vec![
            MethodDecl::new("name").returns(Returns::Value(HostType::Text)),
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

struct Vault;

impl ContractInterface for Vault {
    fn methods() -> Vec<MethodDecl> {
        vec![
            MethodDecl::new("deposit")
                .param(HostType::Integer)
                .param(HostType::Text)
                .value_bearing(),
            MethodDecl::new("withdraw").param(HostType::Integer),
            MethodDecl::new("position")
                .param(HostType::Address)
                .returns(Returns::Value(HostType::Record(vec![
                    HostType::Integer,
                    HostType::Integer,
                    HostType::Text,
                ]))),
            MethodDecl::new("owners").returns(Returns::Value(HostType::list(HostType::Address))),
        ]
    }
}

abi_record! {
    #[derive(Debug, PartialEq)]
    struct Transfer {
        from: Address,
        to: Address,
        value: U256,
    }
}

fn selector(signature: &str) -> eth_contract_sdk::Selector {
    Abi::function_selector(signature)
}

fn hex_of(data: Vec<u8>) -> String {
    format!("0x{}", hex::encode(data))
}

#[tokio::test]
async fn read_only_contract_calls_views() -> Result<()> {
    init_logger(false);
    let chain = Arc::new(MockChain::new());
    chain.respond(
        TOKEN,
        selector("balanceOf(address)"),
        hex_of(U256::from(1234).abi_encode()),
    );
    chain.respond(
        TOKEN,
        selector("name()"),
        hex_of("Token".to_string().abi_encode()),
    );

    let token = bind_read_only::<Erc20, _>(TOKEN, ERC20_ABI, chain.clone())?;
    let balance: U256 = token.call("balanceOf", &[Arg::from(ALICE)]).await?;
    let name: String = token.call("name", &[]).await?;
    assert_eq!(balance, U256::from(1234));
    assert_eq!(name, "Token");

    let calls = chain.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, TOKEN);
    assert_eq!(&calls[0].1[..4], selector("balanceOf(address)").as_slice());
    Ok(())
}

#[tokio::test]
async fn read_only_contract_rejects_writes() -> Result<()> {
    let chain = Arc::new(MockChain::new());
    let token = bind_read_only::<Erc20, _>(TOKEN, ERC20_ABI, chain.clone())?;

    let err = token
        .invoke("transfer", &[Arg::from(BOB), Arg::from(1u8)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Dispatch(DispatchError::UnsupportedOperation(ref m)) if m == "transfer"
    ));
    assert!(chain.calls().is_empty());
    assert!(chain.transactions().is_empty());
    Ok(())
}

#[tokio::test]
async fn write_returns_receipt_after_mining() -> Result<()> {
    let chain = Arc::new(MockChain::new());
    let token = bind::<Erc20, _>(TOKEN, ERC20_ABI, chain.clone())?;

    let receipt = token
        .send("transfer", &[Arg::from(BOB), Arg::from(500u64)])
        .await?
        .expect("transfer declares a receipt");
    assert!(receipt.status);

    let sent = chain.transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, TOKEN);
    assert_eq!(sent[0].value, U256::ZERO);
    let expected = Abi::from_json(ERC20_ABI)?
        .encode_function("transfer", &[Arg::from(BOB), Arg::from(500u64)])?;
    assert_eq!(&sent[0].data, expected.data());
    assert_eq!(receipt.transaction_hash, keccak256(U256::from(1).to_be_bytes::<32>()));
    Ok(())
}

#[tokio::test]
async fn views_on_write_contract_use_calls() -> Result<()> {
    let chain = Arc::new(MockChain::new());
    chain.respond(
        VAULT,
        selector("owners()"),
        hex_of(vec![ALICE, BOB].abi_encode()),
    );
    chain.respond(
        VAULT,
        selector("position(address)"),
        hex_of((U256::from(10), 99u64, "savings".to_string()).abi_encode_params()),
    );

    let vault = bind::<Vault, _>(VAULT, VAULT_ABI, chain.clone())?;
    let owners: Vec<Address> = vault.call("owners", &[]).await?;
    assert_eq!(owners, vec![ALICE, BOB]);

    let (amount, since, memo): (U256, u64, String) =
        vault.call("position", &[Arg::from(ALICE)]).await?;
    assert_eq!((amount, since, memo.as_str()), (U256::from(10), 99, "savings"));

    match vault.invoke("position", &[Arg::from(ALICE)]).await? {
        Outcome::Values(values) => assert_eq!(values[2], AbiType::string("savings")),
        other => panic!("Expected values, got {other:?}"),
    }
    assert!(chain.transactions().is_empty());
    Ok(())
}

#[tokio::test]
async fn value_bearing_method_attaches_amount() -> Result<()> {
    let chain = Arc::new(MockChain::new());
    let vault = bind::<Vault, _>(VAULT, VAULT_ABI, chain.clone())?;

    let outcome = vault
        .invoke("deposit", &[Arg::from(1_000u64), Arg::from("rent")])
        .await?;
    assert_eq!(outcome, Outcome::Unit);

    let sent = chain.transactions();
    assert_eq!(sent[0].value, U256::from(1_000));
    let expected = Abi::from_json(VAULT_ABI)?.encode_function("deposit", &[Arg::from("rent")])?;
    assert_eq!(&sent[0].data, expected.data());

    let err = vault
        .invoke("deposit", &[Arg::from("lots"), Arg::from("rent")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Dispatch(DispatchError::InvalidValue(_))));
    Ok(())
}

#[tokio::test]
async fn reverted_transaction_is_an_error() -> Result<()> {
    let chain = Arc::new(MockChain::new());
    chain.set_reverts(true);
    let vault = bind::<Vault, _>(VAULT, VAULT_ABI, chain.clone())?;

    let err = vault
        .invoke("withdraw", &[Arg::from(5u8)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Dispatch(DispatchError::TransactionReverted { ref method, .. }) if method == "withdraw"
    ));
    Ok(())
}

#[tokio::test]
#[serial]
async fn confirmation_timeout_is_reported() -> Result<()> {
    let chain = Arc::new(MockChain::new());
    chain.set_confirmation_delay(Duration::from_millis(200));
    let vault = bind::<Vault, _>(VAULT, VAULT_ABI, chain.clone())?.with_config(DispatchConfig {
        confirmation_timeout: Duration::from_millis(20),
        poll_interval: Duration::from_millis(5),
    });

    let err = vault
        .invoke("withdraw", &[Arg::from(5u8)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Client(ClientError::ReceiptTimeout { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn dispatch_errors() -> Result<()> {
    let chain = Arc::new(MockChain::new());
    let token = bind::<Erc20, _>(TOKEN, ERC20_ABI, chain.clone())?;

    assert!(matches!(
        token.invoke("approve", &[]).await.unwrap_err(),
        Error::Dispatch(DispatchError::UnknownMethod(_))
    ));
    assert!(matches!(
        token.invoke("balanceOf", &[]).await.unwrap_err(),
        Error::Dispatch(DispatchError::ArgumentCount {
            expected: 1,
            actual: 0,
            ..
        })
    ));
    assert!(matches!(
        token
            .call::<bool>("transfer", &[Arg::from(BOB), Arg::from(1u8)])
            .await
            .unwrap_err(),
        Error::Dispatch(DispatchError::NoReturnValue(_))
    ));
    // Unanswered call surfaces the client error.
    assert!(matches!(
        token.call::<String>("name", &[]).await.unwrap_err(),
        Error::Client(ClientError::RequestError(_))
    ));
    assert!(chain.transactions().is_empty());
    Ok(())
}

#[tokio::test]
async fn incompatible_interface_fails_at_bind_time() -> Result<()> {
    struct Mintable;
    impl ContractInterface for Mintable {
        fn methods() -> Vec<MethodDecl> {
            vec![MethodDecl::new("mint").param(HostType::Integer)]
        }
    }

    let chain = Arc::new(MockChain::new());
    let err = bind::<Mintable, _>(TOKEN, ERC20_ABI, chain.clone())
        .err()
        .expect("mint is not part of the ABI");
    assert!(matches!(
        err,
        Error::Binding(BindingError::NoAbiCounterpart(ref m)) if m == "mint"
    ));

    let err = bind::<Erc20, _>(TOKEN, "not json", chain)
        .err()
        .expect("invalid ABI");
    assert!(matches!(err, Error::Encoding(_)));
    Ok(())
}

#[tokio::test]
async fn events_are_fetched_for_the_contract() -> Result<()> {
    let chain = Arc::new(MockChain::new());
    let topic = keccak256("Transfer(address,address,uint256)");
    chain.push_log(log_entry(
        TOKEN,
        vec![topic, address_topic(ALICE), address_topic(BOB)],
        U256::from(3).abi_encode(),
    ));
    chain.push_log(log_entry(
        BOB,
        vec![topic, address_topic(BOB), address_topic(ALICE)],
        U256::from(4).abi_encode(),
    ));

    let token = bind_read_only::<Erc20, _>(TOKEN, ERC20_ABI, chain)?;
    let transfers: Vec<Transfer> = token.events("Transfer", None, None).await?;
    assert_eq!(
        transfers,
        vec![Transfer {
            from: ALICE,
            to: BOB,
            value: U256::from(3),
        }]
    );
    assert!(token.events::<Transfer>("Transfer", Some(2), None).await?.is_empty());
    Ok(())
}

#[test]
fn concurrent_binds_share_one_table() -> Result<()> {
    struct Shared;
    impl ContractInterface for Shared {
        fn methods() -> Vec<MethodDecl> {
            vec![MethodDecl::new("name").returns(Returns::Value(HostType::Text))]
        }
    }

    let abi = Arc::new(Abi::from_json(ERC20_ABI)?);
    let tables: Vec<Arc<AbiBinding>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let abi = abi.clone();
                scope.spawn(move || AbiBinding::resolve_cached::<Shared>(abi).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
    assert!(tables[0].method("name").is_some());
    Ok(())
}
