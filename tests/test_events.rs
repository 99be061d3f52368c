use alloy::primitives::{Address, B256, Bytes, U256, address, keccak256};
use alloy_sol_types::SolValue;
use anyhow::Result;

use eth_contract_sdk::{Abi, AbiType, DecodingError, abi_record};
use eth_contract_sdk_test_utils::{ERC20_ABI, VAULT_ABI, address_topic, init_logger, log_entry};

const TOKEN: Address = address!("0x0000000000000000000000000000000000000777");
const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

abi_record! {
    #[derive(Debug, PartialEq)]
    struct Transfer {
        from: Address,
        to: Address,
        value: U256,
    }
}

fn transfer_topic() -> B256 {
    keccak256("Transfer(address,address,uint256)")
}

#[test]
fn decodes_matching_logs_and_skips_others() -> Result<()> {
    init_logger(false);
    let abi = Abi::from_json(ERC20_ABI)?;

    let erc20 = log_entry(
        TOKEN,
        vec![transfer_topic(), address_topic(ALICE), address_topic(BOB)],
        U256::from(42).abi_encode(),
    );
    // Same signature with the amount indexed, as ERC-721 declares it.
    let erc721 = log_entry(
        TOKEN,
        vec![
            transfer_topic(),
            address_topic(ALICE),
            address_topic(BOB),
            B256::with_last_byte(1),
        ],
        Bytes::new(),
    );
    let approval = log_entry(
        TOKEN,
        vec![keccak256("Approval(address,address,uint256)")],
        U256::from(1).abi_encode(),
    );

    let transfers: Vec<Transfer> = abi.decode_events("Transfer", &[approval, erc20, erc721])?;
    assert_eq!(
        transfers,
        vec![Transfer {
            from: ALICE,
            to: BOB,
            value: U256::from(42),
        }]
    );
    Ok(())
}

#[test]
fn same_topic_with_other_layout_is_skipped_not_failed() -> Result<()> {
    init_logger(true);
    let abi = Abi::from_json(ERC20_ABI)?;
    let event = abi.event("Transfer").unwrap();
    let erc721 = log_entry(
        TOKEN,
        vec![
            transfer_topic(),
            address_topic(ALICE),
            address_topic(BOB),
            B256::with_last_byte(7),
        ],
        Bytes::new(),
    );

    let records = abi.decode_event_records("Transfer", &[erc721.clone()])?;
    assert!(records.is_empty());
    // The skip is reported with the strict decoder's reason.
    assert_eq!(
        event.decode_log(&erc721).unwrap_err().to_string(),
        "Log Some(0) has 4 topics, event `Transfer` needs 3"
    );
    Ok(())
}

#[test]
fn no_matching_logs_yield_empty_list() -> Result<()> {
    let abi = Abi::from_json(ERC20_ABI)?;
    let transfers: Vec<Transfer> = abi.decode_events("Transfer", &[])?;
    assert!(transfers.is_empty());
    Ok(())
}

#[test]
fn indexed_dynamic_values_are_topic_hashes() -> Result<()> {
    let abi = Abi::from_json(VAULT_ABI)?;
    let event = abi.event("Deposited").unwrap();
    assert_eq!(event.signature(), "Deposited(address,string,uint256,string)");

    let memo_hash = keccak256("rent");
    let log = log_entry(
        TOKEN,
        vec![event.topic(), address_topic(ALICE), memo_hash],
        (U256::from(5), "first deposit".to_string()).abi_encode_params(),
    );

    let records = abi.decode_event_records("Deposited", &[log.clone()])?;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.name, "Deposited");
    assert_eq!(record.transaction_hash, log.transaction_hash);
    assert_eq!(record.field("owner"), Some(&AbiType::Address(ALICE)));
    assert_eq!(
        record.field("memo"),
        Some(&AbiType::fixed_bytes(memo_hash.to_vec())?)
    );
    assert_eq!(record.field("amount"), Some(&AbiType::uint256(U256::from(5u8))));
    assert_eq!(record.field("note"), Some(&AbiType::string("first deposit")));

    let (owner, memo, amount, note): (Address, B256, U256, String) = record.decode()?;
    assert_eq!((owner, memo, amount), (ALICE, memo_hash, U256::from(5)));
    assert_eq!(note, "first deposit");
    Ok(())
}

#[test]
fn strict_log_decoding_checks_topic_count() -> Result<()> {
    let abi = Abi::from_json(ERC20_ABI)?;
    let event = abi.event("Transfer").unwrap();
    let log = log_entry(
        TOKEN,
        vec![transfer_topic(), address_topic(ALICE)],
        U256::from(1).abi_encode(),
    );
    assert!(!event.matches(&log));
    assert!(matches!(
        event.decode_log(&log),
        Err(DecodingError::TopicCount {
            expected: 3,
            actual: 2,
            ..
        })
    ));
    Ok(())
}

#[test]
fn unknown_and_anonymous_events_are_rejected() -> Result<()> {
    let abi = Abi::from_json(
        r#"[{"type":"event","name":"Ping","anonymous":true,
             "inputs":[{"name":"id","type":"uint256","indexed":true}]}]"#,
    )?;
    assert_eq!(
        abi.decode_event_records("Ping", &[]).unwrap_err(),
        DecodingError::AnonymousEvent("Ping".into())
    );
    assert_eq!(
        abi.decode_event_records("Pong", &[]).unwrap_err(),
        DecodingError::UnknownEvent("Pong".into())
    );
    Ok(())
}

#[test]
fn malformed_log_data_is_an_error() -> Result<()> {
    let abi = Abi::from_json(ERC20_ABI)?;
    let log = log_entry(
        TOKEN,
        vec![transfer_topic(), address_topic(ALICE), address_topic(BOB)],
        vec![0u8; 16],
    );
    assert!(matches!(
        abi.decode_events::<Transfer>("Transfer", &[log]),
        Err(DecodingError::Truncated { .. })
    ));
    Ok(())
}
