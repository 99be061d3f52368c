use alloy::primitives::{Address, B256, Bytes, I256, U256, address};
use alloy_sol_types::{SolCall, SolValue, sol};
use anyhow::Result;

use eth_contract_sdk::decoder::{decode, decode_single};
use eth_contract_sdk::encoder::{encode, encode_single};
use eth_contract_sdk::value::AbiArray;
use eth_contract_sdk::{Abi, AbiType, Arg, DecodingError, EncodingError, TypeSchema, abi_record};
use eth_contract_sdk_test_utils::{ERC20_ABI, VAULT_ABI, init_logger};

sol! {
    function transfer(address to, uint256 amount) external returns (bool);
}

const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");

fn schemas(types: &[&str]) -> Vec<TypeSchema> {
    types.iter().map(|t| TypeSchema::parse(t).unwrap()).collect()
}

#[test]
fn nested_dynamic_values_match_reference_encoder() -> Result<()> {
    init_logger(false);

    let values = vec![
        AbiType::Array(AbiArray::dynamic(
            TypeSchema::Uint(256),
            [AbiType::uint256(U256::from(1u8)), AbiType::uint256(U256::from(2u8))],
        )?),
        AbiType::tuple([AbiType::Address(ALICE), AbiType::bytes(vec![0xde, 0xad])]),
        AbiType::Array(AbiArray::dynamic(
            TypeSchema::String,
            [AbiType::string("ab"), AbiType::string("cde")],
        )?),
        AbiType::fixed_bytes(vec![7u8; 32])?,
    ];
    let reference = (
        vec![U256::from(1), U256::from(2)],
        (ALICE, Bytes::from(vec![0xde, 0xad])),
        vec!["ab".to_string(), "cde".to_string()],
        B256::repeat_byte(7),
    )
        .abi_encode_params();

    let encoded = encode(&values);
    assert_eq!(encoded, reference);

    let decoded = decode(
        &encoded,
        &schemas(&["uint256[]", "(address,bytes)", "string[]", "bytes32"]),
    )?;
    assert_eq!(decoded, values);
    Ok(())
}

#[test]
fn signed_and_fixed_size_values_match_reference_encoder() -> Result<()> {
    let values = vec![
        AbiType::int(8, I256::MINUS_ONE)?,
        AbiType::int256(I256::MIN),
        AbiType::Array(AbiArray::fixed(
            TypeSchema::Uint(16),
            [
                AbiType::uint(16, U256::from(1u8))?,
                AbiType::uint(16, U256::from(2u8))?,
                AbiType::uint(16, U256::from(65535u16))?,
            ],
        )?),
        AbiType::Array(AbiArray::fixed(
            TypeSchema::String,
            [AbiType::string("x"), AbiType::string("")],
        )?),
        AbiType::Bool(true),
    ];
    let reference = (
        -1i8,
        I256::MIN,
        [1u16, 2, 65535],
        ["x".to_string(), String::new()],
        true,
    )
        .abi_encode_params();

    let encoded = encode(&values);
    assert_eq!(encoded, reference);
    assert_eq!(
        decode(
            &encoded,
            &schemas(&["int8", "int256", "uint16[3]", "string[2]", "bool"])
        )?,
        values
    );
    Ok(())
}

#[test]
fn single_value_matches_reference_encoder() -> Result<()> {
    let value = AbiType::string("hello");
    let encoded = encode_single(&value);
    assert_eq!(encoded, "hello".to_string().abi_encode());
    assert_eq!(decode_single(&encoded, &TypeSchema::String)?, value);
    Ok(())
}

#[test]
fn static_tuple_is_inlined() -> Result<()> {
    let value = AbiType::tuple([AbiType::Bool(true), AbiType::uint256(U256::from(9u8))]);
    assert!(!value.is_dynamic());
    assert_eq!(value.byte_size(), 64);
    let encoded = encode(&[value.clone(), AbiType::string("z")]);
    // tuple words, then the string offset pointing past the three head words
    assert_eq!(encoded[95], 0x60);
    assert_eq!(decode(&encoded, &schemas(&["(bool,uint256)", "string"]))?[0], value);
    Ok(())
}

#[test]
fn transfer_calldata_matches_reference_encoder() -> Result<()> {
    let abi = Abi::from_json(ERC20_ABI)?;
    let call = abi.encode_function("transfer", &[Arg::from(ALICE), Arg::from(1000u64)])?;

    let reference = transferCall {
        to: ALICE,
        amount: U256::from(1000),
    }
    .abi_encode();
    assert_eq!(call.data().to_vec(), reference);
    assert!(call.to_hex().starts_with("0xa9059cbb"));
    Ok(())
}

#[test]
fn arguments_are_coerced_to_declared_types() -> Result<()> {
    let abi = Abi::from_json(ERC20_ABI)?;

    let err = abi
        .encode_function("transfer", &[Arg::from("alice"), Arg::from(1u8)])
        .unwrap_err();
    assert!(matches!(err, EncodingError::Argument { index: 0, .. }));

    let err = abi
        .encode_function("transfer", &[Arg::from(ALICE), Arg::from(-1i32)])
        .unwrap_err();
    assert!(matches!(err, EncodingError::Argument { index: 1, .. }));
    Ok(())
}

abi_record! {
    #[derive(Debug, PartialEq)]
    struct Position {
        amount: U256,
        since: u64,
        memo: String,
    }
}

#[test]
fn multiple_outputs_decode_into_record() -> Result<()> {
    let abi = Abi::from_json(VAULT_ABI)?;
    let call = abi.encode_function("position", &[Arg::from(ALICE)])?;

    let result = (U256::from(5), 1_700_000_000u64, "rent".to_string()).abi_encode_params();
    let hex = format!("0x{}", hex::encode(result));

    let position: Position = call.decode(&hex)?;
    assert_eq!(
        position,
        Position {
            amount: U256::from(5),
            since: 1_700_000_000,
            memo: "rent".into(),
        }
    );

    let (amount, since, memo): (U256, u64, String) = call.decode(&hex)?;
    assert_eq!((amount, since, memo.as_str()), (U256::from(5), 1_700_000_000, "rent"));

    let values: Vec<AbiType> = call.decode(&hex)?;
    assert_eq!(values.len(), 3);
    Ok(())
}

#[test]
fn empty_result_is_rejected() -> Result<()> {
    let abi = Abi::from_json(ERC20_ABI)?;
    let call = abi.encode_function("balanceOf", &[Arg::from(ALICE)])?;
    let err = call.decode::<U256>("0x").unwrap_err();
    assert!(matches!(err, DecodingError::EmptyData(_)));
    assert!(err.to_string().contains("empty data"));
    Ok(())
}

#[test]
fn oversized_static_output_is_a_decoding_error() -> Result<()> {
    let abi = Abi::from_json(
        r#"[{"type":"function","name":"grid","stateMutability":"view","inputs":[],
             "outputs":[{"name":"","type":"uint256[100000000000000]"}]}]"#,
    )?;
    let call = abi.encode_function("grid", &[])?;
    let zeros = format!("0x{}", "00".repeat(32));
    assert!(matches!(
        call.decode_values(&zeros),
        Err(DecodingError::Truncated { .. })
    ));
    Ok(())
}

#[test]
fn array_of_addresses_decodes_into_vec() -> Result<()> {
    let abi = Abi::from_json(VAULT_ABI)?;
    let call = abi.encode_function("owners", &[])?;
    let result = vec![ALICE, Address::ZERO].abi_encode();
    let owners: Vec<Address> = call.decode(&format!("0x{}", hex::encode(result)))?;
    assert_eq!(owners, vec![ALICE, Address::ZERO]);
    Ok(())
}
