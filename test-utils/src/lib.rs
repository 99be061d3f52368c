use alloy::primitives::{Address, B256, Bytes};
use eth_contract_sdk::LogEntry;

mod mock;

pub use mock::MockChain;

/// Default URL of a local development node.
pub const LOCAL_NODE_URL: &str = "http://localhost:8545";

/// A minimal ERC-20 ABI: metadata getters, balances, transfers and the `Transfer` event.
pub const ERC20_ABI: &str = r#"[
    {"type":"function","name":"name","stateMutability":"view","inputs":[],
     "outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"symbol","stateMutability":"view","inputs":[],
     "outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"decimals","stateMutability":"view","inputs":[],
     "outputs":[{"name":"","type":"uint8"}]},
    {"type":"function","name":"balanceOf","stateMutability":"view",
     "inputs":[{"name":"owner","type":"address"}],
     "outputs":[{"name":"","type":"uint256"}]},
    {"type":"function","name":"transfer","stateMutability":"nonpayable",
     "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
     "outputs":[{"name":"","type":"bool"}]},
    {"type":"event","name":"Transfer","anonymous":false,"inputs":[
     {"name":"from","type":"address","indexed":true},
     {"name":"to","type":"address","indexed":true},
     {"name":"value","type":"uint256","indexed":false}]}
]"#;

/// A vault with a payable deposit, a struct-returning getter and a memo event.
pub const VAULT_ABI: &str = r#"[
    {"type":"function","name":"deposit","stateMutability":"payable",
     "inputs":[{"name":"memo","type":"string"}],"outputs":[]},
    {"type":"function","name":"withdraw","stateMutability":"nonpayable",
     "inputs":[{"name":"amount","type":"uint256"}],"outputs":[]},
    {"type":"function","name":"position","stateMutability":"view",
     "inputs":[{"name":"owner","type":"address"}],
     "outputs":[{"name":"amount","type":"uint256"},{"name":"since","type":"uint64"},
                {"name":"memo","type":"string"}]},
    {"type":"function","name":"owners","stateMutability":"view","inputs":[],
     "outputs":[{"name":"","type":"address[]"}]},
    {"type":"event","name":"Deposited","inputs":[
     {"name":"owner","type":"address","indexed":true},
     {"name":"memo","type":"string","indexed":true},
     {"name":"amount","type":"uint256","indexed":false},
     {"name":"note","type":"string","indexed":false}]}
]"#;

/// Initializes `env_logger` once per test binary. Pass `true` to see debug output.
pub fn init_logger(should_init: bool) {
    if should_init {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .is_test(true)
            .try_init();
    }
}

/// Builds a mined log entry.
pub fn log_entry(address: Address, topics: Vec<B256>, data: impl Into<Bytes>) -> LogEntry {
    LogEntry {
        address,
        data: data.into(),
        topics,
        block_hash: None,
        block_number: Some(1),
        transaction_hash: B256::repeat_byte(0x11),
        log_index: 0,
        removed: false,
    }
}

/// Left-pads an address into a topic word.
pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}
