//! In-memory host used by `qrvmc run`.

use qrvmc_bridge::{
    AccessStatus, Address, Bytes32, ExecutionMessage, ExecutionResult, HostContext,
    StorageStatus, TxContext, Uint256,
};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Default)]
pub struct Account {
    pub balance: Uint256,
    pub code: Vec<u8>,
    pub code_hash: Bytes32,
    pub storage: FxHashMap<Bytes32, Bytes32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub address: Address,
    pub data: Vec<u8>,
    pub topics: Vec<Bytes32>,
}

/// A world state held in memory.
///
/// Sub-calls are not executed: `call` answers with a revert that returns the
/// call input and all the gas.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    pub accounts: FxHashMap<Address, Account>,
    pub tx_context: TxContext,
    pub logs: Vec<LogRecord>,
    pub calls: Vec<ExecutionMessage>,
    warm_accounts: FxHashSet<Address>,
    warm_slots: FxHashSet<(Address, Bytes32)>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, address: Address, account: Account) -> Self {
        self.accounts.insert(address, account);
        self
    }
}

fn is_zero(value: &Bytes32) -> bool {
    value.bytes.iter().all(|&b| b == 0)
}

impl HostContext for MemoryHost {
    fn account_exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn get_storage(&self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.accounts
            .get(address)
            .and_then(|account| account.storage.get(key))
            .copied()
            .unwrap_or_default()
    }

    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        let storage = &mut self.accounts.entry(*address).or_default().storage;
        let current = storage.get(key).copied().unwrap_or_default();

        let status = if current == *value {
            StorageStatus::Assigned
        } else if is_zero(&current) {
            StorageStatus::Added
        } else if is_zero(value) {
            StorageStatus::Deleted
        } else {
            StorageStatus::Modified
        };

        if is_zero(value) {
            storage.remove(key);
        } else {
            storage.insert(*key, *value);
        }
        status
    }

    fn get_balance(&self, address: &Address) -> Uint256 {
        self.accounts
            .get(address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    fn get_code_size(&self, address: &Address) -> usize {
        self.accounts
            .get(address)
            .map_or(0, |account| account.code.len())
    }

    fn get_code_hash(&self, address: &Address) -> Bytes32 {
        self.accounts
            .get(address)
            .map(|account| account.code_hash)
            .unwrap_or_default()
    }

    fn copy_code(&self, address: &Address, code_offset: usize, buffer: &mut [u8]) -> usize {
        let Some(code) = self.accounts.get(address).map(|account| &account.code) else {
            return 0;
        };
        let Some(rest) = code.get(code_offset..) else {
            return 0;
        };
        let n = rest.len().min(buffer.len());
        buffer[..n].copy_from_slice(&rest[..n]);
        n
    }

    fn call(&mut self, message: &ExecutionMessage) -> ExecutionResult {
        self.calls.push(message.clone());
        ExecutionResult::revert(message.gas, message.input.clone())
    }

    fn get_tx_context(&self) -> TxContext {
        self.tx_context
    }

    fn emit_log(&mut self, address: &Address, data: &[u8], topics: &[Bytes32]) {
        self.logs.push(LogRecord {
            address: *address,
            data: data.to_vec(),
            topics: topics.to_vec(),
        });
    }

    fn access_account(&mut self, address: &Address) -> AccessStatus {
        if self.warm_accounts.insert(*address) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    fn access_storage(&mut self, address: &Address, key: &Bytes32) -> AccessStatus {
        if self.warm_slots.insert((*address, *key)) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }
}
