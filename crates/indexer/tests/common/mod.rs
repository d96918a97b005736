//! Doubles and transaction generators for the end-to-end tests.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use bitcoin::{
    absolute::LockTime,
    hashes::Hash,
    secp256k1::{Secp256k1, SecretKey},
    transaction::Version,
    Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
    XOnlyPublicKey,
};
use rand::{rngs::OsRng, RngCore};
use sidx_btcstaking::{build_unbonding_template, StakingInfo, V0OpReturnData};
use sidx_db_store_sled::SledIndexerStore;
use sidx_indexer::{BtcScanner, EventConsumer};
use sidx_params::{ParamsVersion, ParamsVersions};
use sidx_types::{
    ActiveStakingEvent, IndexedBlock, UnbondingStakingEvent, WithdrawStakingEvent,
};
use tokio::sync::mpsc;

pub const TAG: [u8; 4] = *b"idx0";

pub fn random_xonly() -> XOnlyPublicKey {
    SecretKey::new(&mut OsRng)
        .x_only_public_key(&Secp256k1::new())
        .0
}

pub fn random_txid() -> Txid {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Txid::from_byte_array(bytes)
}

pub fn gen_params_version(version: u32, activation_height: u64, unbonding_fee: u64) -> ParamsVersion {
    ParamsVersion {
        version,
        activation_height,
        tag: TAG,
        covenant_pks: vec![random_xonly(), random_xonly(), random_xonly()],
        covenant_quorum: 2,
        unbonding_time: 101,
        unbonding_fee: Amount::from_sat(unbonding_fee),
        min_staking_value: Amount::from_sat(10_000),
        max_staking_value: Amount::from_sat(1_000_000),
        min_staking_time: 100,
        max_staking_time: 10_000,
        network: Network::Regtest,
    }
}

pub fn gen_params(unbonding_fee: u64) -> Arc<ParamsVersions> {
    Arc::new(ParamsVersions::new(vec![gen_params_version(0, 1, unbonding_fee)]).unwrap())
}

/// A staking transaction whose output 0 is the canonical staking output
/// and output 1 the tagged OP_RETURN carrier.
pub fn build_staking_tx(
    params: &ParamsVersion,
    staker_pk: &XOnlyPublicKey,
    finality_provider_pk: &XOnlyPublicKey,
    staking_time: u16,
    staking_value: Amount,
) -> Transaction {
    let info = StakingInfo::new(
        staker_pk,
        finality_provider_pk,
        &params.covenant_pks,
        params.covenant_quorum,
        staking_time,
        staking_value,
    )
    .unwrap();
    let op_return = V0OpReturnData {
        tag: params.tag,
        staker_pk: *staker_pk,
        finality_provider_pk: *finality_provider_pk,
        staking_time,
    };

    Transaction {
        version: Version(2),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: random_txid(),
                vout: 0,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![
            info.staking_output,
            TxOut {
                value: Amount::ZERO,
                script_pubkey: op_return.to_script(),
            },
        ],
    }
}

/// The honest unbonding of `staking_tx`'s output at `vout`.
pub fn build_unbonding_tx(
    params: &ParamsVersion,
    staking_tx: &Transaction,
    vout: u32,
    staker_pk: &XOnlyPublicKey,
    finality_provider_pk: &XOnlyPublicKey,
) -> Transaction {
    build_unbonding_template(
        staking_tx.compute_txid(),
        vout,
        staking_tx.output[vout as usize].value,
        staker_pk,
        finality_provider_pk,
        &params.covenant_pks,
        params.covenant_quorum,
        params.unbonding_time,
        params.unbonding_fee,
    )
    .unwrap()
}

/// A withdrawal: spends the staking output through the timelock leaf to
/// an arbitrary destination, with a script-path witness revealing that
/// leaf.
pub fn build_withdrawal_tx(
    params: &ParamsVersion,
    staking_tx: &Transaction,
    staker_pk: &XOnlyPublicKey,
    finality_provider_pk: &XOnlyPublicKey,
    staking_time: u16,
) -> Transaction {
    let info = StakingInfo::new(
        staker_pk,
        finality_provider_pk,
        &params.covenant_pks,
        params.covenant_quorum,
        staking_time,
        staking_tx.output[0].value,
    )
    .unwrap();

    let mut witness = Witness::new();
    witness.push([0u8; 64]); // placeholder staker signature
    witness.push(info.timelock_script.as_bytes());
    witness.push([0xc0; 33]); // placeholder control block

    Transaction {
        version: Version(2),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: staking_tx.compute_txid(),
                vout: 0,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::from_height(staking_time),
            witness,
        }],
        output: vec![TxOut {
            value: staking_tx.output[0].value - params.unbonding_fee,
            script_pubkey: ScriptBuf::new_p2tr_tweaked(
                bitcoin::key::TweakedPublicKey::dangerous_assume_tweaked(*staker_pk),
            ),
        }],
    }
}

pub fn block(height: u64, txs: Vec<Transaction>) -> IndexedBlock {
    IndexedBlock::new(height, 1_700_000_000 + height, txs)
}

/// Channel-backed scanner double.  `stop` drops the sender, closing the
/// channel the worker drains.
pub struct ChannelScanner {
    sender: Mutex<Option<mpsc::Sender<IndexedBlock>>>,
    receiver: Mutex<Option<mpsc::Receiver<IndexedBlock>>>,
}

impl ChannelScanner {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
        }
    }

    /// A sender clone for the test to feed blocks through.  Drop it
    /// before stopping the indexer or the worker never sees the channel
    /// close.
    pub fn sender(&self) -> mpsc::Sender<IndexedBlock> {
        self.sender
            .lock()
            .unwrap()
            .clone()
            .expect("scanner already stopped")
    }
}

impl BtcScanner for ChannelScanner {
    fn start(&self, _start_height: u64) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.sender.lock().unwrap().take();
        Ok(())
    }

    fn confirmed_blocks_chan(&self) -> Option<mpsc::Receiver<IndexedBlock>> {
        self.receiver.lock().unwrap().take()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    Staking(ActiveStakingEvent),
    Unbonding(UnbondingStakingEvent),
    Withdraw(WithdrawStakingEvent),
}

/// Consumer double recording every acknowledged event in order.
#[derive(Default)]
pub struct RecordingConsumer {
    pub events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingConsumer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventConsumer for RecordingConsumer {
    fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn push_staking_event(&self, event: &ActiveStakingEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Staking(event.clone()));
        Ok(())
    }

    fn push_unbonding_event(&self, event: &UnbondingStakingEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Unbonding(event.clone()));
        Ok(())
    }

    fn push_withdraw_event(&self, event: &WithdrawStakingEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Withdraw(event.clone()));
        Ok(())
    }
}

pub fn setup_store() -> Arc<SledIndexerStore> {
    let db = sled::Config::new().temporary(true).open().unwrap();
    Arc::new(SledIndexerStore::open(&db).unwrap())
}

/// Polls `predicate` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    predicate()
}
