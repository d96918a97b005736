use bitcoin::Txid;
use sidx_db::{DbError, DbResult, IndexerDatabase};
use sidx_types::{RecordError, StoredStakingTx, StoredUnbondingTx};
use sled::{
    transaction::{ConflictableTransactionError, TransactionError},
    Transactional,
};

use crate::{
    schemas::{MetaKey, MetaTable, StakingTxTable, UnbondingIndexTable, UnbondingTxTable},
    table::{backend_error, codec_error, KeyCodec, Table, TypedTree, ValueCodec},
};

/// Bump when the persisted layout changes; upgrades are gated on it.
pub const DB_SCHEMA_VERSION: u64 = 1;

fn encode_key<T: Table>(key: &T::Key) -> DbResult<Vec<u8>> {
    key.encode_key()
}

fn encode_value<T: Table>(value: &T::Value) -> DbResult<Vec<u8>> {
    value.encode_value()
}

fn unwrap_txn_error(e: TransactionError<DbError>) -> DbError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => backend_error(e),
    }
}

fn record_error<T: Table>(e: RecordError) -> DbError {
    codec_error(T::NAME, e)
}

/// Sled-backed store with one tree per logical table.
pub struct SledIndexerStore {
    staking: TypedTree<StakingTxTable>,
    unbonding: TypedTree<UnbondingTxTable>,
    unbonding_idx: TypedTree<UnbondingIndexTable>,
    meta: TypedTree<MetaTable>,
}

impl SledIndexerStore {
    /// Opens the four trees and checks the schema version, stamping it on
    /// first open.
    pub fn open(db: &sled::Db) -> DbResult<Self> {
        let store = Self {
            staking: TypedTree::open(db)?,
            unbonding: TypedTree::open(db)?,
            unbonding_idx: TypedTree::open(db)?,
            meta: TypedTree::open(db)?,
        };

        match store.meta.get(&MetaKey::SchemaVersion)? {
            None => store.meta.insert(&MetaKey::SchemaVersion, &DB_SCHEMA_VERSION)?,
            Some(found) if found == DB_SCHEMA_VERSION => (),
            Some(found) => {
                return Err(DbError::InvalidSchemaVersion {
                    expected: DB_SCHEMA_VERSION,
                    found,
                })
            }
        }

        Ok(store)
    }
}

impl IndexerDatabase for SledIndexerStore {
    fn put_staking_tx(&self, record: &StoredStakingTx) -> DbResult<()> {
        let tx_hash = record.tx_hash().map_err(record_error::<StakingTxTable>)?;
        self.staking.insert_if_absent(&tx_hash, record)
    }

    fn get_staking_tx(&self, tx_hash: &Txid) -> DbResult<Option<StoredStakingTx>> {
        self.staking.get(tx_hash)
    }

    fn put_unbonding_tx(&self, record: &StoredUnbondingTx) -> DbResult<()> {
        let tx_hash = record.tx_hash().map_err(record_error::<UnbondingTxTable>)?;
        let staking_hash = record.staking_tx_hash();

        let unbonding_key = encode_key::<UnbondingTxTable>(&tx_hash)?;
        let unbonding_value = encode_value::<UnbondingTxTable>(record)?;
        let index_key = encode_key::<UnbondingIndexTable>(&staking_hash)?;
        let index_value = encode_value::<UnbondingIndexTable>(&tx_hash)?;

        // Both trees move together or not at all; the secondary-index
        // check inside the transaction is what makes a second unbonding
        // of the same staking output lose.
        (self.unbonding.raw(), self.unbonding_idx.raw())
            .transaction(|(unbonding, index)| {
                if unbonding.get(&unbonding_key)?.is_some() || index.get(&index_key)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(DbError::AlreadyExists));
                }
                unbonding.insert(unbonding_key.as_slice(), unbonding_value.as_slice())?;
                index.insert(index_key.as_slice(), index_value.as_slice())?;
                Ok(())
            })
            .map_err(unwrap_txn_error)?;

        self.unbonding.raw().flush().map_err(backend_error)?;
        self.unbonding_idx.raw().flush().map_err(backend_error)?;
        Ok(())
    }

    fn get_unbonding_tx(&self, tx_hash: &Txid) -> DbResult<Option<StoredUnbondingTx>> {
        self.unbonding.get(tx_hash)
    }

    fn get_unbonding_tx_by_staking(&self, staking_tx_hash: &Txid) -> DbResult<Option<Txid>> {
        self.unbonding_idx.get(staking_tx_hash)
    }

    fn get_last_processed_height(&self) -> DbResult<Option<u64>> {
        self.meta.get(&MetaKey::LastProcessedHeight)
    }

    fn set_last_processed_height(&self, height: u64) -> DbResult<()> {
        let key = encode_key::<MetaTable>(&MetaKey::LastProcessedHeight)?;
        let value = encode_value::<MetaTable>(&height)?;

        self.meta
            .raw()
            .transaction(|meta| {
                if let Some(raw) = meta.get(&key)? {
                    let current = <u64 as ValueCodec<MetaTable>>::decode_value(raw.as_ref())
                        .map_err(ConflictableTransactionError::Abort)?;
                    // Rewriting the same height is a block replay, which
                    // is fine; only going backwards is rejected.
                    if height < current {
                        return Err(ConflictableTransactionError::Abort(
                            DbError::NonMonotonicHeight {
                                current,
                                attempted: height,
                            },
                        ));
                    }
                }
                meta.insert(key.as_slice(), value.as_slice())?;
                Ok(())
            })
            .map_err(unwrap_txn_error)?;

        self.meta.raw().flush().map_err(backend_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        absolute::LockTime,
        hashes::Hash,
        secp256k1::{Secp256k1, SecretKey},
        transaction::Version,
        Amount, OutPoint, Transaction, TxIn, XOnlyPublicKey,
    };

    use super::*;

    fn setup_store() -> SledIndexerStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        SledIndexerStore::open(&db).unwrap()
    }

    fn pk(byte: u8) -> XOnlyPublicKey {
        let sk = SecretKey::from_slice(&[byte; 32]).unwrap();
        sk.x_only_public_key(&Secp256k1::new()).0
    }

    fn tx_with_locktime(n: u32) -> Transaction {
        Transaction {
            version: Version(2),
            lock_time: LockTime::from_consensus(n),
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                ..Default::default()
            }],
            output: vec![],
        }
    }

    fn staking_record(n: u32) -> StoredStakingTx {
        StoredStakingTx::new(
            &tx_with_locktime(n),
            &pk(1),
            &pk(2),
            144,
            Amount::from_sat(50_000),
            0,
            100,
            1_700_000_000,
            false,
        )
    }

    fn unbonding_record(n: u32, staking_hash: Txid) -> StoredUnbondingTx {
        StoredUnbondingTx::new(&tx_with_locktime(n), staking_hash, 101, 1_700_000_600)
    }

    #[test]
    fn staking_put_get_roundtrip() {
        let store = setup_store();
        let record = staking_record(1);
        let hash = record.tx_hash().unwrap();

        store.put_staking_tx(&record).unwrap();
        assert_eq!(store.get_staking_tx(&hash).unwrap(), Some(record.clone()));

        assert!(matches!(
            store.put_staking_tx(&record),
            Err(DbError::AlreadyExists)
        ));
        // The stored record is untouched by the failed re-put.
        assert_eq!(store.get_staking_tx(&hash).unwrap(), Some(record));
    }

    #[test]
    fn missing_records_read_as_none() {
        let store = setup_store();
        let absent = Txid::from_byte_array([9u8; 32]);
        assert_eq!(store.get_staking_tx(&absent).unwrap(), None);
        assert_eq!(store.get_unbonding_tx(&absent).unwrap(), None);
        assert_eq!(store.get_unbonding_tx_by_staking(&absent).unwrap(), None);
    }

    #[test]
    fn unbonding_put_writes_both_tables() {
        let store = setup_store();
        let staking_hash = staking_record(1).tx_hash().unwrap();
        let record = unbonding_record(2, staking_hash);
        let hash = record.tx_hash().unwrap();

        store.put_unbonding_tx(&record).unwrap();

        assert_eq!(store.get_unbonding_tx(&hash).unwrap(), Some(record));
        assert_eq!(
            store.get_unbonding_tx_by_staking(&staking_hash).unwrap(),
            Some(hash)
        );
    }

    #[test]
    fn second_unbonding_of_same_staking_loses() {
        let store = setup_store();
        let staking_hash = staking_record(1).tx_hash().unwrap();
        let first = unbonding_record(2, staking_hash);
        let second = unbonding_record(3, staking_hash);

        store.put_unbonding_tx(&first).unwrap();
        assert!(matches!(
            store.put_unbonding_tx(&second),
            Err(DbError::AlreadyExists)
        ));

        // The loser left no trace in either table.
        assert_eq!(
            store
                .get_unbonding_tx(&second.tx_hash().unwrap())
                .unwrap(),
            None
        );
        assert_eq!(
            store.get_unbonding_tx_by_staking(&staking_hash).unwrap(),
            Some(first.tx_hash().unwrap())
        );
    }

    #[test]
    fn replayed_unbonding_is_already_exists() {
        let store = setup_store();
        let staking_hash = staking_record(1).tx_hash().unwrap();
        let record = unbonding_record(2, staking_hash);

        store.put_unbonding_tx(&record).unwrap();
        assert!(matches!(
            store.put_unbonding_tx(&record),
            Err(DbError::AlreadyExists)
        ));
    }

    #[test]
    fn last_processed_height_is_monotonic() {
        let store = setup_store();
        assert_eq!(store.get_last_processed_height().unwrap(), None);

        store.set_last_processed_height(5).unwrap();
        assert_eq!(store.get_last_processed_height().unwrap(), Some(5));

        // Replaying the same height is allowed.
        store.set_last_processed_height(5).unwrap();

        assert!(matches!(
            store.set_last_processed_height(4),
            Err(DbError::NonMonotonicHeight {
                current: 5,
                attempted: 4
            })
        ));

        store.set_last_processed_height(6).unwrap();
        assert_eq!(store.get_last_processed_height().unwrap(), Some(6));
    }

    #[test]
    fn schema_version_survives_reopen() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        {
            let store = SledIndexerStore::open(&db).unwrap();
            store.set_last_processed_height(7).unwrap();
        }
        let store = SledIndexerStore::open(&db).unwrap();
        assert_eq!(store.get_last_processed_height().unwrap(), Some(7));
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        {
            let store = SledIndexerStore::open(&db).unwrap();
            store
                .meta
                .insert(&MetaKey::SchemaVersion, &(DB_SCHEMA_VERSION + 1))
                .unwrap();
        }
        assert!(matches!(
            SledIndexerStore::open(&db),
            Err(DbError::InvalidSchemaVersion { .. })
        ));
    }
}
