//! Typed access to sled trees.
//!
//! A [`Table`] names a tree and fixes its key/value types; [`TypedTree`]
//! wraps the underlying `sled::Tree` so encoding mistakes cannot cross
//! table boundaries.  Multi-tree writes go through raw trees inside a
//! single sled transaction with keys and values encoded up front.

use std::marker::PhantomData;

use sidx_db::{DbError, DbResult};

/// A logical table: tree name plus key/value types.
pub trait Table: Sized + 'static {
    const NAME: &'static str;

    type Key: KeyCodec<Self>;
    type Value: ValueCodec<Self>;
}

pub trait KeyCodec<T: Table>: Sized {
    fn encode_key(&self) -> DbResult<Vec<u8>>;
    fn decode_key(data: &[u8]) -> DbResult<Self>;
}

pub trait ValueCodec<T: Table>: Sized {
    fn encode_value(&self) -> DbResult<Vec<u8>>;
    fn decode_value(data: &[u8]) -> DbResult<Self>;
}

pub(crate) fn codec_error(table: &'static str, reason: impl ToString) -> DbError {
    DbError::Codec {
        table,
        reason: reason.to_string(),
    }
}

pub(crate) fn backend_error(e: impl ToString) -> DbError {
    DbError::Backend(e.to_string())
}

/// Type-safe view over one sled tree.
pub struct TypedTree<T: Table> {
    inner: sled::Tree,
    _marker: PhantomData<T>,
}

impl<T: Table> TypedTree<T> {
    pub fn open(db: &sled::Db) -> DbResult<Self> {
        let inner = db.open_tree(T::NAME).map_err(backend_error)?;
        Ok(Self {
            inner,
            _marker: PhantomData,
        })
    }

    pub fn get(&self, key: &T::Key) -> DbResult<Option<T::Value>> {
        let key = key.encode_key()?;
        let value = self.inner.get(key).map_err(backend_error)?;
        value
            .as_deref()
            .map(T::Value::decode_value)
            .transpose()
    }

    /// Unconditional insert, flushed before returning.
    pub fn insert(&self, key: &T::Key, value: &T::Value) -> DbResult<()> {
        let key = key.encode_key()?;
        let value = value.encode_value()?;
        self.inner.insert(key, value).map_err(backend_error)?;
        self.inner.flush().map_err(backend_error)?;
        Ok(())
    }

    /// Insert failing with [`DbError::AlreadyExists`] when the key is
    /// present, via compare-and-swap so concurrent readers never observe
    /// a partial overwrite.
    pub fn insert_if_absent(&self, key: &T::Key, value: &T::Value) -> DbResult<()> {
        let key = key.encode_key()?;
        let value = value.encode_value()?;
        let swap = self
            .inner
            .compare_and_swap(key, Option::<&[u8]>::None, Some(value))
            .map_err(backend_error)?;
        if swap.is_err() {
            return Err(DbError::AlreadyExists);
        }
        self.inner.flush().map_err(backend_error)?;
        Ok(())
    }

    /// The underlying tree, for multi-tree transactions.
    pub fn raw(&self) -> &sled::Tree {
        &self.inner
    }
}
