//! Table definition macros.

/// Declares a table marker type and wires it to its key/value types.
macro_rules! define_table {
    ($(#[$docs:meta])+ ($name:ident) $key:ty => $value:ty) => {
        $(#[$docs])+
        #[derive(Clone, Copy, Debug)]
        pub(crate) struct $name;

        impl $crate::table::Table for $name {
            const NAME: &'static str = stringify!($name);
            type Key = $key;
            type Value = $value;
        }
    };
}

/// Implements the key codec for [`bitcoin::Txid`] keys: the raw 32-byte
/// hash, no framing.
macro_rules! impl_txid_key {
    ($name:ident) => {
        impl $crate::table::KeyCodec<$name> for ::bitcoin::Txid {
            fn encode_key(&self) -> ::sidx_db::DbResult<Vec<u8>> {
                use ::bitcoin::hashes::Hash;
                Ok(self.to_byte_array().to_vec())
            }

            fn decode_key(data: &[u8]) -> ::sidx_db::DbResult<Self> {
                use ::bitcoin::hashes::Hash;
                let bytes: [u8; 32] = data.try_into().map_err(|_| {
                    $crate::table::codec_error(
                        <$name as $crate::table::Table>::NAME,
                        format!("expected 32-byte key, got {}", data.len()),
                    )
                })?;
                Ok(::bitcoin::Txid::from_byte_array(bytes))
            }
        }
    };
}

/// Implements the key codec through borsh.
macro_rules! impl_borsh_key {
    ($name:ident, $key:ty) => {
        impl $crate::table::KeyCodec<$name> for $key {
            fn encode_key(&self) -> ::sidx_db::DbResult<Vec<u8>> {
                ::borsh::to_vec(self).map_err(|e| {
                    $crate::table::codec_error(<$name as $crate::table::Table>::NAME, e)
                })
            }

            fn decode_key(data: &[u8]) -> ::sidx_db::DbResult<Self> {
                ::borsh::from_slice(data).map_err(|e| {
                    $crate::table::codec_error(<$name as $crate::table::Table>::NAME, e)
                })
            }
        }
    };
}

/// Implements the value codec through borsh.
macro_rules! impl_borsh_value {
    ($name:ident, $value:ty) => {
        impl $crate::table::ValueCodec<$name> for $value {
            fn encode_value(&self) -> ::sidx_db::DbResult<Vec<u8>> {
                ::borsh::to_vec(self).map_err(|e| {
                    $crate::table::codec_error(<$name as $crate::table::Table>::NAME, e)
                })
            }

            fn decode_value(data: &[u8]) -> ::sidx_db::DbResult<Self> {
                ::borsh::from_slice(data).map_err(|e| {
                    $crate::table::codec_error(<$name as $crate::table::Table>::NAME, e)
                })
            }
        }
    };
}

/// Implements the value codec for [`bitcoin::Txid`] values.
macro_rules! impl_txid_value {
    ($name:ident) => {
        impl $crate::table::ValueCodec<$name> for ::bitcoin::Txid {
            fn encode_value(&self) -> ::sidx_db::DbResult<Vec<u8>> {
                use ::bitcoin::hashes::Hash;
                Ok(self.to_byte_array().to_vec())
            }

            fn decode_value(data: &[u8]) -> ::sidx_db::DbResult<Self> {
                use ::bitcoin::hashes::Hash;
                let bytes: [u8; 32] = data.try_into().map_err(|_| {
                    $crate::table::codec_error(
                        <$name as $crate::table::Table>::NAME,
                        format!("expected 32-byte value, got {}", data.len()),
                    )
                })?;
                Ok(::bitcoin::Txid::from_byte_array(bytes))
            }
        }
    };
}

pub(crate) use {define_table, impl_borsh_key, impl_borsh_value, impl_txid_key, impl_txid_value};
