use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{Error, ErrorKind, Result};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_MSGPACK: &str = "application/msgpack";

/// structured-data formats a payload can travel in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum SerializeType {
    JSON,
    MsgPack,
}

impl Default for SerializeType {
    fn default() -> Self {
        SerializeType::JSON
    }
}

impl SerializeType {
    pub fn content_type(self) -> &'static str {
        match self {
            SerializeType::JSON => CONTENT_TYPE_JSON,
            SerializeType::MsgPack => CONTENT_TYPE_MSGPACK,
        }
    }

    /// Maps a `content-type` header value to a format, ignoring parameters
    /// such as `charset`.
    pub fn from_content_type(value: &str) -> Option<SerializeType> {
        let essence = value.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            CONTENT_TYPE_JSON => Some(SerializeType::JSON),
            "application/x-msgpack" | CONTENT_TYPE_MSGPACK => Some(SerializeType::MsgPack),
            _ if essence.ends_with("+json") => Some(SerializeType::JSON),
            _ => None,
        }
    }

    pub fn encode<T>(self, value: &T) -> Result<Bytes>
    where
        T: Serialize + ?Sized,
    {
        let data = match self {
            SerializeType::JSON => serde_json::to_vec(value)
                .map_err(|err| Error::new(ErrorKind::Serialization, err))?,
            SerializeType::MsgPack => rmp_serde::to_vec_named(value)
                .map_err(|err| Error::new(ErrorKind::Serialization, err))?,
        };
        Ok(Bytes::from(data))
    }

    /// Decodes a success body. An empty body (or, for JSON, a blank one) is
    /// read as `null`, so handlers that return nothing decode into `()`,
    /// `Option<_>` or `Value::Null`.
    pub fn decode<T>(self, data: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let blank = match self {
            SerializeType::JSON => data.iter().all(u8::is_ascii_whitespace),
            // single bytes like 0x20 are valid msgpack integers
            SerializeType::MsgPack => data.is_empty(),
        };
        if blank {
            return serde_json::from_slice(b"null")
                .map_err(|err| Error::new(ErrorKind::Decoding, err));
        }
        match self {
            SerializeType::JSON => {
                serde_json::from_slice(data).map_err(|err| Error::new(ErrorKind::Decoding, err))
            }
            SerializeType::MsgPack => {
                rmp_serde::from_slice(data).map_err(|err| Error::new(ErrorKind::Decoding, err))
            }
        }
    }
}
