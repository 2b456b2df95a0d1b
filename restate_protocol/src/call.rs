use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Metadata, Result, SerializeType};

/// A fully resolved handler invocation: who to call and with what.
///
/// The payload is encoded when the call is built, so a payload that cannot be
/// serialized is rejected before anything reaches the network.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerCall {
    pub service: String,
    /// virtual object key, if the handler belongs to a keyed object.
    pub key: Option<String>,
    pub handler: String,
    pub payload: Bytes,
    pub serialize_type: SerializeType,
    pub idempotency_key: Option<String>,
    pub metadata: Metadata,
}

impl HandlerCall {
    pub fn new<P>(service: &str, handler: &str, payload: &P, st: SerializeType) -> Result<Self>
    where
        P: Serialize + ?Sized,
    {
        let payload = st.encode(payload)?;
        Ok(HandlerCall {
            service: service.to_owned(),
            key: None,
            handler: handler.to_owned(),
            payload,
            serialize_type: st,
            idempotency_key: None,
            metadata: Metadata::new(),
        })
    }

    /// a call without a body, used for attach and output lookups.
    pub fn target(service: &str, key: Option<&str>, handler: &str, st: SerializeType) -> Self {
        HandlerCall {
            service: service.to_owned(),
            key: key.map(str::to_owned),
            handler: handler.to_owned(),
            payload: Bytes::new(),
            serialize_type: st,
            idempotency_key: None,
            metadata: Metadata::new(),
        }
    }

    pub fn keyed(mut self, key: &str) -> Self {
        self.key = Some(key.to_owned());
        self
    }

    /// `/{service}/{handler}` or `/{service}/{key}/{handler}`.
    pub fn path(&self) -> String {
        match &self.key {
            Some(key) => format!(
                "/{}/{}/{}",
                urlencoding::encode(&self.service),
                urlencoding::encode(key),
                urlencoding::encode(&self.handler)
            ),
            None => format!(
                "/{}/{}",
                urlencoding::encode(&self.service),
                urlencoding::encode(&self.handler)
            ),
        }
    }
}

/// what the ingress answers to a one-way send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub invocation_id: String,
    #[serde(default)]
    pub status: Option<String>,
}
