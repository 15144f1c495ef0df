use bytes::Bytes;
use prost::Message as _;

use crate::ring::Endpoint;
use crate::Message;
use crate::StreamAction;
use crate::StreamStatus;
use crate::Verb;

impl Message {
    /// Build an envelope originating from `from`. The correlation id is
    /// only meaningful on request/response verbs; the transport fills
    /// it in when it matters.
    pub fn new(
        verb: Verb,
        from: &Endpoint,
        body: Bytes,
    ) -> Self {
        Self {
            id: 0,
            verb: verb.into(),
            from_host: from.host.clone(),
            from_port: from.port as u32,
            body,
        }
    }

    /// Build a reply to this envelope, echoing its correlation id.
    pub fn reply(
        &self,
        from: &Endpoint,
        body: Bytes,
    ) -> Self {
        Self {
            id: self.id,
            verb: self.verb,
            from_host: from.host.clone(),
            from_port: from.port as u32,
            body,
        }
    }

    /// The sender's network identity.
    pub fn from_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.from_host, self.from_port as u16)
    }

    /// Encode a typed body into an envelope body.
    pub fn encode_body<M: prost::Message>(body: &M) -> Bytes {
        Bytes::from(body.encode_to_vec())
    }

    /// Decode the envelope body into a typed message.
    pub fn decode_body<M: prost::Message + Default>(&self) -> crate::Result<M> {
        Ok(M::decode(self.body.clone())?)
    }
}

impl StreamStatus {
    pub fn new(
        file: impl Into<String>,
        expected_bytes: u64,
    ) -> Self {
        Self {
            file: file.into(),
            expected_bytes,
            bytes_received: 0,
            action: StreamAction::Stream.into(),
        }
    }
}
