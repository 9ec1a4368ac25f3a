use std::collections::HashMap;

use super::codec::{CodecError, decode, decode_prefix};
use super::pdus::{
    DetonationPdu, EntityStatePdu, EventReportPdu, FirePdu, Pdu, PduBody, PduHeader, PduKind,
};

pub type DecodeFn = fn(&[u8]) -> Result<Pdu, CodecError>;

fn decode_body<T: PduBody>(bytes: &[u8]) -> Result<Pdu, CodecError> {
    decode::<T>(bytes).map(Into::into)
}

/// Maps a kind tag to the decoder for its body.
#[derive(Debug, Clone)]
pub struct PduRegistry {
    decoders: HashMap<PduKind, DecodeFn>,
}

impl PduRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn register<T: PduBody>(&mut self) {
        self.decoders.insert(T::KIND, decode_body::<T>);
    }

    pub fn register_fn(&mut self, kind: PduKind, decoder: DecodeFn) {
        self.decoders.insert(kind, decoder);
    }

    pub fn is_registered(&self, kind: PduKind) -> bool {
        self.decoders.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = PduKind> + '_ {
        self.decoders.keys().copied()
    }

    /// Returns `None` for kinds nobody registered.
    pub fn decode(&self, kind: PduKind, body: &[u8]) -> Option<Result<Pdu, CodecError>> {
        self.decoders.get(&kind).map(|decoder| decoder(body))
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register::<EntityStatePdu>();
        registry.register::<FirePdu>();
        registry.register::<DetonationPdu>();
        registry.register::<EventReportPdu>();
        registry
    }
}

/// Splits a datagram into its header and body bytes.
pub fn split_header(datagram: &[u8]) -> Result<(PduHeader, &[u8]), CodecError> {
    decode_prefix::<PduHeader>(datagram)
}

/// Decodes a whole datagram. Unregistered kinds yield `Ok(None)`.
pub fn decode_datagram(
    registry: &PduRegistry,
    datagram: &[u8],
) -> Result<Option<(PduHeader, Pdu)>, CodecError> {
    let (header, body) = split_header(datagram)?;
    match registry.decode(header.kind, body) {
        Some(result) => result.map(|pdu| Some((header, pdu))),
        None => Ok(None),
    }
}
