pub mod codec;
#[macro_use]
mod records;
mod pdus;
mod registry;

pub use codec::{
    Codec, CodecError, Measurer, OpenEnum, Reader, Wire, Writer, decode, decode_prefix, encode,
    encode_into, measure,
};
pub use pdus::{
    DEFAULT_PORT, DetonationPdu, EntityStatePdu, EventReportPdu, FirePdu, HEADER_LEN, PROTOCOL_VERSION,
    Pdu, PduBody, PduHeader, PduKind, encode_datagram, relative_timestamp, timestamp_now,
};
pub use records::{
    Appearance, ArticulatedPart, ArticulationParameter, BurstDescriptor, Capabilities,
    DamageState, DeadReckoning, DeadReckoningAlgorithm, DetonationResult, EntityId, EntityType,
    EventId, FixedDatumRecord, ForceId, FuseType, LifeformState, MarkingText,
    ParameterTypeDesignator, ParseIdError, VariableDatumRecord, Vector3Double, Vector3Float,
    WarheadType, WeaponState,
};
pub use registry::{DecodeFn, PduRegistry, decode_datagram, split_header};
