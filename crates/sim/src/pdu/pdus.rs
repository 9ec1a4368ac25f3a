use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::codec::{Codec, CodecError, Measurer, OpenEnum, Wire, Writer};
use super::records::{
    Appearance, ArticulatedPart, ArticulationParameter, BurstDescriptor, Capabilities,
    DeadReckoning, DetonationResult, EntityId, EntityType, EventId, FixedDatumRecord, ForceId,
    MarkingText, VariableDatumRecord, Vector3Double, Vector3Float,
};

pub const PROTOCOL_VERSION: u8 = 7;
pub const DEFAULT_PORT: u16 = 3000;
pub const HEADER_LEN: usize = 12;

open_enum! {
    pub enum PduKind: u8 = Other {
        Other = 0,
        EntityState = 1,
        Fire = 2,
        Detonation = 3,
        EventReport = 21,
    }
}

impl PduKind {
    pub fn protocol_family(self) -> u8 {
        match self.canonical() {
            PduKind::EntityState => 1,
            PduKind::Fire | PduKind::Detonation => 2,
            PduKind::EventReport => 5,
            PduKind::Other | PduKind::Unknown(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PduHeader {
    pub protocol_version: u8,
    pub exercise_id: u8,
    pub kind: PduKind,
    pub protocol_family: u8,
    pub timestamp: u32,
    pub length: u16,
}

impl Wire for PduHeader {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u8(&mut self.protocol_version)?;
        codec.u8(&mut self.exercise_id)?;
        codec.enum_u8(&mut self.kind)?;
        codec.u8(&mut self.protocol_family)?;
        codec.u32(&mut self.timestamp)?;
        codec.u16(&mut self.length)?;
        codec.padding(2)
    }
}

/// A message body with a fixed kind tag.
pub trait PduBody: Wire + Default + Clone + Into<Pdu> + 'static {
    const KIND: PduKind;

    fn from_pdu(pdu: &Pdu) -> Option<&Self>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityStatePdu {
    pub entity_id: EntityId,
    pub force_id: ForceId,
    pub entity_type: EntityType,
    pub alternative_entity_type: EntityType,
    pub linear_velocity: Vector3Float,
    pub location: Vector3Double,
    pub orientation: Vector3Float,
    pub appearance: Appearance,
    pub dead_reckoning: DeadReckoning,
    pub marking: MarkingText,
    pub capabilities: Capabilities,
    pub articulated_parts: Vec<ArticulatedPart>,
}

impl Wire for EntityStatePdu {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.record(&mut self.entity_id)?;
        codec.enum_u8(&mut self.force_id)?;
        codec.count_u8(&mut self.articulated_parts, "articulated part")?;
        codec.record(&mut self.entity_type)?;
        codec.record(&mut self.alternative_entity_type)?;
        codec.record(&mut self.linear_velocity)?;
        codec.record(&mut self.location)?;
        codec.record(&mut self.orientation)?;
        codec.record(&mut self.appearance)?;
        codec.record(&mut self.dead_reckoning)?;
        codec.record(&mut self.marking)?;
        codec.record(&mut self.capabilities)?;
        codec.records(&mut self.articulated_parts)
    }
}

impl PduBody for EntityStatePdu {
    const KIND: PduKind = PduKind::EntityState;

    fn from_pdu(pdu: &Pdu) -> Option<&Self> {
        match pdu {
            Pdu::EntityState(body) => Some(body),
            _ => None,
        }
    }
}

impl From<EntityStatePdu> for Pdu {
    fn from(body: EntityStatePdu) -> Self {
        Pdu::EntityState(body)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirePdu {
    pub firing_entity_id: EntityId,
    pub target_entity_id: EntityId,
    pub munition_id: EntityId,
    pub event_id: EventId,
    pub fire_mission_index: u32,
    pub location: Vector3Double,
    pub burst: BurstDescriptor,
    pub velocity: Vector3Float,
    pub range: f32,
}

impl Wire for FirePdu {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.record(&mut self.firing_entity_id)?;
        codec.record(&mut self.target_entity_id)?;
        codec.record(&mut self.munition_id)?;
        codec.record(&mut self.event_id)?;
        codec.u32(&mut self.fire_mission_index)?;
        codec.record(&mut self.location)?;
        codec.record(&mut self.burst)?;
        codec.record(&mut self.velocity)?;
        codec.f32(&mut self.range)
    }
}

impl PduBody for FirePdu {
    const KIND: PduKind = PduKind::Fire;

    fn from_pdu(pdu: &Pdu) -> Option<&Self> {
        match pdu {
            Pdu::Fire(body) => Some(body),
            _ => None,
        }
    }
}

impl From<FirePdu> for Pdu {
    fn from(body: FirePdu) -> Self {
        Pdu::Fire(body)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetonationPdu {
    pub firing_entity_id: EntityId,
    pub target_entity_id: EntityId,
    pub munition_id: EntityId,
    pub event_id: EventId,
    pub velocity: Vector3Float,
    pub location: Vector3Double,
    pub burst: BurstDescriptor,
    pub location_in_entity: Vector3Float,
    pub result: DetonationResult,
    pub articulation_parameters: Vec<ArticulationParameter>,
}

impl Wire for DetonationPdu {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.record(&mut self.firing_entity_id)?;
        codec.record(&mut self.target_entity_id)?;
        codec.record(&mut self.munition_id)?;
        codec.record(&mut self.event_id)?;
        codec.record(&mut self.velocity)?;
        codec.record(&mut self.location)?;
        codec.record(&mut self.burst)?;
        codec.record(&mut self.location_in_entity)?;
        codec.enum_u8(&mut self.result)?;
        codec.count_u8(&mut self.articulation_parameters, "articulation parameter")?;
        codec.padding(2)?;
        codec.records(&mut self.articulation_parameters)
    }
}

impl PduBody for DetonationPdu {
    const KIND: PduKind = PduKind::Detonation;

    fn from_pdu(pdu: &Pdu) -> Option<&Self> {
        match pdu {
            Pdu::Detonation(body) => Some(body),
            _ => None,
        }
    }
}

impl From<DetonationPdu> for Pdu {
    fn from(body: DetonationPdu) -> Self {
        Pdu::Detonation(body)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReportPdu {
    pub originating_entity_id: EntityId,
    pub receiving_entity_id: EntityId,
    pub event_type: u32,
    pub fixed_datums: Vec<FixedDatumRecord>,
    pub variable_datums: Vec<VariableDatumRecord>,
}

impl Wire for EventReportPdu {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.record(&mut self.originating_entity_id)?;
        codec.record(&mut self.receiving_entity_id)?;
        codec.u32(&mut self.event_type)?;
        codec.padding(4)?;
        codec.count_u32(&mut self.fixed_datums, "fixed datum")?;
        codec.count_u32(&mut self.variable_datums, "variable datum")?;
        codec.records(&mut self.fixed_datums)?;
        codec.records(&mut self.variable_datums)
    }
}

impl PduBody for EventReportPdu {
    const KIND: PduKind = PduKind::EventReport;

    fn from_pdu(pdu: &Pdu) -> Option<&Self> {
        match pdu {
            Pdu::EventReport(body) => Some(body),
            _ => None,
        }
    }
}

impl From<EventReportPdu> for Pdu {
    fn from(body: EventReportPdu) -> Self {
        Pdu::EventReport(body)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pdu {
    EntityState(EntityStatePdu),
    Fire(FirePdu),
    Detonation(DetonationPdu),
    EventReport(EventReportPdu),
}

impl Pdu {
    pub fn kind(&self) -> PduKind {
        match self {
            Pdu::EntityState(_) => EntityStatePdu::KIND,
            Pdu::Fire(_) => FirePdu::KIND,
            Pdu::Detonation(_) => DetonationPdu::KIND,
            Pdu::EventReport(_) => EventReportPdu::KIND,
        }
    }
}

impl Wire for Pdu {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        match self {
            Pdu::EntityState(body) => body.operate(codec),
            Pdu::Fire(body) => body.operate(codec),
            Pdu::Detonation(body) => body.operate(codec),
            Pdu::EventReport(body) => body.operate(codec),
        }
    }
}

/// Serializes `pdu` behind a header whose length covers header and body.
pub fn encode_datagram(
    pdu: &Pdu,
    exercise_id: u8,
    protocol_version: u8,
    timestamp: u32,
) -> Result<Vec<u8>, CodecError> {
    let mut body = pdu.clone();
    let mut measurer = Measurer::default();
    body.operate(&mut measurer)?;
    let total = HEADER_LEN + measurer.len();
    let length = u16::try_from(total).map_err(|_| CodecError::LengthOverflow {
        what: "pdu byte",
        count: total,
    })?;

    let kind = pdu.kind();
    let mut header = PduHeader {
        protocol_version,
        exercise_id,
        kind,
        protocol_family: kind.protocol_family(),
        timestamp,
        length,
    };

    let mut writer = Writer::with_buffer(Vec::with_capacity(total));
    header.operate(&mut writer)?;
    body.operate(&mut writer)?;
    Ok(writer.into_inner())
}

/// Relative timestamp for a point `fraction_of_hour` into the current hour.
/// The low bit (absolute flag) is always clear.
pub fn relative_timestamp(fraction_of_hour: f64) -> u32 {
    const UNITS_PER_HOUR: u32 = (1 << 31) - 1;
    let units = (fraction_of_hour.clamp(0.0, 1.0) * UNITS_PER_HOUR as f64) as u32;
    units << 1
}

/// Relative timestamp for the current wall-clock time.
///
/// Seconds into the hour are taken from UTC. Every zone with a whole-hour
/// offset agrees on that value, so peers using local time still match.
pub fn timestamp_now() -> u32 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let into_hour = since_epoch.as_secs_f64() % 3600.0;
    relative_timestamp(into_hour / 3600.0)
}
