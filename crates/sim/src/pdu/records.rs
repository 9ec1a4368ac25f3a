use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use bitflags::bitflags;
use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

use super::codec::{Codec, CodecError, OpenEnum, Wire};

macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $raw:ty = $default:ident {
            $($variant:ident = $value:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
        pub enum $name {
            $($variant,)*
            Unknown($raw),
        }

        // Equality follows the wire value, so `Unknown(n)` equals the named
        // variant encoded as `n`.
        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.to_raw() == other.to_raw()
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash(&self.to_raw(), state);
            }
        }

        impl $name {
            /// The named variant for a known raw value, `Unknown` otherwise.
            pub fn canonical(self) -> Self {
                Self::from_raw(self.to_raw())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl OpenEnum<$raw> for $name {
            fn from_raw(raw: $raw) -> Self {
                match raw {
                    $($value => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }

            fn to_raw(self) -> $raw {
                match self {
                    $(Self::$variant => $value,)*
                    Self::Unknown(raw) => raw,
                }
            }
        }

        impl From<$raw> for $name {
            fn from(raw: $raw) -> Self {
                Self::from_raw(raw)
            }
        }

        impl From<$name> for $raw {
            fn from(value: $name) -> Self {
                value.to_raw()
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("expected {expected} ':'-separated fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid field {field:?}: {source}")]
    InvalidField {
        field: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

fn split_fields<const N: usize>(s: &str) -> Result<[&str; N], ParseIdError> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    parts
        .as_slice()
        .try_into()
        .map_err(|_| ParseIdError::FieldCount {
            expected: N,
            found: parts.len(),
        })
}

fn parse_field<T: FromStr<Err = std::num::ParseIntError>>(field: &str) -> Result<T, ParseIdError> {
    field.parse().map_err(|source| ParseIdError::InvalidField {
        field: field.to_string(),
        source,
    })
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId {
    pub site: u16,
    pub application: u16,
    pub entity: u16,
}

impl EntityId {
    pub const fn new(site: u16, application: u16, entity: u16) -> Self {
        Self {
            site,
            application,
            entity,
        }
    }
}

impl Wire for EntityId {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u16(&mut self.site)?;
        codec.u16(&mut self.application)?;
        codec.u16(&mut self.entity)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.site, self.application, self.entity)
    }
}

impl FromStr for EntityId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [site, application, entity] = split_fields::<3>(s)?;
        Ok(Self {
            site: parse_field(site)?,
            application: parse_field(application)?,
            entity: parse_field(entity)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub site: u16,
    pub application: u16,
    pub event: u16,
}

impl EventId {
    pub const fn new(site: u16, application: u16, event: u16) -> Self {
        Self {
            site,
            application,
            event,
        }
    }
}

impl Wire for EventId {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u16(&mut self.site)?;
        codec.u16(&mut self.application)?;
        codec.u16(&mut self.event)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.site, self.application, self.event)
    }
}

impl FromStr for EventId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [site, application, event] = split_fields::<3>(s)?;
        Ok(Self {
            site: parse_field(site)?,
            application: parse_field(application)?,
            event: parse_field(event)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType {
    pub kind: u8,
    pub domain: u8,
    pub country: u16,
    pub category: u8,
    pub subcategory: u8,
    pub specific: u8,
    pub extra: u8,
}

impl EntityType {
    pub const fn new(
        kind: u8,
        domain: u8,
        country: u16,
        category: u8,
        subcategory: u8,
        specific: u8,
        extra: u8,
    ) -> Self {
        Self {
            kind,
            domain,
            country,
            category,
            subcategory,
            specific,
            extra,
        }
    }
}

impl Wire for EntityType {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u8(&mut self.kind)?;
        codec.u8(&mut self.domain)?;
        codec.u16(&mut self.country)?;
        codec.u8(&mut self.category)?;
        codec.u8(&mut self.subcategory)?;
        codec.u8(&mut self.specific)?;
        codec.u8(&mut self.extra)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            self.kind,
            self.domain,
            self.country,
            self.category,
            self.subcategory,
            self.specific,
            self.extra
        )
    }
}

impl FromStr for EntityType {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [kind, domain, country, category, subcategory, specific, extra] =
            split_fields::<7>(s)?;
        Ok(Self {
            kind: parse_field(kind)?,
            domain: parse_field(domain)?,
            country: parse_field(country)?,
            category: parse_field(category)?,
            subcategory: parse_field(subcategory)?,
            specific: parse_field(specific)?,
            extra: parse_field(extra)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3Float {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3Float {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn to_dvec3(self) -> DVec3 {
        DVec3::new(self.x as f64, self.y as f64, self.z as f64)
    }
}

impl From<Vec3> for Vector3Float {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl Add for Vector3Float {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        (self.to_vec3() + rhs.to_vec3()).into()
    }
}

impl Sub for Vector3Float {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        (self.to_vec3() - rhs.to_vec3()).into()
    }
}

impl Mul<f32> for Vector3Float {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        (self.to_vec3() * rhs).into()
    }
}

impl Wire for Vector3Float {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.f32(&mut self.x)?;
        codec.f32(&mut self.y)?;
        codec.f32(&mut self.z)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3Double {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3Double {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_dvec3(self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }
}

impl From<DVec3> for Vector3Double {
    fn from(v: DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl Add for Vector3Double {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        (self.to_dvec3() + rhs.to_dvec3()).into()
    }
}

impl Add<Vector3Float> for Vector3Double {
    type Output = Self;

    fn add(self, rhs: Vector3Float) -> Self {
        (self.to_dvec3() + rhs.to_dvec3()).into()
    }
}

impl Sub for Vector3Double {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        (self.to_dvec3() - rhs.to_dvec3()).into()
    }
}

impl Mul<f64> for Vector3Double {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        (self.to_dvec3() * rhs).into()
    }
}

impl Wire for Vector3Double {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.f64(&mut self.x)?;
        codec.f64(&mut self.y)?;
        codec.f64(&mut self.z)
    }
}

open_enum! {
    pub enum ForceId: u8 = Other {
        Other = 0,
        Friendly = 1,
        Opposing = 2,
        Neutral = 3,
    }
}

open_enum! {
    pub enum DamageState: u8 = NoDamage {
        NoDamage = 0,
        SlightDamage = 1,
        ModerateDamage = 2,
        Destroyed = 3,
    }
}

open_enum! {
    pub enum LifeformState: u8 = Null {
        Null = 0,
        UprightStandingStill = 1,
        UprightWalking = 2,
        UprightRunning = 3,
        Kneeling = 4,
        Prone = 5,
        Crawling = 6,
        Swimming = 7,
        Parachuting = 8,
        Jumping = 9,
    }
}

open_enum! {
    pub enum WeaponState: u8 = NotPresent {
        NotPresent = 0,
        Stowed = 1,
        Deployed = 2,
        FiringPosition = 3,
    }
}

/// Packed appearance register. Sub-field accessors only touch their own bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Appearance {
    pub bits: u32,
}

impl Appearance {
    const DAMAGE: (u32, u32) = (3, 2);
    const LIFEFORM_STATE: (u32, u32) = (16, 4);
    const PRIMARY_WEAPON: (u32, u32) = (24, 4);

    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    pub fn damage(&self) -> DamageState {
        DamageState::from_raw(self.field(Self::DAMAGE) as u8)
    }

    pub fn set_damage(&mut self, state: DamageState) {
        self.set_field(Self::DAMAGE, state.to_raw() as u32);
    }

    // Lifeform entities only.
    pub fn lifeform_state(&self) -> LifeformState {
        LifeformState::from_raw(self.field(Self::LIFEFORM_STATE) as u8)
    }

    pub fn set_lifeform_state(&mut self, state: LifeformState) {
        self.set_field(Self::LIFEFORM_STATE, state.to_raw() as u32);
    }

    // Lifeform entities only.
    pub fn primary_weapon(&self) -> WeaponState {
        WeaponState::from_raw(self.field(Self::PRIMARY_WEAPON) as u8)
    }

    pub fn set_primary_weapon(&mut self, state: WeaponState) {
        self.set_field(Self::PRIMARY_WEAPON, state.to_raw() as u32);
    }

    fn mask(width: u32) -> u32 {
        (1u32 << width) - 1
    }

    fn field(&self, (shift, width): (u32, u32)) -> u32 {
        (self.bits >> shift) & Self::mask(width)
    }

    fn set_field(&mut self, (shift, width): (u32, u32), value: u32) {
        let mask = Self::mask(width) << shift;
        self.bits = (self.bits & !mask) | ((value << shift) & mask);
    }
}

impl Wire for Appearance {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u32(&mut self.bits)
    }
}

open_enum! {
    pub enum DeadReckoningAlgorithm: u8 = Rvw {
        Other = 0,
        Static = 1,
        Fpw = 2,
        Rpw = 3,
        Rvw = 4,
        Fvw = 5,
        Fpb = 6,
        Rpb = 7,
        Rvb = 8,
        Fvb = 9,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadReckoning {
    pub algorithm: DeadReckoningAlgorithm,
    pub linear_acceleration: Vector3Float,
    pub angular_velocity: Vector3Float,
}

impl Wire for DeadReckoning {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.enum_u8(&mut self.algorithm)?;
        codec.padding(15)?;
        codec.record(&mut self.linear_acceleration)?;
        codec.record(&mut self.angular_velocity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkingText {
    pub character_set: u8,
    pub text: String,
}

impl MarkingText {
    pub const LEN: usize = 11;

    pub fn ascii(text: impl Into<String>) -> Self {
        Self {
            character_set: 1,
            text: text.into(),
        }
    }
}

impl Default for MarkingText {
    fn default() -> Self {
        Self::ascii(String::new())
    }
}

impl Wire for MarkingText {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u8(&mut self.character_set)?;
        codec.ascii(&mut self.text, Self::LEN)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        const AMMUNITION_SUPPLY = 1 << 0;
        const FUEL_SUPPLY = 1 << 1;
        const RECOVERY = 1 << 2;
        const REPAIR = 1 << 3;
    }
}

impl Wire for Capabilities {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        let mut raw = self.bits();
        codec.u32(&mut raw)?;
        *self = Self::from_bits_retain(raw);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticulatedPart {
    pub type_designator: u8,
    pub change_indicator: u8,
    pub type_variant_attached: u32,
    pub type_variant_articulated: u32,
    pub value: f64,
}

impl Wire for ArticulatedPart {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u8(&mut self.type_designator)?;
        codec.u8(&mut self.change_indicator)?;
        codec.u32(&mut self.type_variant_attached)?;
        codec.u32(&mut self.type_variant_articulated)?;
        codec.f64(&mut self.value)
    }
}

open_enum! {
    pub enum WarheadType: u16 = Other {
        Other = 0,
        CargoVariableSubmunitions = 10,
        FuelAirExplosive = 20,
        GlassBeads = 30,
        HighExplosive = 1000,
        HePlastic = 1100,
        HeIncendiary = 1200,
        HeFragmentation = 1300,
        HeAntitank = 1400,
        HeBomblets = 1500,
        HeShapedCharge = 1600,
        HeGeneralPurpose = 1670,
        HeAntipersonnel = 1685,
        Smoke = 2000,
        Illumination = 3000,
        Practice = 4000,
        Kinetic = 5000,
        Mines = 6000,
        Nuclear = 7000,
        ChemicalGeneral = 8000,
        Biological = 9000,
    }
}

open_enum! {
    pub enum FuseType: u16 = Other {
        Other = 0,
        IntelligentInfluence = 10,
        Sensor = 20,
        SelfDestruct = 30,
        UltraQuick = 40,
        Body = 50,
        DeepIntrusion = 60,
        Multifunction = 100,
        PointDetonation = 200,
        BaseDetonation = 300,
        Contact = 1000,
        ContactInstantImpact = 1100,
        ContactDelayed = 1200,
        Timed = 2000,
        TimedProgrammable = 2100,
        Proximity = 3000,
        ProximityActiveLaser = 3100,
        ProximityRadioFrequency = 3400,
        Command = 4000,
        Altitude = 5000,
        Depth = 6000,
        Acoustic = 7000,
        Pressure = 8000,
        Inert = 8100,
        Dummy = 8110,
        Practice = 8120,
        Training = 8150,
        Pyrotechnic = 9000,
        Electronic = 9500,
        Mechanical = 9600,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BurstDescriptor {
    pub munition: EntityType,
    pub warhead: WarheadType,
    pub fuse: FuseType,
    pub quantity: u16,
    pub rate: u16,
}

impl Wire for BurstDescriptor {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.record(&mut self.munition)?;
        codec.enum_u16(&mut self.warhead)?;
        codec.enum_u16(&mut self.fuse)?;
        codec.u16(&mut self.quantity)?;
        codec.u16(&mut self.rate)
    }
}

open_enum! {
    pub enum DetonationResult: u8 = Other {
        Other = 0,
        EntityImpact = 1,
        EntityProximateDetonation = 2,
        GroundImpact = 3,
        GroundProximateDetonation = 4,
        Detonation = 5,
        Dud = 6,
        HeHitSmall = 7,
        HeHitMedium = 8,
        HeHitLarge = 9,
        ArmorPiercingHit = 10,
        DirtBlastSmall = 11,
        DirtBlastMedium = 12,
        DirtBlastLarge = 13,
        WaterBlastSmall = 14,
        WaterBlastMedium = 15,
        WaterBlastLarge = 16,
        AirHit = 17,
        BuildingHitSmall = 18,
        BuildingHitMedium = 19,
        BuildingHitLarge = 20,
        MineClearingLineCharge = 21,
        EnvironmentObjectImpact = 22,
        EnvironmentObjectProximateDetonation = 23,
        WaterImpact = 24,
        AirBurst = 25,
        KillWithFragmentType1 = 26,
        KillWithFragmentType2 = 27,
        KillWithFragmentType3 = 28,
        KillWithFragmentType1AfterFlyOutFailure = 29,
        KillWithFragmentType2AfterFlyOutFailure = 30,
        MissDueToFlyOutFailure = 31,
        MissDueToEndGameFailure = 32,
        MissDueToFlyOutAndEndGameFailure = 33,
    }
}

open_enum! {
    pub enum ParameterTypeDesignator: u8 = ArticulatedPart {
        ArticulatedPart = 0,
        AttachedPart = 1,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticulationParameter {
    pub type_designator: ParameterTypeDesignator,
    pub change_indicator: u8,
    pub attachment_id: u16,
    pub type_variant: u64,
    pub value: u64,
}

impl Wire for ArticulationParameter {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.enum_u8(&mut self.type_designator)?;
        codec.u8(&mut self.change_indicator)?;
        codec.u16(&mut self.attachment_id)?;
        codec.u64(&mut self.type_variant)?;
        codec.u64(&mut self.value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedDatumRecord {
    pub id: u32,
    pub value: i32,
}

impl Wire for FixedDatumRecord {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u32(&mut self.id)?;
        codec.i32(&mut self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableDatumRecord {
    pub id: u32,
    pub value: Vec<u8>,
}

impl Wire for VariableDatumRecord {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError> {
        codec.u32(&mut self.id)?;
        codec.bit_blob(&mut self.value)
    }
}
