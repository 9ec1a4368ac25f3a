pub mod coords;
pub mod dead_reckoning;
pub mod directory;
pub mod exercise;
pub mod pdu;
pub mod publisher;
mod subscription;

pub use coords::{
    GeocentricCoord, GeodeticCoord, LatLon, SceneEuler, SceneOrigin, UtmCoord,
    orientation_to_scene_euler, scene_euler_to_orientation,
};
pub use dead_reckoning::{ScenePose, extrapolate, predict_scene_pose};
pub use directory::{DEFAULT_HEARTBEAT_TIMEOUT, EntityDirectory, EntityEvent, RemoteEntity};
pub use exercise::{
    ConnectionStats, Exercise, ExerciseConfig, ExerciseConnection, MemoryNetwork,
    MemoryTransport, PublisherId, SendError, SubscribeError, Transport,
};
pub use pdu::{
    Appearance, CodecError, DEFAULT_PORT, DetonationPdu, EntityId, EntityStatePdu, EntityType,
    EventId, EventReportPdu, FirePdu, MarkingText, PROTOCOL_VERSION, ParseIdError, Pdu, PduBody,
    PduHeader, PduKind, PduRegistry, Vector3Double, Vector3Float,
};
pub use publisher::{EntityPublisher, PublisherConfig, SendReason};
pub use subscription::SubscriptionId;
