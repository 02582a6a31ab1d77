use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// ROS message type advertised for the image topic.
pub const COMPRESSED_IMAGE_TYPE: &str = "sensor_msgs/CompressedImage";

/// ROS time stamp (seconds + nanoseconds since the Unix epoch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStamp {
    pub secs: u32,
    pub nsecs: u32,
}

impl TimeStamp {
    /// Current wall-clock time as a ROS stamp.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: since_epoch.as_secs() as u32,
            nsecs: since_epoch.subsec_nanos(),
        }
    }

    /// Stamp from a microsecond count since the Unix epoch (capture
    /// timestamps).
    pub fn from_micros(micros: u64) -> Self {
        Self {
            secs: (micros / 1_000_000) as u32,
            nsecs: ((micros % 1_000_000) * 1_000) as u32,
        }
    }
}

/// std_msgs/Header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub seq: u32,
    pub stamp: TimeStamp,
    pub frame_id: String,
}

/// sensor_msgs/CompressedImage. The `data` field carries the JPEG bytes
/// and serialises as a base64 string, the rosbridge JSON convention for
/// byte arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressedImage {
    pub header: Header,
    pub format: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// rosbridge protocol operations, tagged with the `op` field.
///
/// Serialise-only: the publisher never parses messages off the wire.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum BridgeOp<'a> {
    Advertise {
        topic: &'a str,
        #[serde(rename = "type")]
        msg_type: &'a str,
    },
    Publish {
        topic: &'a str,
        msg: &'a CompressedImage,
    },
    Unadvertise {
        topic: &'a str,
    },
}

/// serde adaptor for base64-encoded byte fields.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}
