use serde::{Deserialize, Serialize};

/// Account role. Owners may create and manage listings; admins may manage
/// any listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Owner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "owner" => Some(Role::Owner),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Gender restriction on a listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Closed set of facility tags a listing can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Facility {
    #[serde(rename = "WiFi")]
    WiFi,
    Parking,
    Laundry,
    Kitchen,
    #[serde(rename = "Air Conditioning")]
    AirConditioning,
    #[serde(rename = "Hot Water")]
    HotWater,
    #[serde(rename = "Study Room")]
    StudyRoom,
    Gym,
    Security,
    #[serde(rename = "CCTV")]
    Cctv,
    #[serde(rename = "Backup Power")]
    BackupPower,
    #[serde(rename = "Water Supply")]
    WaterSupply,
}

impl Facility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facility::WiFi => "WiFi",
            Facility::Parking => "Parking",
            Facility::Laundry => "Laundry",
            Facility::Kitchen => "Kitchen",
            Facility::AirConditioning => "Air Conditioning",
            Facility::HotWater => "Hot Water",
            Facility::StudyRoom => "Study Room",
            Facility::Gym => "Gym",
            Facility::Security => "Security",
            Facility::Cctv => "CCTV",
            Facility::BackupPower => "Backup Power",
            Facility::WaterSupply => "Water Supply",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "WiFi" => Some(Facility::WiFi),
            "Parking" => Some(Facility::Parking),
            "Laundry" => Some(Facility::Laundry),
            "Kitchen" => Some(Facility::Kitchen),
            "Air Conditioning" => Some(Facility::AirConditioning),
            "Hot Water" => Some(Facility::HotWater),
            "Study Room" => Some(Facility::StudyRoom),
            "Gym" => Some(Facility::Gym),
            "Security" => Some(Facility::Security),
            "CCTV" => Some(Facility::Cctv),
            "Backup Power" => Some(Facility::BackupPower),
            "Water Supply" => Some(Facility::WaterSupply),
            _ => None,
        }
    }
}

/// Kind of chat message payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageType::Text),
            "image" => Some(MessageType::Image),
            "file" => Some(MessageType::File),
            _ => None,
        }
    }
}

/// Which side of a chat a participant sits on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Owner,
    Tenant,
}
