use std::{convert::TryFrom, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::skip_serializing_none;
use sqlx::{
    decode::Decode,
    encode::{Encode, IsNull},
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgHasArrayType, PgTypeInfo, PgValueRef},
    FromRow, Postgres, Type, TypeInfo,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }

    fn parse_normalized(value: &str) -> Result<Self, RoleParseError> {
        match value {
            "citizen" => Ok(Role::Citizen),
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            _ => Err(RoleParseError::new(value)),
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = RoleParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Role::parse_normalized(&normalized)
    }
}

impl Type<Postgres> for Role {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("user_role")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        matches!(ty.name(), "user_role" | "text" | "varchar" | "bpchar")
    }
}

impl PgHasArrayType for Role {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_user_role")
    }
}

impl<'q> Encode<'q, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        let value = self.as_str();
        <&str as Encode<Postgres>>::encode_by_ref(&value, buf)
    }

    fn size_hint(&self) -> usize {
        let value = self.as_str();
        <&str as Encode<Postgres>>::size_hint(&value)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as Decode<Postgres>>::decode(value)?;
        Role::try_from(raw).map_err(|err| Box::new(err) as BoxDynError)
    }
}

#[derive(Debug, Clone)]
pub struct RoleParseError {
    value: String,
}

impl RoleParseError {
    fn new(value: &str) -> Self {
        Self {
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported role value: {}", self.value)
    }
}

impl std::error::Error for RoleParseError {}

/// Authenticated actor performing an operation.
///
/// Produced by the identity layer (see `infrastructure::auth`) and passed
/// explicitly into every report operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "report_type", rename_all = "snake_case")]
pub enum ReportType {
    Water,
    Electricity,
    Waste,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Water => "water",
            ReportType::Electricity => "electricity",
            ReportType::Waste => "waste",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
pub enum ReportStatus {
    Submitted,
    Assigned,
    InProgress,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::Submitted,
        ReportStatus::Assigned,
        ReportStatus::InProgress,
        ReportStatus::Resolved,
        ReportStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Submitted => "submitted",
            ReportStatus::Assigned => "assigned",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Rejected => "rejected",
        }
    }

    /// Statuses in which a report carries an assignee.
    pub fn holds_assignee(&self) -> bool {
        matches!(
            self,
            ReportStatus::Assigned | ReportStatus::InProgress | ReportStatus::Resolved
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unsupported report status: {value}"))
    }
}

/// Geographic point, serialized as `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(with = "coordinates_format")]
    pub coordinates: Option<Coordinates>,
}

/// Coordinates travel as a two-element array, or an empty array when the
/// location lookup has not resolved them yet.
mod coordinates_format {
    use super::*;
    use serde::de::Error;

    pub fn serialize<S>(value: &Option<Coordinates>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(point) => [point.longitude, point.latitude].serialize(serializer),
            None => Vec::<f64>::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Coordinates>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<f64>>::deserialize(deserializer)?.unwrap_or_default();
        match raw.as_slice() {
            [] => Ok(None),
            [longitude, latitude] => Ok(Some(Coordinates {
                longitude: *longitude,
                latitude: *latitude,
            })),
            other => Err(D::Error::invalid_length(
                other.len(),
                &"an empty array or [longitude, latitude]",
            )),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub description: String,
    pub location: Location,
    pub status: ReportStatus,
    pub assignee_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// Citizen-supplied fields for a new report. Everything else is assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub owner_id: Uuid,
    pub report_type: ReportType,
    pub description: String,
    pub location: Location,
}

/// Field changes applied by `ReportStore::update`. `None` leaves a field
/// untouched; `assignee_id: Some(None)` clears the assignee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
    pub assignee_id: Option<Option<Uuid>>,
}

impl ReportPatch {
    pub fn apply(&self, report: &mut Report) {
        if let Some(status) = self.status {
            report.status = status;
        }
        if let Some(assignee_id) = self.assignee_id {
            report.assignee_id = assignee_id;
        }
    }
}
