//! 遥测 JSON 负载解码
//!
//! 字段兼容多种命名：`lat`/`latitude`，`lng`/`lon`/`longitude`，
//! `sensorDistanceCm`/`height`/`distance`，数值也可以是数字字符串。
//! 只带身份而没有任何可合并字段的负载会被拒绝。

use serde::{Deserialize, Deserializer};

use crate::domain::model::DeviceReading;
use crate::domain::value_object::{Category, DeviceIdentity, GeoPoint};
use crate::error::DecodeError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntegerOrString {
    Integer(i64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntegerOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntegerOrString::Integer(n)) => Ok(Some(n)),
        Some(IntegerOrString::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// 线上负载格式
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TelemetryPayload {
    operator_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    operator_id: Option<i64>,
    #[serde(default, alias = "latitude", deserialize_with = "lenient_f64")]
    lat: Option<f64>,
    #[serde(default, alias = "lon", alias = "longitude", deserialize_with = "lenient_f64")]
    lng: Option<f64>,
    #[serde(default, alias = "height", alias = "distance", deserialize_with = "lenient_f64")]
    sensor_distance_cm: Option<f64>,
    #[serde(default, alias = "category")]
    category_tag: Option<String>,
    #[serde(default, alias = "can", deserialize_with = "lenient_f64")]
    cans: Option<f64>,
    #[serde(default, alias = "plastics", deserialize_with = "lenient_f64")]
    plastic: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    other: Option<f64>,
}

/// 遥测解码器
#[derive(Debug, Clone)]
pub struct TelemetryDecoder {
    /// 未带分类标签的测距归入的分类
    default_category: Category,
}

impl TelemetryDecoder {
    pub fn new(default_category: Category) -> Self {
        Self { default_category }
    }

    pub fn decode(&self, payload: &[u8]) -> Result<DeviceReading, DecodeError> {
        let raw: TelemetryPayload =
            serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let operator_name = raw
            .operator_name
            .ok_or(DecodeError::MissingField("operatorName"))?;
        let operator_id = raw.operator_id.ok_or(DecodeError::MissingField("operatorId"))?;
        let identity =
            DeviceIdentity::new(operator_name, operator_id).map_err(|reason| {
                DecodeError::InvalidValue {
                    field: "operatorName",
                    reason,
                }
            })?;

        let mut reading = DeviceReading::new(identity);

        reading.latitude = raw
            .lat
            .map(GeoPoint::check_latitude)
            .transpose()
            .map_err(invalid("lat"))?;
        reading.longitude = raw
            .lng
            .map(GeoPoint::check_longitude)
            .transpose()
            .map_err(invalid("lng"))?;

        let tagged = raw
            .category_tag
            .as_deref()
            .map(|tag| {
                tag.parse::<Category>()
                    .map_err(|reason| DecodeError::InvalidValue {
                        field: "categoryTag",
                        reason,
                    })
            })
            .transpose()?;

        if let Some(distance) = raw.sensor_distance_cm {
            check_finite("sensorDistanceCm", distance)?;
            reading = reading.with_distance(tagged.unwrap_or(self.default_category), distance);
        }

        for (category, field, value) in [
            (Category::Can, "cans", raw.cans),
            (Category::Plastic, "plastic", raw.plastic),
            (Category::Other, "other", raw.other),
        ] {
            if let Some(percent) = value {
                check_finite(field, percent)?;
                reading = reading.with_fill(category, percent);
            }
        }

        if !reading.has_payload() {
            return Err(DecodeError::MissingField("lat/lng or fill"));
        }
        Ok(reading)
    }
}

impl Default for TelemetryDecoder {
    fn default() -> Self {
        Self::new(Category::Other)
    }
}

fn invalid(field: &'static str) -> impl FnOnce(String) -> DecodeError {
    move |reason| DecodeError::InvalidValue { field, reason }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), DecodeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DecodeError::InvalidValue {
            field,
            reason: format!("{} is not a finite number", value),
        })
    }
}
