//! 地理坐标值对象

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// WGS84 坐标点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        Ok(Self {
            latitude: Self::check_latitude(latitude)?,
            longitude: Self::check_longitude(longitude)?,
        })
    }

    /// 校验单独出现的纬度（-90..=90）
    pub fn check_latitude(latitude: f64) -> Result<f64, String> {
        if latitude.is_finite() && (-90.0..=90.0).contains(&latitude) {
            Ok(latitude)
        } else {
            Err(format!("latitude out of range: {}", latitude))
        }
    }

    /// 校验单独出现的经度（-180..=180）
    pub fn check_longitude(longitude: f64) -> Result<f64, String> {
        if longitude.is_finite() && (-180.0..=180.0).contains(&longitude) {
            Ok(longitude)
        } else {
            Err(format!("longitude out of range: {}", longitude))
        }
    }

    /// 大圆距离（米）
    pub fn haversine_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// 经纬度平面上的欧氏距离（度）
    pub fn euclidean_deg(&self, other: &GeoPoint) -> f64 {
        let d_lat = self.latitude - other.latitude;
        let d_lng = self.longitude - other.longitude;
        (d_lat * d_lat + d_lng * d_lng).sqrt()
    }
}

impl fmt::Display for GeoPoint {
    // 路线服务使用 lng,lat 顺序
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

/// 精确搜索使用的距离度量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Haversine,
    Euclidean,
}

impl DistanceMetric {
    pub fn distance(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        match self {
            DistanceMetric::Haversine => a.haversine_m(b),
            DistanceMetric::Euclidean => a.euclidean_deg(b),
        }
    }

    pub fn unit(&self) -> DistanceUnit {
        match self {
            DistanceMetric::Haversine => DistanceUnit::Meters,
            DistanceMetric::Euclidean => DistanceUnit::Degrees,
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haversine" | "geo" => Ok(DistanceMetric::Haversine),
            "euclidean" | "planar" => Ok(DistanceMetric::Euclidean),
            other => Err(format!("unknown distance metric: {}", other)),
        }
    }
}

/// 距离单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Meters,
    Degrees,
}
