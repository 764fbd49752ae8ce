use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize, Debug)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// A node or way from an Overpass `[out:json]` result.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct OverpassElement {
    pub id: u64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl OverpassElement {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        match (self.lat, self.lon, self.center) {
            (Some(lat), Some(lon), _) => (Some(lat), Some(lon)),
            (_, _, Some(c)) => (Some(c.lat), Some(c.lon)),
            (lat, lon, None) => (lat, lon),
        }
    }
}

/// Inclusive `(south, west, north, east)` rectangle as used by Overpass QL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Build from Nominatim's `[south, north, west, east]` strings.
    pub fn from_nominatim(bb: &[String; 4]) -> Option<Self> {
        let parse = |s: &String| s.trim().parse::<f64>().ok();
        Some(Self {
            south: parse(&bb[0])?,
            north: parse(&bb[1])?,
            west: parse(&bb[2])?,
            east: parse(&bb[3])?,
        })
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}
