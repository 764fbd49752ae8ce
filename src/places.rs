//! City and hotel lookup against OpenStreetMap services.
//!
//! Both searches degrade to an empty list on failure. An empty result is
//! therefore ambiguous between "no matches" and "lookup failed"; the failure
//! case is always logged.

use crate::consts::{HOTEL_RESULT_LIMIT, MIN_QUERY_LEN, NOMINATIM_USER_AGENT};
use crate::error::AppError;
use crate::nominatim_types::NominatimPlace;
use crate::overpass_types::{BoundingBox, OverpassElement, OverpassResponse};
use crate::types::{City, Hotel, HotelLocation};

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, error};

pub const CITY_RESULT_LIMIT: usize = 5;

#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// Free-text geocoding; best match first.
    async fn lookup_city(&self, query: &str, limit: usize)
        -> Result<Vec<NominatimPlace>, AppError>;

    /// Lodging establishments whose name matches `query` inside `bbox`.
    async fn lookup_places(
        &self,
        bbox: BoundingBox,
        query: &str,
    ) -> Result<Vec<OverpassElement>, AppError>;
}

pub struct OsmPlaces {
    http_client: reqwest::Client,
    nominatim_url: String,
    overpass_url: String,
}

impl OsmPlaces {
    pub fn new(http_client: reqwest::Client, nominatim_url: &str, overpass_url: &str) -> Self {
        Self {
            http_client,
            nominatim_url: nominatim_url.trim_end_matches('/').to_string(),
            overpass_url: overpass_url.to_string(),
        }
    }
}

/// Quote `query` for use inside an Overpass QL regex string literal.
pub fn overpass_name_pattern(query: &str) -> String {
    regex::escape(query)
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

pub fn overpass_hotel_query(bbox: BoundingBox, query: &str) -> String {
    let pattern = overpass_name_pattern(query);
    let mut clauses = String::new();
    for kind in ["hotel", "guest_house"] {
        for element in ["node", "way"] {
            clauses.push_str(&format!(
                "{element}[\"tourism\"=\"{kind}\"][\"name\"~\"{pattern}\", i]({bbox});\n"
            ));
        }
    }
    format!("[out:json][timeout:25];\n(\n{clauses});\nout center;\n>;\nout skel qt;")
}

#[async_trait]
impl PlaceLookup for OsmPlaces {
    async fn lookup_city(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NominatimPlace>, AppError> {
        let url = format!("{}/search", self.nominatim_url);
        let best_only = limit == 1;
        let limit = limit.to_string();
        let mut params = vec![
            ("format", "json"),
            ("q", query),
            ("addressdetails", "1"),
            ("limit", limit.as_str()),
        ];
        if !best_only {
            params.extend([("featuretype", "city"), ("dedupe", "1")]);
        }
        let resp = self
            .http_client
            .get(url)
            .header(reqwest::header::USER_AGENT, NOMINATIM_USER_AGENT)
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(error=%e, "failed to send request to Nominatim");
                AppError::Unknown(e.to_string())
            })?;
        resp.json::<Vec<NominatimPlace>>().await.map_err(|e| {
            error!(error=%e, "failed to deserialize Nominatim response");
            AppError::Unknown(e.to_string())
        })
    }

    async fn lookup_places(
        &self,
        bbox: BoundingBox,
        query: &str,
    ) -> Result<Vec<OverpassElement>, AppError> {
        let overpass_query = overpass_hotel_query(bbox, query);
        debug!(query=%overpass_query, "overpass query");
        let resp = self
            .http_client
            .post(&self.overpass_url)
            .body(overpass_query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(error=%e, "failed to send request to Overpass");
                AppError::Unknown(e.to_string())
            })?;
        let resp = resp.json::<OverpassResponse>().await.map_err(|e| {
            error!(error=%e, "failed to deserialize Overpass response");
            AppError::Unknown(e.to_string())
        })?;
        Ok(resp.elements)
    }
}

fn long_enough(query: &str) -> bool {
    query.trim().chars().count() >= MIN_QUERY_LEN
}

pub async fn search_cities(lookup: &dyn PlaceLookup, query: &str) -> Vec<City> {
    if !long_enough(query) {
        return vec![];
    }
    let places = match lookup.lookup_city(query.trim(), CITY_RESULT_LIMIT).await {
        Ok(places) => places,
        Err(e) => {
            error!(error=%e, query=%query, "city search failed");
            return vec![];
        }
    };

    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(NominatimPlace::is_municipality)
        .filter(|p| seen.insert(p.place_id))
        .take(CITY_RESULT_LIMIT)
        .map(|p| City {
            name: p.short_name(),
            country: p.country(),
            region: p.region(),
            id: p.place_id.to_string(),
            boundingbox: p.boundingbox,
            lat: p.lat,
            lon: p.lon,
        })
        .collect()
}

fn parse_tag<T: std::str::FromStr>(element: &OverpassElement, key: &str) -> Option<T> {
    element.tag(key).and_then(|v| v.trim().parse().ok())
}

fn hotel_from_element(element: &OverpassElement, city: &str) -> Option<Hotel> {
    let name = element.tag("name")?.to_string();
    let address = match element.tag("addr:street") {
        Some(street) => format!(
            "{} {}, {}",
            street,
            element.tag("addr:housenumber").unwrap_or_default(),
            city
        ),
        None => city.to_string(),
    };
    let (lat, lon) = element.coordinates();
    Some(Hotel {
        name,
        address,
        phone: element
            .tag("phone")
            .or_else(|| element.tag("contact:phone"))
            .map(str::to_string),
        website: element
            .tag("website")
            .or_else(|| element.tag("contact:website"))
            .map(str::to_string),
        stars: parse_tag(element, "stars"),
        kind: element.tag("tourism").unwrap_or("hotel").to_string(),
        rating: parse_tag(element, "rating"),
        rooms: parse_tag(element, "rooms"),
        id: element.id.to_string(),
        location: HotelLocation { lat, lon },
    })
}

pub async fn search_hotels(lookup: &dyn PlaceLookup, city: &str, query: &str) -> Vec<Hotel> {
    let city = city.trim();
    if city.is_empty() || !long_enough(query) {
        return vec![];
    }
    let query = query.trim();

    let best = match lookup.lookup_city(city, 1).await {
        Ok(places) => places.into_iter().next(),
        Err(e) => {
            error!(error=%e, city=%city, "city lookup for hotel search failed");
            return vec![];
        }
    };
    let Some(best) = best else {
        debug!(city=%city, "no city candidate");
        return vec![];
    };
    let Some(bbox) = BoundingBox::from_nominatim(&best.boundingbox) else {
        error!(city=%city, bbox=?best.boundingbox, "unparseable bounding box");
        return vec![];
    };

    let elements = match lookup.lookup_places(bbox, query).await {
        Ok(elements) => elements,
        Err(e) => {
            error!(error=%e, city=%city, query=%query, "hotel search failed");
            return vec![];
        }
    };

    let needle = query.to_lowercase();
    let city_lower = city.to_lowercase();
    let mut seen = HashSet::new();
    elements
        .iter()
        .filter_map(|e| hotel_from_element(e, city))
        .filter(|h| {
            h.name.to_lowercase().contains(&needle)
                && h.address.to_lowercase().contains(&city_lower)
        })
        .filter(|h| seen.insert(h.id.clone()))
        .take(HOTEL_RESULT_LIMIT)
        .collect()
}
