use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub country: Option<String>,
}

/// One entry of a Nominatim `/search?format=json` response.
#[derive(Deserialize, Debug, Clone)]
pub struct NominatimPlace {
    pub place_id: u64,
    pub display_name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub boundingbox: [String; 4],
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub address: Option<NominatimAddress>,
}

impl NominatimPlace {
    pub fn is_municipality(&self) -> bool {
        matches!(self.kind.as_str(), "city" | "town" | "administrative")
    }

    pub fn short_name(&self) -> String {
        let address = self.address.as_ref();
        address
            .and_then(|a| a.city.clone().or_else(|| a.town.clone()).or_else(|| a.village.clone()))
            .unwrap_or_else(|| {
                self.display_name
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            })
    }

    pub fn region(&self) -> String {
        self.address
            .as_ref()
            .and_then(|a| a.state.clone().or_else(|| a.county.clone()))
            .unwrap_or_default()
    }

    pub fn country(&self) -> String {
        self.address
            .as_ref()
            .and_then(|a| a.country.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_entry() {
        let json = r#"{
            "place_id": 88066702,
            "licence": "Data © OpenStreetMap contributors",
            "osm_type": "relation",
            "lat": "48.8588897",
            "lon": "2.3200410",
            "class": "boundary",
            "type": "administrative",
            "display_name": "Paris, Île-de-France, France métropolitaine, France",
            "boundingbox": ["48.8155755", "48.9021560", "2.2241220", "2.4697602"],
            "address": {"city": "Paris", "state": "Île-de-France", "country": "France"}
        }"#;
        let place: NominatimPlace = serde_json::from_str(json).unwrap();
        assert!(place.is_municipality());
        assert_eq!(place.short_name(), "Paris");
        assert_eq!(place.region(), "Île-de-France");
        assert_eq!(place.country(), "France");
        assert_eq!(place.boundingbox[2], "2.2241220");
    }

    #[test]
    fn falls_back_to_display_name() {
        let json = r#"{
            "place_id": 1,
            "lat": "0", "lon": "0",
            "type": "town",
            "display_name": "Hamlet, Somewhere",
            "boundingbox": ["0", "1", "0", "1"]
        }"#;
        let place: NominatimPlace = serde_json::from_str(json).unwrap();
        assert_eq!(place.short_name(), "Hamlet");
        assert_eq!(place.region(), "");
    }
}
