// src/services/places.rs

//! Place text search and enrichment.
//!
//! One POST against the text-search endpoint, then one photo fetch per
//! returned place. A failed photo fetch keeps the place without a photo;
//! a failed search yields an empty list so the caller can fall back.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Config, GeoBounds, GeoPoint, Place, Review};

const SEARCH_TIMEOUT_SECS: u64 = 15;
const PHOTO_TIMEOUT_SECS: u64 = 10;
const PHOTO_MAX_WIDTH_PX: &str = "400";
const MAX_REVIEWS: usize = 3;

/// Response fields requested from the search endpoint.
const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.rating,\
     places.userRatingCount,places.reviews,places.photos,places.googleMapsLinks";

/// Searches for places inside a bounding box.
pub struct PlacesClient {
    config: Arc<Config>,
    client: Client,
    api_key: String,
}

impl PlacesClient {
    /// Create a new client sharing the given HTTP client.
    pub fn new(config: Arc<Config>, client: Client, api_key: String) -> Self {
        Self {
            config,
            client,
            api_key,
        }
    }

    /// Search for places matching `query` inside `bounds`.
    ///
    /// Page size, place type and the optional rating/price filters come from
    /// the text-search configuration. A hard failure yields an empty list,
    /// never an error.
    pub async fn search_text(&self, query: &str, bounds: &GeoBounds) -> Vec<Place> {
        match self.fetch_places(query, bounds).await {
            Ok(places) => places,
            Err(error) => {
                log::error!("Failed to search places for '{query}': {error}");
                Vec::new()
            }
        }
    }

    async fn fetch_places(&self, query: &str, bounds: &GeoBounds) -> Result<Vec<Place>> {
        let search = &self.config.api.text_search;
        let request = SearchRequest {
            text_query: query,
            page_size: search.page_size,
            location_restriction: LocationRestriction {
                rectangle: Rectangle {
                    low: bounds.low,
                    high: bounds.high,
                },
            },
            included_type: &search.place_type,
            min_rating: search.min_rating,
            price_levels: if search.price_levels.is_empty() {
                None
            } else {
                Some(&search.price_levels)
            },
        };

        let response: SearchResponse = self
            .client
            .post(&self.config.endpoints.places_search)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut places = Vec::new();
        for dto in response.places {
            let (mut place, photo_name) = base_place(dto);
            if let Some(photo_name) = photo_name {
                place.photo_base64 = self.fetch_photo(&photo_name, &place.name).await;
            }
            places.push(place);
        }

        // The service can return more than requested.
        places.truncate(search.page_size);
        Ok(places)
    }

    /// Fetch the photo media and Base64-encode it. Failures keep the place
    /// photoless and log a warning.
    async fn fetch_photo(&self, photo_name: &str, place_name: &str) -> Option<String> {
        match self.fetch_photo_bytes(photo_name).await {
            Ok(bytes) => Some(STANDARD.encode(bytes)),
            Err(error) => {
                log::warn!("Failed to download photo for {place_name} ({photo_name}): {error}");
                None
            }
        }
    }

    async fn fetch_photo_bytes(&self, photo_name: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/{}/media",
            self.config.endpoints.places_media_base, photo_name
        );
        let bytes = self
            .client
            .get(&url)
            .query(&[("maxWidthPx", PHOTO_MAX_WIDTH_PX), ("key", self.api_key.as_str())])
            .timeout(Duration::from_secs(PHOTO_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Convert a response place into our record, returning the first photo name
/// separately so the caller can fetch it.
fn base_place(dto: PlaceDto) -> (Place, Option<String>) {
    let name = dto
        .display_name
        .and_then(|d| d.text)
        .unwrap_or_else(|| "N/A".to_string());
    let address = dto.formatted_address.unwrap_or_else(|| "N/A".to_string());
    let google_maps_link = format!(
        "https://www.google.com/maps/search/?api=1&query={}&query_place_id={}",
        address,
        dto.id.as_deref().unwrap_or_default()
    );

    let reviews = dto
        .reviews
        .into_iter()
        .take(MAX_REVIEWS)
        .filter_map(|review| {
            let text = review
                .text
                .and_then(|t| t.text)
                .filter(|text| !text.is_empty())?;
            Some(Review {
                reviewer_name: review
                    .author_attribution
                    .and_then(|a| a.display_name)
                    .unwrap_or_else(|| "Anonymous".to_string()),
                text,
                rating: review.rating,
            })
        })
        .collect();

    let photo_name = dto.photos.first().and_then(|p| p.name.clone());

    let place = Place {
        id: dto.id,
        name,
        address,
        rating: dto.rating,
        rating_count: dto.user_rating_count,
        price_level: dto.price_level,
        photo_base64: None,
        google_maps_link,
        reviews,
    };
    (place, photo_name)
}

// --- Wire types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    text_query: &'a str,
    page_size: usize,
    location_restriction: LocationRestriction,
    #[serde(skip_serializing_if = "str::is_empty")]
    included_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_levels: Option<&'a [String]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationRestriction {
    rectangle: Rectangle,
}

#[derive(Serialize)]
struct Rectangle {
    low: GeoPoint,
    high: GeoPoint,
}

#[derive(Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    places: Vec<PlaceDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceDto {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    display_name: Option<LocalizedText>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_rating_count: Option<u32>,
    #[serde(default)]
    price_level: Option<String>,
    #[serde(default)]
    photos: Vec<PhotoDto>,
    #[serde(default)]
    reviews: Vec<ReviewDto>,
}

#[derive(Deserialize)]
struct LocalizedText {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct PhotoDto {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewDto {
    #[serde(default)]
    text: Option<LocalizedText>,
    #[serde(default)]
    author_attribution: Option<AuthorAttributionDto>,
    #[serde(default)]
    rating: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorAttributionDto {
    #[serde(default)]
    display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config(endpoints: &str) -> Arc<Config> {
        let toml = format!(
            r#"
            [email]
            sender = "digest@example.com"
            recipients = ["alice@example.com"]

            [endpoints]
            {endpoints}
            "#
        );
        Arc::new(toml::from_str(&toml).unwrap())
    }

    /// Serve canned responses in order, recording each raw request.
    async fn serve_json(
        bodies: Vec<&'static str>,
    ) -> (String, Arc<tokio::sync::Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let recorder = seen.clone();
        tokio::spawn(async move {
            for body in bodies {
                let (mut socket, _) = listener.accept().await.unwrap();
                recorder.lock().await.push(read_request(&mut socket).await);
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}"), seen)
    }

    /// Read one HTTP request, headers plus any content-length body.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut request = Vec::new();
        let mut buffer = [0u8; 65536];
        loop {
            match socket.read(&mut buffer).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    request.extend_from_slice(&buffer[..n]);
                    if request_is_complete(&request) {
                        break;
                    }
                }
            }
        }
        String::from_utf8_lossy(&request).into_owned()
    }

    fn request_is_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..split]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        text.len() - split - 4 >= content_length
    }

    #[tokio::test]
    async fn search_sends_the_api_key_and_field_mask() {
        let (base, seen) = serve_json(vec!["{}"]).await;
        let config = test_config(&format!("places_search = \"{base}/search\""));
        let places = PlacesClient::new(config, Client::new(), "test-key".to_string());

        let found = places.search_text("laksa", &GeoBounds::singapore()).await;
        assert!(found.is_empty());

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        let headers = seen[0].to_lowercase();
        assert!(headers.contains("x-goog-api-key: test-key"));
        assert!(headers.contains("x-goog-fieldmask:"));

        let body_start = seen[0].find("\r\n\r\n").unwrap() + 4;
        let body: serde_json::Value = serde_json::from_str(&seen[0][body_start..]).unwrap();
        assert_eq!(body["textQuery"], "laksa");
        assert_eq!(body["pageSize"], 3);
        assert_eq!(body["includedType"], "restaurant");
        assert_eq!(
            body["locationRestriction"]["rectangle"]["high"]["longitude"],
            104.5716696
        );
    }

    #[tokio::test]
    async fn a_place_without_photos_needs_no_media_request() {
        let search =
            r#"{"places": [{"displayName": {"text": "Hill Street"}, "formattedAddress": "Block 2"}]}"#;
        let (base, seen) = serve_json(vec![search]).await;
        let config = test_config(&format!(
            "places_search = \"{base}/search\"\nplaces_media_base = \"{base}\""
        ));
        let places = PlacesClient::new(config, Client::new(), "key".to_string());

        let found = places
            .search_text("chicken rice", &GeoBounds::singapore())
            .await;
        assert_eq!(found.len(), 1);
        assert!(found[0].photo_base64.is_none());
        assert_eq!(seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn photos_are_fetched_and_encoded() {
        let search =
            r#"{"places": [{"displayName": {"text": "Tian Tian"}, "photos": [{"name": "places/p1/photos/a"}]}]}"#;
        let (base, seen) = serve_json(vec![search, "gif-bytes"]).await;
        let config = test_config(&format!(
            "places_search = \"{base}/search\"\nplaces_media_base = \"{base}\""
        ));
        let places = PlacesClient::new(config, Client::new(), "key".to_string());

        let found = places
            .search_text("chicken rice", &GeoBounds::singapore())
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].photo_base64.as_deref(),
            Some(STANDARD.encode("gif-bytes").as_str())
        );

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 2);
        assert!(seen[1].contains("/places/p1/photos/a/media?maxWidthPx=400&key=key"));
    }

    #[tokio::test]
    async fn failed_search_yields_an_empty_list() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = format!("http://{}/search", listener.local_addr().unwrap());
        drop(listener);

        let config = test_config(&format!("places_search = \"{dead}\""));
        let places = PlacesClient::new(config, Client::new(), "key".to_string());

        let found = places.search_text("laksa", &GeoBounds::singapore()).await;
        assert!(found.is_empty());
    }

    #[test]
    fn search_request_uses_wire_field_names_and_omits_unset_filters() {
        let price_levels: Vec<String> = Vec::new();
        let request = SearchRequest {
            text_query: "laksa",
            page_size: 3,
            location_restriction: LocationRestriction {
                rectangle: Rectangle {
                    low: GeoPoint {
                        latitude: 1.1,
                        longitude: 103.5,
                    },
                    high: GeoPoint {
                        latitude: 1.5,
                        longitude: 104.5,
                    },
                },
            },
            included_type: "restaurant",
            min_rating: None,
            price_levels: if price_levels.is_empty() {
                None
            } else {
                Some(&price_levels)
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["textQuery"], "laksa");
        assert_eq!(value["pageSize"], 3);
        assert_eq!(
            value["locationRestriction"]["rectangle"]["low"]["latitude"],
            1.1
        );
        assert_eq!(value["includedType"], "restaurant");
        assert!(value.get("minRating").is_none());
        assert!(value.get("priceLevels").is_none());
    }

    #[test]
    fn search_request_carries_set_filters() {
        let price_levels = vec!["PRICE_LEVEL_INEXPENSIVE".to_string()];
        let request = SearchRequest {
            text_query: "laksa",
            page_size: 3,
            location_restriction: LocationRestriction {
                rectangle: Rectangle {
                    low: GeoPoint {
                        latitude: 0.0,
                        longitude: 0.0,
                    },
                    high: GeoPoint {
                        latitude: 1.0,
                        longitude: 1.0,
                    },
                },
            },
            included_type: "restaurant",
            min_rating: Some(4.0),
            price_levels: Some(&price_levels),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["minRating"], 4.0);
        assert_eq!(value["priceLevels"][0], "PRICE_LEVEL_INEXPENSIVE");
    }

    #[test]
    fn empty_place_type_is_omitted_from_the_request() {
        let request = SearchRequest {
            text_query: "laksa",
            page_size: 3,
            location_restriction: LocationRestriction {
                rectangle: Rectangle {
                    low: GeoPoint {
                        latitude: 0.0,
                        longitude: 0.0,
                    },
                    high: GeoPoint {
                        latitude: 1.0,
                        longitude: 1.0,
                    },
                },
            },
            included_type: "",
            min_rating: None,
            price_levels: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("includedType").is_none());
    }

    #[test]
    fn place_conversion_fills_defaults_and_caps_reviews() {
        let body = r#"{
            "id": "place-1",
            "displayName": {"text": "Katong Laksa"},
            "formattedAddress": "51 East Coast Rd",
            "rating": 4.4,
            "userRatingCount": 1208,
            "photos": [{"name": "places/place-1/photos/abc"}],
            "reviews": [
                {"text": {"text": "Great broth"}, "authorAttribution": {"displayName": "Mei"}, "rating": 5},
                {"text": {"text": ""}, "authorAttribution": {"displayName": "Empty"}, "rating": 1},
                {"text": {"text": "Queue moves fast"}, "rating": 4},
                {"text": {"text": "Fourth review"}, "rating": 3}
            ]
        }"#;
        let dto: PlaceDto = serde_json::from_str(body).unwrap();
        let (place, photo_name) = base_place(dto);

        assert_eq!(place.name, "Katong Laksa");
        assert_eq!(place.rating_count, Some(1208));
        assert_eq!(photo_name.as_deref(), Some("places/place-1/photos/abc"));
        assert!(place.photo_base64.is_none());
        assert_eq!(
            place.google_maps_link,
            "https://www.google.com/maps/search/?api=1&query=51 East Coast Rd&query_place_id=place-1"
        );

        // Empty-text review dropped, fourth review beyond the cap dropped.
        assert_eq!(place.reviews.len(), 2);
        assert_eq!(place.reviews[0].reviewer_name, "Mei");
        assert_eq!(place.reviews[1].reviewer_name, "Anonymous");
    }

    #[test]
    fn place_without_fields_uses_placeholders() {
        let dto: PlaceDto = serde_json::from_str("{}").unwrap();
        let (place, photo_name) = base_place(dto);
        assert_eq!(place.name, "N/A");
        assert_eq!(place.address, "N/A");
        assert!(photo_name.is_none());
        assert!(place.reviews.is_empty());
    }

    #[test]
    fn empty_search_response_has_no_places() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.places.is_empty());
    }
}
