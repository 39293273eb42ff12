use crate::config::ComposerConfig;
use crate::error::{Result, StreetViewError};
use crate::transport::Transport;
use crate::types::{Coordinate, MetadataStatus, PanoramaMetadata};
use chrono::NaiveDate;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Build the metadata lookup URL for a coordinate.
fn make_metadata_url(config: &ComposerConfig, coordinate: Coordinate) -> Result<Url> {
    let api_key = config.api_key.as_deref().ok_or(StreetViewError::MissingApiKey)?;
    let base = format!("{}/metadata", config.metadata_endpoint);
    Url::parse_with_params(
        &base,
        &[
            ("location", coordinate.to_string()),
            ("radius", config.radius.to_string()),
            ("source", config.source.clone()),
            ("key", api_key.to_string()),
        ],
    )
    .map_err(|e| StreetViewError::InvalidUrl(format!("{base}: {e}")))
}

/// Parse a `yyyy-MM` capture date.
fn parse_capture_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{date}-01"), "%Y-%m-%d").ok()
}

/// Decode a metadata response body.
///
/// Anything that is not a JSON object with a string `status` yields
/// `MetadataStatus::DataError`. Optional fields that are malformed are dropped.
pub(crate) fn parse_metadata(body: &[u8]) -> PanoramaMetadata {
    let Ok(data) = serde_json::from_slice::<Value>(body) else {
        warn!("Street View metadata is not valid JSON");
        return PanoramaMetadata::data_error();
    };

    let Some(status) = data.get("status").and_then(Value::as_str) else {
        warn!("Street View metadata has no status");
        return PanoramaMetadata::data_error();
    };

    let location = data.get("location").and_then(|loc| {
        let lat = loc.get("lat")?.as_f64()?;
        let lng = loc.get("lng")?.as_f64()?;
        Some(Coordinate { lat, lng })
    });

    PanoramaMetadata {
        status: MetadataStatus::from_wire(status),
        pano_id: data.get("pano_id").and_then(Value::as_str).map(str::to_string),
        date: data.get("date").and_then(Value::as_str).and_then(parse_capture_date),
        location,
    }
}

/// Look up the panorama closest to a coordinate.
///
/// Makes exactly one request. A transport failure is returned as an error;
/// an undecodable body comes back as metadata with status `DataError`.
#[instrument(skip(transport, config))]
pub async fn resolve(
    transport: &dyn Transport,
    config: &ComposerConfig,
    coordinate: Coordinate,
) -> Result<PanoramaMetadata> {
    let url = make_metadata_url(config, coordinate)?;
    let body = transport.fetch(&url).await?;
    let metadata = parse_metadata(&body);

    debug!(
        status = %metadata.status,
        pano_id = metadata.pano_id.as_deref().unwrap_or("-"),
        "Resolved Street View metadata"
    );

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{query, FakeTransport};

    fn config() -> ComposerConfig {
        ComposerConfig::new().api_key("test_key")
    }

    #[test]
    fn test_metadata_url_construction() {
        let url = make_metadata_url(&config(), Coordinate::new(41.8982208, 12.4764804)).unwrap();
        assert_eq!(url.path(), "/maps/api/streetview/metadata");
        assert_eq!(query(&url, "location").unwrap(), "41.8982208,12.4764804");
        assert_eq!(query(&url, "radius").unwrap(), "2000");
        assert_eq!(query(&url, "source").unwrap(), "outdoor");
        assert_eq!(query(&url, "key").unwrap(), "test_key");
    }

    #[test]
    fn test_metadata_url_requires_key() {
        let result = make_metadata_url(&ComposerConfig::new(), Coordinate::new(0.0, 0.0));
        assert!(matches!(result, Err(StreetViewError::MissingApiKey)));
    }

    #[test]
    fn test_parse_full_response() {
        let body = br#"{
            "copyright": "Google",
            "date": "2019-07",
            "location": {"lat": 41.89, "lng": 12.47},
            "pano_id": "CAoSLEFGMVFpcE",
            "status": "OK"
        }"#;
        let meta = parse_metadata(body);
        assert_eq!(meta.status, MetadataStatus::Ok);
        assert_eq!(meta.pano_id.as_deref(), Some("CAoSLEFGMVFpcE"));
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2019, 7, 1));
        assert_eq!(meta.location, Some(Coordinate::new(41.89, 12.47)));
    }

    #[test]
    fn test_parse_zero_results() {
        let meta = parse_metadata(br#"{"status":"ZERO_RESULTS"}"#);
        assert_eq!(meta.status, MetadataStatus::ZeroResults);
        assert!(meta.pano_id.is_none());
        assert!(meta.location.is_none());
    }

    #[test]
    fn test_parse_garbage_is_data_error() {
        assert_eq!(parse_metadata(b"<html>").status, MetadataStatus::DataError);
        assert_eq!(parse_metadata(br#"{"pano_id":"x"}"#).status, MetadataStatus::DataError);
        assert_eq!(parse_metadata(br#"{"status":7}"#).status, MetadataStatus::DataError);
    }

    #[test]
    fn test_parse_drops_malformed_optionals() {
        let meta = parse_metadata(br#"{"status":"OK","pano_id":"p","date":"July","location":{"lat":1.0}}"#);
        assert_eq!(meta.status, MetadataStatus::Ok);
        assert!(meta.date.is_none());
        assert!(meta.location.is_none());
    }

    #[tokio::test]
    async fn test_resolve_makes_one_request() {
        let transport = FakeTransport::new(|_| Some(br#"{"status":"OK","pano_id":"abc"}"#.to_vec()));
        let meta = resolve(&transport, &config(), Coordinate::new(1.0, 2.0)).await.unwrap();

        assert_eq!(meta.panorama_id().unwrap(), "abc");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_propagates_transport_failure() {
        let transport = FakeTransport::new(|_| None);
        let result = resolve(&transport, &config(), Coordinate::new(1.0, 2.0)).await;

        assert!(matches!(result, Err(StreetViewError::InvalidResponse(_))));
        assert_eq!(transport.requests().len(), 1);
    }
}
