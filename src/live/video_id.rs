use url::Url;

use crate::error::DiscoveryError;

/// Relative links in notification bodies resolve against this origin
const YOUTUBE_BASE: &str = "https://www.youtube.com/";

/// Recover the video identifier from a redirect-wrapped watch link.
///
/// The anchor target is a tracking URL whose `u` parameter holds the real
/// destination; the identifier is that destination's `v` parameter. An
/// empty string is returned when the destination carries no `v`.
pub fn extract_video_id(raw_url: &str) -> Result<String, DiscoveryError> {
    let wrapper = parse(raw_url)?;

    let destination = query_value(&wrapper, "u")
        .ok_or_else(|| DiscoveryError::Url(format!("no 'u' parameter in {}", raw_url)))?;

    let target = parse(&destination)?;

    Ok(query_value(&target, "v").unwrap_or_default())
}

fn parse(raw: &str) -> Result<Url, DiscoveryError> {
    let base = Url::parse(YOUTUBE_BASE).map_err(|e| DiscoveryError::Url(e.to_string()))?;
    Url::options()
        .base_url(Some(&base))
        .parse(raw)
        .map_err(|e| DiscoveryError::Url(format!("{}: {}", raw, e)))
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_redirect_wrapper() {
        let link = "https://host/redirect?u=https%3A%2F%2Fhost2%2Fwatch%3Fv%3DABC123";
        assert_eq!(extract_video_id(link).unwrap(), "ABC123");
    }

    #[test]
    fn test_extract_with_tracking_parameters() {
        let link = "https://www.youtube.com/attribution_link?a=xyz&u=%2Fwatch%3Fv%3DLIVE42%26feature%3Dem-lss&e=1";
        assert_eq!(extract_video_id(link).unwrap(), "LIVE42");
    }

    #[test]
    fn test_missing_wrapper_parameter() {
        let result = extract_video_id("https://www.youtube.com/watch?v=direct");
        assert!(matches!(result, Err(DiscoveryError::Url(_))));
    }

    #[test]
    fn test_malformed_inner_url() {
        let result = extract_video_id("https://host/redirect?u=http%3A%2F%2F%5B%3A%3A1");
        assert!(matches!(result, Err(DiscoveryError::Url(_))));
    }

    #[test]
    fn test_malformed_outer_url() {
        assert!(matches!(extract_video_id("http://[::1"), Err(DiscoveryError::Url(_))));
    }

    #[test]
    fn test_inner_url_without_video_parameter() {
        let link = "https://host/redirect?u=https%3A%2F%2Fhost2%2Fchannel%2Fabc";
        assert_eq!(extract_video_id(link).unwrap(), "");
    }
}
