use crate::error::ConsensusError;
use url::Url;

/// Canonical `host[:port]` form of a peer address.
///
/// `http://192.168.0.5:5000/` and `192.168.0.5:5000` both become
/// `192.168.0.5:5000`. Addresses without a scheme are read as http.
pub fn canonical_peer_address(address: &str) -> Result<String, ConsensusError> {
    let trimmed = address.trim();
    let invalid = |reason: String| ConsensusError::InvalidPeerAddress {
        address: address.to_string(),
        reason,
    };

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("no host".to_string()))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_reduced_to_host_and_port() {
        assert_eq!(
            canonical_peer_address("http://192.168.0.5:5000").unwrap(),
            "192.168.0.5:5000"
        );
        assert_eq!(
            canonical_peer_address("http://node.example:5001/chain?x=1").unwrap(),
            "node.example:5001"
        );
    }

    #[test]
    fn test_bare_address_accepted() {
        assert_eq!(canonical_peer_address(" 10.0.0.1:5000 ").unwrap(), "10.0.0.1:5000");
        assert_eq!(canonical_peer_address("localhost").unwrap(), "localhost");
    }

    #[test]
    fn test_host_case_is_normalised() {
        assert_eq!(canonical_peer_address("http://NODE.Example:80").unwrap(), "node.example");
    }

    #[test]
    fn test_hostless_address_rejected() {
        assert!(matches!(
            canonical_peer_address(""),
            Err(ConsensusError::InvalidPeerAddress { .. })
        ));
        assert!(canonical_peer_address("http://:5000").is_err());
    }
}
