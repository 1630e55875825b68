//! Normalization of resolved DID documents.
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Name of the attribute holding legacy service endpoints.
pub const LEGACY_ENDPOINT_ATTRIBUTE: &str = "endpoint";
/// Endpoint name that maps to a DIDComm service.
const DIDCOMM_ENDPOINT: &str = "endpoint";

/// Payload of a legacy `endpoint` attribute, e.g.
/// `{"endpoint": {"endpoint": "https://agent.example", "profile": "https://agent.example/profile"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LegacyEndpoint {
    pub endpoint: BTreeMap<String, String>,
}

/// Point in ledger history at which a legacy attribute must be read.
///
/// At most one of the two is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerPoint {
    pub seq_no: Option<i32>,
    pub timestamp: Option<i64>,
}

/// Decides whether a resolution result needs services derived from a legacy `endpoint`
/// attribute, and at which ledger point.
///
/// Returns `None` for results without a document, and for DIDs whose NYM carries
/// `diddocContent`.
pub(crate) fn legacy_query(resolution: &Value) -> Option<LedgerPoint> {
    if resolution.get("didDocument").map_or(true, Value::is_null) {
        return None;
    }
    let result = resolution.pointer("/didDocumentMetadata/nodeResponse/result");
    let nym = result.and_then(|r| r.get("data")).and_then(|data| match data {
        Value::String(s) => serde_json::from_str::<Value>(s).ok(),
        other => Some(other.clone()),
    });
    if nym.as_ref().and_then(|n| n.get("diddocContent")).is_some_and(|c| !c.is_null()) {
        return None;
    }
    let timestamp = result.and_then(|r| r.get("timestamp")).and_then(Value::as_i64);
    let seq_no = match timestamp {
        Some(_) => None,
        None => result
            .and_then(|r| r.get("seqNo"))
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok()),
    };
    Some(LedgerPoint { seq_no, timestamp })
}

/// Synthesizes the `service` array of `did` from its legacy endpoints.
///
/// Entries are ordered by endpoint name.
pub fn services(did: &str, endpoints: &LegacyEndpoint) -> Vec<Value> {
    endpoints
        .endpoint
        .iter()
        .map(|(name, url)| match name.as_str() {
            DIDCOMM_ENDPOINT => json!({
                "id": format!("{did}#did-communication"),
                "type": "did-communication",
                "recipientKeys": [format!("{did}#verkey")],
                "routingKeys": [],
                "priority": 0,
                "serviceEndpoint": url,
            }),
            _ => json!({
                "id": format!("{did}#{name}"),
                "type": name,
                "serviceEndpoint": url,
            }),
        })
        .collect()
}

/// Expands an abbreviated verkey (`~` followed by the key's tail) into the full key.
///
/// An optional `:<type>` suffix is kept. Malformed or full verkeys are returned unchanged.
pub fn expand_verkey(id: &str, verkey: &str) -> String {
    let Some(abbreviated) = verkey.strip_prefix('~') else {
        return verkey.to_string();
    };
    let (key, key_type) = match abbreviated.split_once(':') {
        Some((key, key_type)) => (key, Some(key_type)),
        None => (abbreviated, None),
    };
    if key.is_empty() || key_type.is_some_and(|t| t.is_empty() || t.contains(':')) {
        return verkey.to_string();
    }
    let (Ok(mut full), Ok(tail)) = (bs58::decode(id).into_vec(), bs58::decode(key).into_vec())
    else {
        return verkey.to_string();
    };
    full.extend(tail);
    let full = bs58::encode(full).into_string();
    match key_type {
        Some(key_type) => format!("{full}:{key_type}"),
        None => full,
    }
}

/// Expands abbreviated `publicKeyBase58` values of the document's verification methods.
pub(crate) fn expand_verification_keys(document: &mut Value, id: &str) {
    let Some(methods) = document.get_mut("verificationMethod").and_then(Value::as_array_mut)
    else {
        return;
    };
    for method in methods {
        if let Some(Value::String(key)) = method.get_mut("publicKeyBase58") {
            *key = expand_verkey(id, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DID: &str = "did:indy:sovrin:staging:V4SGRU86Z58d6TV7PBUe6f";

    fn endpoints(entries: &[(&str, &str)]) -> LegacyEndpoint {
        LegacyEndpoint {
            endpoint: entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn didcomm_service() {
        let services = services(DID, &endpoints(&[("endpoint", "https://example")]));
        assert_eq!(
            services,
            [json!({
                "id": "did:indy:sovrin:staging:V4SGRU86Z58d6TV7PBUe6f#did-communication",
                "type": "did-communication",
                "recipientKeys": ["did:indy:sovrin:staging:V4SGRU86Z58d6TV7PBUe6f#verkey"],
                "routingKeys": [],
                "priority": 0,
                "serviceEndpoint": "https://example",
            })]
        );
    }

    #[test]
    fn named_services() {
        let services = services(
            DID,
            &endpoints(&[("profile", "https://agent.com/profile"), ("endpoint", "https://agent.com")]),
        );
        assert_eq!(services.len(), 2);
        assert_eq!(services[0]["type"], "did-communication");
        assert_eq!(
            services[1],
            json!({
                "id": "did:indy:sovrin:staging:V4SGRU86Z58d6TV7PBUe6f#profile",
                "type": "profile",
                "serviceEndpoint": "https://agent.com/profile",
            })
        );
    }

    #[test]
    fn legacy_endpoint_payload() -> serde_json::Result<()> {
        let parsed = serde_json::from_str::<LegacyEndpoint>(
            r#"{"endpoint": {"endpoint": "https://example"}}"#,
        )?;
        assert_eq!(parsed, endpoints(&[("endpoint", "https://example")]));
        Ok(())
    }

    #[test]
    fn expand() {
        let id = "V4SGRU86Z58d6TV7PBUe6f";
        let full = "GJ1SzoWzavQYfNL9XkaJdrQejfztN4XqdsiV4ct3LXKL";
        assert_eq!(expand_verkey(id, "~CoRER63DVYnWZtK8uAzNbx"), full);
        assert_eq!(expand_verkey(id, "~CoRER63DVYnWZtK8uAzNbx:ed25519"), format!("{full}:ed25519"));
        assert_eq!(expand_verkey(id, full), full);
        for malformed in [":ed25519", "~CoRER63DVYnWZtK8uAzNbx:", ":", "~", "~a:b:c", "~0OIl"] {
            assert_eq!(expand_verkey(id, malformed), malformed);
        }
    }

    #[test]
    fn expand_document_keys() {
        let mut document = json!({
            "id": DID,
            "verificationMethod": [{"id": format!("{DID}#verkey"), "publicKeyBase58": "~CoRER63DVYnWZtK8uAzNbx"}],
        });
        expand_verification_keys(&mut document, "V4SGRU86Z58d6TV7PBUe6f");
        assert_eq!(
            document["verificationMethod"][0]["publicKeyBase58"],
            "GJ1SzoWzavQYfNL9XkaJdrQejfztN4XqdsiV4ct3LXKL"
        );
    }

    #[test]
    fn legacy_query_point() {
        let resolution = |result: Value| {
            json!({
                "didDocument": {"id": DID},
                "didDocumentMetadata": {"nodeResponse": {"result": result}},
            })
        };
        assert_eq!(
            legacy_query(&resolution(json!({"data": "{\"dest\":\"V4SGRU86Z58d6TV7PBUe6f\"}", "seqNo": 12}))),
            Some(LedgerPoint { seq_no: Some(12), timestamp: None })
        );
        assert_eq!(
            legacy_query(&resolution(json!({"data": null, "seqNo": 12, "timestamp": 1_600_000_000}))),
            Some(LedgerPoint { seq_no: None, timestamp: Some(1_600_000_000) })
        );
        assert_eq!(
            legacy_query(&resolution(json!({"data": {"diddocContent": {"service": []}}}))),
            None
        );
        assert_eq!(
            legacy_query(&resolution(json!({"data": "{\"diddocContent\":\"{}\"}"}))),
            None
        );
        assert_eq!(legacy_query(&json!({"didDocument": null})), None);
        assert_eq!(legacy_query(&json!({"contentStream": {}})), None);
    }
}
