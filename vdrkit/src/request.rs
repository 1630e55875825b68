//! Prepared ledger requests.
use crate::error::Result;
use crate::ledger::RequestKind;
use serde_json::Value;
use std::ffi::CString;
use std::fmt;
use tracing::{debug, warn};
use vdrkit_ffi::{Bridge, ByteBuffer, Error, JsonInput, RequestHandle};

/// A ledger request prepared by the engine.
///
/// The request owns its engine-side handle and releases it on drop. Submitting a request
/// to a pool consumes the handle, after which every other operation fails with
/// [`Error::NoRequestHandle`].
pub struct Request {
    handle: Option<RequestHandle>,
    bridge: Bridge,
}

impl Request {
    /// Prepares a request of the given kind.
    pub fn build(bridge: &Bridge, kind: RequestKind) -> Result<Self> {
        let call = kind.builder_call()?;
        let mut handle = RequestHandle::EMPTY;
        bridge.check(bridge.library().build_request(&call, &mut handle))?;
        debug!(symbol = call.symbol, %handle, "request created");
        Ok(Self::from_handle(bridge.clone(), handle))
    }
    /// Prepares a request from a complete JSON body.
    pub fn custom(bridge: &Bridge, body: impl Into<JsonInput>) -> Result<Self> {
        Self::build(bridge, RequestKind::Custom { body: body.into() })
    }
    /// Wraps an engine handle. The request takes ownership of it.
    pub fn from_handle(bridge: Bridge, handle: RequestHandle) -> Self {
        Self { handle: Some(handle).filter(|h| !h.is_empty()), bridge }
    }
    pub fn handle(&self) -> Option<RequestHandle> {
        self.handle
    }
    pub fn is_freed(&self) -> bool {
        self.handle.is_none()
    }
    /// Relinquishes the handle so that the engine may consume it.
    pub(crate) fn take_handle(&mut self) -> Result<RequestHandle> {
        Ok(self.handle.take().ok_or(Error::NoRequestHandle)?)
    }
    fn live_handle(&self) -> Result<RequestHandle> {
        Ok(self.handle.ok_or(Error::NoRequestHandle)?)
    }
    /// The request body as a JSON string.
    pub fn body(&self) -> Result<String> {
        let handle = self.live_handle()?;
        Ok(self.bridge.call_string(|lib, out| lib.request_get_body(handle, out))?)
    }
    /// The request body, parsed.
    pub fn body_json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body()?)?)
    }
    /// The canonical serialization to be signed.
    pub fn signature_input(&self) -> Result<String> {
        let handle = self.live_handle()?;
        Ok(self.bridge.call_string(|lib, out| lib.request_get_signature_input(handle, out))?)
    }
    pub fn set_endorser(&mut self, endorser: &str) -> Result<()> {
        let handle = self.live_handle()?;
        let endorser = CString::new(endorser).map_err(Error::from)?;
        Ok(self.bridge.check(self.bridge.library().request_set_endorser(handle, &endorser))?)
    }
    pub fn set_signature(&mut self, signature: &[u8]) -> Result<()> {
        let handle = self.live_handle()?;
        let status = self
            .bridge
            .library()
            .request_set_signature(handle, ByteBuffer::from_slice(signature));
        Ok(self.bridge.check(status)?)
    }
    /// Adds a signature by `identifier` to the request's multi-signature set.
    pub fn set_multi_signature(&mut self, identifier: &str, signature: &[u8]) -> Result<()> {
        let handle = self.live_handle()?;
        let identifier = CString::new(identifier).map_err(Error::from)?;
        let status = self.bridge.library().request_set_multi_signature(
            handle,
            &identifier,
            ByteBuffer::from_slice(signature),
        );
        Ok(self.bridge.check(status)?)
    }
    /// Attaches acceptance data produced by
    /// [`prepare_txn_author_agreement_acceptance`](crate::ledger::prepare_txn_author_agreement_acceptance).
    pub fn set_txn_author_agreement_acceptance(
        &mut self,
        acceptance: impl Into<JsonInput>,
    ) -> Result<()> {
        let handle = self.live_handle()?;
        let acceptance = acceptance.into().to_cstring()?;
        let status =
            self.bridge.library().request_set_txn_author_agreement_acceptance(handle, &acceptance);
        Ok(self.bridge.check(status)?)
    }
    /// Releases the engine-side request. Further calls are no-ops.
    pub fn free(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            self.bridge.check(self.bridge.library().request_free(handle))?;
            debug!(%handle, "request freed");
        }
        Ok(())
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if let Err(e) = self.free() {
            warn!(error = %e, "failed to free request");
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle {
            Some(handle) => write!(f, "Request({handle:?})"),
            None => write!(f, "Request(freed)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error as VdrError;
    use serde_json::json;
    use std::sync::Arc;
    use vdrkit_ffi::mock::MockEngine;
    use vdrkit_ffi::ErrorCode;

    fn setup() -> (Arc<MockEngine>, Bridge) {
        let engine = Arc::new(MockEngine::new());
        (engine.clone(), Bridge::new(engine))
    }

    fn get_nym(bridge: &Bridge) -> Result<Request> {
        RequestKind::GetNym {
            submitter_did: None,
            dest: String::from("V4SGRU86Z58d6TV7PBUe6f"),
            seq_no: None,
            timestamp: None,
        }
        .build(bridge)
    }

    #[test]
    fn body_and_signature_input() -> Result<()> {
        let (_, bridge) = setup();
        let mut request = get_nym(&bridge)?;
        let body = request.body_json()?;
        assert_eq!(body["operation"], json!({"type": "105", "dest": "V4SGRU86Z58d6TV7PBUe6f"}));
        assert_eq!(body["identifier"], "LibindyDid111111111111");

        request.set_signature(&[1, 2, 3, 4])?;
        assert_eq!(request.body_json()?["signature"], "2VfUX");
        let input: Value = serde_json::from_str(&request.signature_input()?)?;
        assert!(input.get("signature").is_none());
        assert_eq!(input["reqId"], body["reqId"]);
        Ok(())
    }

    #[test]
    fn endorser_multi_signature_and_acceptance() -> Result<()> {
        let (_, bridge) = setup();
        let mut request = get_nym(&bridge)?;
        request.set_endorser("Th7MpTaRZVRYnPiabds81Y")?;
        request.set_multi_signature("V4SGRU86Z58d6TV7PBUe6f", &[1, 2, 3, 4])?;
        request.set_multi_signature("Th7MpTaRZVRYnPiabds81Y", &[1, 2, 3, 4])?;
        request.set_txn_author_agreement_acceptance(json!({
            "mechanism": "on_file",
            "taaDigest": "abcdef",
            "time": 1_599_955_200,
        }))?;
        let body = request.body_json()?;
        assert_eq!(body["endorser"], "Th7MpTaRZVRYnPiabds81Y");
        assert_eq!(body["signatures"].as_object().map(|m| m.len()), Some(2));
        assert_eq!(body["taaAcceptance"]["mechanism"], "on_file");
        Ok(())
    }

    #[test]
    fn native_rejection_is_reported() -> Result<()> {
        let (_, bridge) = setup();
        let mut request = get_nym(&bridge)?;
        let err = request.set_endorser("").expect_err("should fail");
        assert_eq!(err.code(), ErrorCode::Input);
        assert_eq!(err.to_string(), "input error: Invalid endorser DID");
        Ok(())
    }

    #[test]
    fn free_is_idempotent() -> Result<()> {
        let (engine, bridge) = setup();
        let mut request = get_nym(&bridge)?;
        assert_eq!(engine.live_requests(), 1);
        request.free()?;
        request.free()?;
        assert!(request.is_freed());
        assert_eq!(engine.calls("indy_vdr_request_free"), 1);
        assert_eq!(engine.live_requests(), 0);
        assert_eq!(format!("{request:?}"), "Request(freed)");
        Ok(())
    }

    #[test]
    fn freed_request_rejects_operations() -> Result<()> {
        let (engine, bridge) = setup();
        let mut request = get_nym(&bridge)?;
        request.free()?;
        assert!(matches!(request.body(), Err(VdrError::Vdr(Error::NoRequestHandle))));
        assert!(matches!(request.set_signature(&[0]), Err(VdrError::Vdr(Error::NoRequestHandle))));
        let err = request.signature_input().expect_err("should fail");
        assert_eq!(err.code(), ErrorCode::Wrapper);
        assert_eq!(engine.calls("indy_vdr_request_get_signature_input"), 0);
        Ok(())
    }

    #[test]
    fn drop_releases_handle() -> Result<()> {
        let (engine, bridge) = setup();
        let request = get_nym(&bridge)?;
        let handle = request.handle().expect("handle");
        assert_eq!(format!("{request:?}"), format!("Request({handle:?})"));
        drop(request);
        assert_eq!(engine.live_requests(), 0);
        assert_eq!(engine.live_strings(), 0);
        Ok(())
    }

    #[test]
    fn builder_failure_leaves_nothing_behind() {
        let (engine, bridge) = setup();
        engine.fail_next(ErrorCode::Input, "Invalid DID");
        let err = get_nym(&bridge).expect_err("should fail");
        assert_eq!(err.to_string(), "input error: Invalid DID");
        assert_eq!(engine.live_requests(), 0);
    }
}
