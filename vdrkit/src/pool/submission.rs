use crate::error::Result;
use crate::request::Request;
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use vdrkit_ffi::{Bridge, JsonInput};

/// Anything that can be submitted to a [`Pool`](super::Pool).
///
/// Raw bodies are prepared as custom requests first. A borrowed [`Request`] is left
/// without a handle after submission.
#[derive(Debug)]
pub enum Submission<'a> {
    Owned(Request),
    Borrowed(&'a mut Request),
    Raw(JsonInput),
}

impl<'a> Submission<'a> {
    pub(crate) fn into_request(self, bridge: &Bridge) -> Result<Prepared<'a>> {
        Ok(match self {
            Self::Owned(request) => Prepared::Owned(request),
            Self::Borrowed(request) => Prepared::Borrowed(request),
            Self::Raw(body) => Prepared::Owned(Request::custom(bridge, body)?),
        })
    }
}

pub(crate) enum Prepared<'a> {
    Owned(Request),
    Borrowed(&'a mut Request),
}

impl Deref for Prepared<'_> {
    type Target = Request;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Owned(request) => request,
            Self::Borrowed(request) => request,
        }
    }
}

impl DerefMut for Prepared<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::Owned(request) => request,
            Self::Borrowed(request) => request,
        }
    }
}

impl From<Request> for Submission<'_> {
    fn from(request: Request) -> Self {
        Self::Owned(request)
    }
}

impl<'a> From<&'a mut Request> for Submission<'a> {
    fn from(request: &'a mut Request) -> Self {
        Self::Borrowed(request)
    }
}

impl From<JsonInput> for Submission<'_> {
    fn from(body: JsonInput) -> Self {
        Self::Raw(body)
    }
}

impl From<Value> for Submission<'_> {
    fn from(body: Value) -> Self {
        Self::Raw(body.into())
    }
}

impl From<String> for Submission<'_> {
    fn from(body: String) -> Self {
        Self::Raw(body.into())
    }
}

impl From<&str> for Submission<'_> {
    fn from(body: &str) -> Self {
        Self::Raw(body.into())
    }
}

impl From<Vec<u8>> for Submission<'_> {
    fn from(body: Vec<u8>) -> Self {
        Self::Raw(body.into())
    }
}
