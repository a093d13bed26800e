//! Per-request context types.
//!
//! The [`ActionContext`] carries everything an action invocation needs that
//! is scoped to a single request: the resolved [`ActionDescriptor`], the
//! request head, the accumulated [`ModelState`], the buffered response and
//! the request-abort signal.

use crate::descriptor::ActionDescriptor;
use crate::model_state::ModelState;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use strata_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The HTTP response type produced by an invocation.
pub type Response = http::Response<Full<Bytes>>;

/// A buffered, mutable response that result executors write into.
///
/// Nothing is sent anywhere while the pipeline runs; the buffer is turned
/// into a [`Response`] once the invocation completes successfully.
#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseBuffer {
    /// Creates an empty `200 OK` response buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the `content-type` header, if it is set and valid UTF-8.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Sets the `content-type` header.
    ///
    /// Values that are not valid header values are ignored.
    pub fn set_content_type(&mut self, content_type: &str) {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(http::header::CONTENT_TYPE, value);
        }
    }

    /// Appends bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Returns the body written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns `true` once any body bytes have been written.
    #[must_use]
    pub fn has_started(&self) -> bool {
        !self.body.is_empty()
    }

    /// Converts the buffer into an HTTP response.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Request-scoped context for a single action invocation.
///
/// # Example
///
/// ```
/// use strata_core::{ActionContext, fixtures};
///
/// let ctx = ActionContext::new(fixtures::value_action("getAnswer", 42));
/// assert_eq!(ctx.descriptor().action_name(), "getAnswer");
/// assert!(ctx.model_state().is_valid());
/// ```
pub struct ActionContext {
    request_id: RequestId,
    descriptor: Arc<ActionDescriptor>,
    request: http::request::Parts,
    model_state: ModelState,
    response: ResponseBuffer,
    request_aborted: CancellationToken,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ActionContext {
    /// Creates a context for the given action with an empty `GET /` request.
    #[must_use]
    pub fn new(descriptor: impl Into<Arc<ActionDescriptor>>) -> Self {
        let (request, ()) = http::Request::new(()).into_parts();
        Self::from_parts(descriptor, request)
    }

    /// Creates a context from a request head.
    #[must_use]
    pub fn from_parts(
        descriptor: impl Into<Arc<ActionDescriptor>>,
        request: http::request::Parts,
    ) -> Self {
        Self {
            request_id: RequestId::new(),
            descriptor: descriptor.into(),
            request,
            model_state: ModelState::new(),
            response: ResponseBuffer::new(),
            request_aborted: CancellationToken::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Replaces the request ID, e.g. with one propagated by an upstream service.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Uses the given token as the request-abort signal.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.request_aborted = token;
        self
    }

    /// Replaces the model state, e.g. to apply a different error limit.
    #[must_use]
    pub fn with_model_state(mut self, model_state: ModelState) -> Self {
        self.model_state = model_state;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the descriptor of the action being invoked.
    #[must_use]
    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    /// Returns a shared handle to the action descriptor.
    #[must_use]
    pub fn descriptor_arc(&self) -> Arc<ActionDescriptor> {
        Arc::clone(&self.descriptor)
    }

    /// Returns the request head.
    #[must_use]
    pub fn request(&self) -> &http::request::Parts {
        &self.request
    }

    /// Returns a request header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the accumulated binding errors.
    #[must_use]
    pub fn model_state(&self) -> &ModelState {
        &self.model_state
    }

    /// Returns the accumulated binding errors mutably.
    pub fn model_state_mut(&mut self) -> &mut ModelState {
        &mut self.model_state
    }

    /// Returns the buffered response.
    #[must_use]
    pub fn response(&self) -> &ResponseBuffer {
        &self.response
    }

    /// Returns the buffered response mutably.
    pub fn response_mut(&mut self) -> &mut ResponseBuffer {
        &mut self.response
    }

    /// Returns the request-abort signal.
    ///
    /// The pipeline never polls this token; handlers and filters that await
    /// I/O are expected to observe it and fail with an error of their own.
    #[must_use]
    pub fn request_aborted(&self) -> &CancellationToken {
        &self.request_aborted
    }

    /// Returns when the context was created.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Stores a typed extension value.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_core::{ActionContext, fixtures};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Tenant(&'static str);
    ///
    /// let mut ctx = ActionContext::new(fixtures::unit_action("ping"));
    /// ctx.set_extension(Tenant("acme"));
    /// assert_eq!(ctx.get_extension::<Tenant>(), Some(&Tenant("acme")));
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Consumes the context and returns its response buffer.
    #[must_use]
    pub fn into_response_buffer(self) -> ResponseBuffer {
        self.response
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("request_id", &self.request_id)
            .field("action", &self.descriptor.action_name())
            .field("method", &self.request.method)
            .field("uri", &self.request.uri)
            .field("model_state", &self.model_state)
            .field("response_status", &self.response.status())
            .finish_non_exhaustive()
    }
}
