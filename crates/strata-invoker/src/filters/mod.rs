//! Built-in filters.
//!
//! | Filter | Stage | Purpose |
//! |--------|-------|---------|
//! | [`RequestIdFilter`] | resource | stamps `x-request-id` on the response |
//! | [`TimingFilter`] | resource (async) | measures the nested pipeline |
//! | [`RequireHeaderFilter`] | authorization | denies requests missing a header |
//! | [`ModelStateValidationFilter`] | action | rejects invalid model state with `400` |
//! | [`ErrorEnvelopeFilter`] | exception | recovers from faults with a JSON envelope |
//!
//! [`FnAuthorizationFilter`] and [`FnExceptionFilter`] adapt closures.

pub mod error_envelope;
pub mod fn_filters;
pub mod model_state_validation;
pub mod request_id;
pub mod require_header;
pub mod timing;

pub use error_envelope::{ErrorEnvelopeFilter, UNHANDLED_ERROR_CODE};
pub use fn_filters::{FnAuthorizationFilter, FnExceptionFilter};
pub use model_state_validation::{ModelStateValidationFilter, VALIDATION_ERROR_CODE};
pub use request_id::{RequestIdFilter, REQUEST_ID_HEADER};
pub use require_header::RequireHeaderFilter;
pub use timing::TimingFilter;
