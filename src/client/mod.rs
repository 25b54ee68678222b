//! REST API client
//!
//! [`RestApiClient`] drives one configured endpoint through a
//! [`HttpTransport`], pacing calls with a [`RequestThrottle`], following the
//! [`Pagination`] cursor and refusing repeats via the [`LoopDetector`].

pub mod loop_detector;
#[cfg(test)]
pub mod mock;
pub mod pagination;
pub mod rate_limit;
pub mod rest;
pub mod transport;

pub use loop_detector::LoopDetector;
#[cfg(test)]
#[allow(unused_imports)]
pub use mock::MockTransport;
pub use pagination::{Cursor, Pagination, PaginationStrategy};
pub use rate_limit::RequestThrottle;
pub use rest::{ClientOptions, RequestOptions, RestApiClient};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
