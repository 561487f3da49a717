pub mod responses;
pub mod rest;

pub use rest::{build_router, ApiError, ApiResult, AppState, RestApi};
