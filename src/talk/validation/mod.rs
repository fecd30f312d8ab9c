//! Response validation.

pub mod response_validator;

pub use response_validator::validate_response;
