pub(crate) mod error;
pub(crate) mod sources;
pub(crate) mod vehicles;

pub(crate) use error::ApiError;
