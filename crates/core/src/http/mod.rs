//! Request construction, transport port and response normalization

pub mod normalize;
pub mod ports;
pub mod request_builder;
