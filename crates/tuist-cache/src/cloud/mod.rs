//! Client for the Tuist Cloud HTTP API

pub mod client;
pub mod envelope;
pub mod resource;

pub use client::CloudClient;
pub use envelope::{
    CloudCacheResponse, CloudErrorItem, CloudHeadResponse, CloudResponse, CloudResponseError,
    CloudVerifyUploadResponse,
};
pub use resource::HttpResource;
