//! Cloud client, artifact storages and cache-driven graph mutation

pub mod archiver;
pub mod cloud;
pub mod error;
pub mod local;
pub mod mapper;
pub mod mutator;
pub mod remote;
pub mod resources;
pub mod storage;


#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cloud::{
    CloudCacheResponse, CloudClient, CloudErrorItem, CloudHeadResponse, CloudResponse,
    CloudResponseError, CloudVerifyUploadResponse, HttpResource,
};
pub use error::{CacheError, CloudClientError};
pub use local::CacheLocalStorage;
pub use mapper::{ArtifactBuilding, CacheMapper};
pub use mutator::CacheGraphMutator;
pub use remote::CacheRemoteStorage;
pub use resources::CacheResources;
pub use storage::{CacheStorage, CacheStoring};
