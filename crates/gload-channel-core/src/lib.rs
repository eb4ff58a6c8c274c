//! Channel abstractions for gload.
//!
//! A channel binds one group to one provider type: it picks the upstream for
//! each request, rewrites the proxy route onto it, notices when the group it
//! was built from has changed, and carries the provider hooks in
//! [`ChannelProxy`]. Forwarding the request is the router's job.

pub mod channel;
pub mod client;
pub mod context;
pub mod errors;
pub mod factory;
pub mod headers;
pub mod proxy;
pub mod registry;
pub mod request;
pub mod upstream;

pub use channel::ChannelCore;
pub use client::{ClientConfig, ClientManager, UpstreamHttpResponse, send_buffered};
pub use context::CallContext;
pub use errors::{ChannelError, ChannelResult, ValidationError};
pub use factory::ChannelFactory;
pub use headers::{Headers, bearer_token, header_get, header_remove, header_set};
pub use proxy::{
    ChannelProxy, accepts_event_stream, body_requests_stream, query_requests_stream,
};
pub use registry::{ChannelConstructor, ChannelRegistry, global_registry, install_global};
pub use request::{HttpMethod, InboundRequest, UpstreamHttpRequest};
pub use upstream::{UpstreamInfo, UpstreamSet, UpstreamTarget};

pub use gload_common::{ApiKey, DEFAULT_UPSTREAM_ID, EffectiveConfig, Group};

/// Re-exported so implementors name the same client type as the core.
pub use wreq::Client as HttpClient;
