//! XML-RPC plumbing: value model, wire codec, field mapping, transports, and
//! the rate-limited client wrapper.

pub mod client;
pub mod codec;
pub mod limiter;
pub mod mapping;
pub mod reqwest_transport;
pub mod transport;
pub mod value;

pub use client::RateLimitedClient;
pub use codec::{decode_response, encode_call};
pub use limiter::FixedRateLimiter;
pub use mapping::{
    FieldSpec, FromValue, FromWire, MappingError, StructReader, StructWriter, ToWire, WireShape,
    validate_shape,
};
pub use reqwest_transport::ReqwestTransport;
pub use transport::{ProtocolError, RpcError, RpcTransport, TransportError};
pub use value::Value;
