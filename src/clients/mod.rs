pub mod backend_client;
pub mod gateway_client;

pub use backend_client::BackendClient;
pub use gateway_client::{FaceSwapApi, GatewayClient};
