use std::sync::Arc;

use crate::clients::BackendClient;
use crate::config::Config;
use crate::error::AppResult;

/// 网关共享状态，请求之间只读
pub struct GatewayState {
    pub config: Config,
    pub backend: BackendClient,
}

impl GatewayState {
    pub fn new(config: Config) -> AppResult<Arc<Self>> {
        let backend = BackendClient::new(&config)?;

        Ok(Arc::new(Self { config, backend }))
    }
}
