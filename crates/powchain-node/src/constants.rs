pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 3001;
pub const DEFAULT_P2P_PORT: u16 = 6001;

pub(crate) const HEARTBEAT_DATA: &str = "Health Status 100%";
pub(crate) const HEARTBEAT_INTERVAL_SECS: u64 = 10;

pub(crate) const ACCEPT_RETRY_DELAY_MS: u64 = 100;
