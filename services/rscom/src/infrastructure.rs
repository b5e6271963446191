// インフラストラクチャ層モジュール
pub mod api;
pub mod config;
pub mod links_connector;
pub mod logging;
pub mod mysql;
pub mod parameter_store;
pub mod ssm_config;

// 再エクスポート
pub use api::{
    ApiClient, ApiClientError, HyperlinkClient, LinkLookup, PostClient, PostLinksSource,
};
pub use config::{
    ApiHostsConfig, CassandraConfig, ConfigError, MySqlConfig, MySqlStore, RuntimeConfig,
};
pub use links_connector::{LinkStore, LinksConnector, LinksConnectorError};
pub use logging::init_logging;
pub use mysql::{
    CollabsConnector, CollabsRepository, ConnectorError, MySqlConnector, PostsConnector,
    PostsRepository, SqlParam,
};
pub use parameter_store::{
    AwsParameterSource, Parameter, ParameterSource, ParameterStoreError, SsmParameterStore,
};
pub use ssm_config::{SsmConfigError, load_mysql_config, resolve_api_hosts};
