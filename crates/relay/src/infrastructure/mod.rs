pub mod coinbase;
pub mod factory;
pub mod kraken;
pub mod simulator;
pub mod ws_session;

pub use coinbase::CoinbaseConnector;
pub use factory::ConnectorFactory;
pub use kraken::KrakenConnector;
pub use simulator::SimulatorConnector;
pub use ws_session::TaskFeedHandle;
