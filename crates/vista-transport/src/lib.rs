pub mod connection;
pub mod provider;

pub use connection::Connection;
pub use provider::ConnectionProvider;
