//! SMTP connections: configuration, streams and the session driver.

mod client;
mod config;
mod stream;
mod tap;
mod transport;

pub use client::{Client, deliver};
pub use config::{
    Config, ConfigBuilder, DEFAULT_CONNECT_TIMEOUT, HelloMethod, Security, SignInMethod,
};
pub use stream::{SmtpStream, connect};
pub use tap::{TRAFFIC_TARGET, Tap};
pub use transport::Transport;
