mod settings;

pub use settings::{HeartbeatConfig, NotifierConfig, ServerConfig, Settings};
