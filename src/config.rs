use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing::trace;

use crate::pipe::{Command, ControlMessage};

/// Log verbosity accepted in the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ConsumerConfig {
    pub stream: String,
    pub pattern: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct BusConfig {
    #[serde(default = "crate::util::get_default_endpoint")]
    pub endpoint: String,
    #[serde(default = "crate::util::get_default_identity")]
    pub identity: String,
    pub producer: Option<String>,
    pub consumer: Option<ConsumerConfig>,

    /// Run an in-process broker bound at `endpoint`
    #[serde(default)]
    pub serve: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::util::get_default_endpoint(),
            identity: crate::util::get_default_identity(),
            producer: None,
            consumer: None,
            serve: false,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Replace endpoint and identity with values from the environment, if set
    pub fn apply_env_overrides(&mut self) {
        if let Some(endpoint) = crate::util::get_endpoint() {
            trace!("endpoint overridden from environment: {endpoint}");
            self.bus.endpoint = endpoint;
        }
        if let Some(identity) = crate::util::get_identity() {
            trace!("identity overridden from environment: {identity}");
            self.bus.identity = identity;
        }
    }

    /// Control messages that bring a fresh agent into the configured state
    ///
    /// Always starts with CONNECT, followed by PRODUCER and CONSUMER when
    /// those are configured.
    pub fn startup_commands(&self) -> Vec<ControlMessage> {
        let mut commands = vec![Command::Connect {
            endpoint: self.bus.endpoint.clone(),
            identity: self.bus.identity.clone(),
        }];

        if let Some(stream) = &self.bus.producer {
            commands.push(Command::SetProducer {
                stream: stream.clone(),
            });
        }

        if let Some(consumer) = &self.bus.consumer {
            commands.push(Command::SetConsumer {
                stream: consumer.stream.clone(),
                pattern: consumer.pattern.clone(),
            });
        }

        commands.into_iter().map(Command::into_message).collect()
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config '{path}'"))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file '{path}'"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
