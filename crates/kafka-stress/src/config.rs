use std::fmt;
use std::path::Path;
use std::time::Duration;

use clap::{ArgAction, Args, ValueEnum};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

pub const DEFAULT_TOPIC: &str = "topic";
pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_CLIENTS: usize = 3;
pub const DEFAULT_PRODUCERS_PER_CLIENT: usize = 5;
pub const DEFAULT_MESSAGES_TO_SEND: u64 = 100_000;
pub const DEFAULT_BROKERS: &str = "localhost:9093";
pub const DEFAULT_USERNAME: &str = "username";
pub const DEFAULT_PASSWORD: &str = "password";
pub const DEFAULT_MESSAGE: &str = "message";
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Load profile of a run. Built once before any producer starts.
#[derive(Clone, Args, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoadConfig {
    /// Kafka topic
    #[arg(long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Messages batch size
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of clients
    #[arg(long, default_value_t = DEFAULT_CLIENTS)]
    pub clients: usize,

    /// Number of producers to use per client
    #[arg(long, default_value_t = DEFAULT_PRODUCERS_PER_CLIENT)]
    pub producers_per_client: usize,

    /// Number of messages to send
    #[arg(long, default_value_t = DEFAULT_MESSAGES_TO_SEND)]
    pub messages_to_send: u64,

    /// Comma delimited list of Kafka brokers
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_BROKERS)]
    pub brokers: Vec<String>,

    /// Use TLS encryption
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub tls: bool,

    /// Use SASL authentication
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub sasl: bool,

    /// SASL username
    #[arg(long, default_value = DEFAULT_USERNAME)]
    pub username: String,

    /// SASL password
    #[arg(long, default_value = DEFAULT_PASSWORD, hide_default_value = true)]
    pub password: String,

    /// Kafka message
    #[arg(long, default_value = DEFAULT_MESSAGE)]
    pub message: String,

    /// Compression codec applied by the producers
    #[arg(long, value_enum, default_value = "gzip")]
    pub compression: Compression,

    /// Acknowledgment required from the brokers
    #[arg(long, value_enum, default_value = "leader")]
    pub acks: Acks,

    /// Interval between two throughput reports
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    #[serde(with = "humantime_serde")]
    pub report_interval: Duration,

    /// Time a message may wait for its delivery report
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    #[serde(with = "humantime_serde")]
    pub delivery_timeout: Duration,

    /// Time allowed to reach the brokers when connecting a client
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10s")]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Time allowed for producers to stop once the run is over
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5s")]
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            clients: DEFAULT_CLIENTS,
            producers_per_client: DEFAULT_PRODUCERS_PER_CLIENT,
            messages_to_send: DEFAULT_MESSAGES_TO_SEND,
            brokers: vec![DEFAULT_BROKERS.to_string()],
            tls: true,
            sasl: true,
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            compression: Compression::Gzip,
            acks: Acks::Leader,
            report_interval: DEFAULT_REPORT_INTERVAL,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl fmt::Debug for LoadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadConfig")
            .field("topic", &self.topic)
            .field("batch_size", &self.batch_size)
            .field("clients", &self.clients)
            .field("producers_per_client", &self.producers_per_client)
            .field("messages_to_send", &self.messages_to_send)
            .field("brokers", &self.brokers)
            .field("tls", &self.tls)
            .field("sasl", &self.sasl)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("message", &self.message)
            .field("compression", &self.compression)
            .field("acks", &self.acks)
            .field("report_interval", &self.report_interval)
            .field("delivery_timeout", &self.delivery_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl LoadConfig {
    /// Read a load profile from a YAML file. Missing keys take their default.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.batch_size == 0 {
            return Err(LoadError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.clients == 0 {
            return Err(LoadError::InvalidConfig(
                "at least one client is required".to_string(),
            ));
        }
        if self.producers_per_client == 0 {
            return Err(LoadError::InvalidConfig(
                "at least one producer per client is required".to_string(),
            ));
        }
        if self.brokers.iter().all(|broker| broker.trim().is_empty()) {
            return Err(LoadError::InvalidConfig("broker list is empty".to_string()));
        }
        if self.sasl && self.username.is_empty() {
            return Err(LoadError::InvalidConfig(
                "SASL authentication requires a username".to_string(),
            ));
        }
        Ok(())
    }

    /// Broker endpoints with surrounding whitespace and empty entries removed
    pub fn broker_list(&self) -> Vec<String> {
        self.brokers
            .iter()
            .map(|broker| broker.trim())
            .filter(|broker| !broker.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn transport_config(&self) -> Result<TransportConfig, LoadError> {
        let mut builder = TransportConfigBuilder::default();
        builder
            .compression(self.compression)
            .acks(self.acks)
            .flush_max_messages(self.batch_size)
            .tls(self.tls)
            .delivery_timeout(self.delivery_timeout)
            .connect_timeout(self.connect_timeout);
        if self.sasl {
            builder.sasl(SaslCredentials::new(&self.username, &self.password));
        }
        builder
            .build()
            .map_err(|err| LoadError::InvalidConfig(err.to_string()))
    }
}

/// Broker facing settings shared by every client of a run
#[derive(Debug, Clone, Builder, PartialEq)]
pub struct TransportConfig {
    #[builder(default = "Compression::Gzip")]
    pub compression: Compression,
    #[builder(default = "Acks::Leader")]
    pub acks: Acks,
    /// Upper bound of messages the client accumulates before flushing a request
    #[builder(default = "DEFAULT_BATCH_SIZE")]
    pub flush_max_messages: usize,
    #[builder(default)]
    pub tls: bool,
    #[builder(default, setter(strip_option))]
    pub sasl: Option<SaslCredentials>,
    #[builder(default = "DEFAULT_DELIVERY_TIMEOUT")]
    pub delivery_timeout: Duration,
    #[builder(default = "DEFAULT_CONNECT_TIMEOUT")]
    pub connect_timeout: Duration,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SaslCredentials {
    pub username: String,
    pub password: String,
}

impl SaslCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq, Serialize, Deserialize)]
#[clap(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Eq, PartialEq, Serialize, Deserialize)]
#[clap(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Acks {
    /// Fire and forget
    None,
    /// Wait for the partition leader to persist the message
    Leader,
    /// Wait for every in-sync replica
    All,
}

impl Acks {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acks::None => "0",
            Acks::Leader => "1",
            Acks::All => "all",
        }
    }
}
