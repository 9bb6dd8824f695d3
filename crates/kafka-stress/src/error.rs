use rdkafka::error::KafkaError;

/// Errors raised by a broker transport while setting up clients or senders
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("failed to create broker client: {0}")]
    Client(#[source] KafkaError),
    #[error("failed to reach brokers {brokers}: {source}")]
    Unreachable {
        brokers: String,
        #[source]
        source: KafkaError,
    },
    #[error("failed to create sender: {0}")]
    Sender(String),
    #[error("{0}")]
    Other(String),
}

/// Outcome of a batch in which at least one message was rejected
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{failed} message(s) of the batch failed: {cause}")]
pub struct BatchFailure {
    pub failed: usize,
    pub cause: String,
}

impl BatchFailure {
    pub fn new(failed: usize, cause: impl Into<String>) -> Self {
        Self {
            failed,
            cause: cause.into(),
        }
    }
}

/// Setup errors. All of them abort the run.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("client {client} failed to connect: {source}")]
    Connect {
        client: usize,
        #[source]
        source: TransportError,
    },
    #[error("client {client} failed to create producer: {source}")]
    Sender {
        client: usize,
        #[source]
        source: TransportError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("connection pool already shut down")]
    ShutDown,
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    ConfigFile(#[from] serde_yaml::Error),
}
