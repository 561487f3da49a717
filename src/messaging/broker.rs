use crate::config::MessageBrokerConfig;
use crate::error::Error;
use crate::messaging::event::{EventMessage, EventType};
use anyhow::Result;
use async_trait::async_trait;
use deadpool_lapin::{Config, Manager, Pool};
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, ConnectionProperties, ExchangeKind,
};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Anything that can accept registry events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        event_type: EventType,
        source_id: Option<Uuid>,
        payload: serde_json::Value,
    ) -> Result<()>;
}

/// RabbitMQ publisher
pub struct MessageBroker {
    pool: Pool,
    config: MessageBrokerConfig,
    /// Cached publishing channel
    channel: Arc<Mutex<Option<Channel>>>,
}

impl MessageBroker {
    pub async fn new(config: MessageBrokerConfig) -> Result<Self> {
        let pool_config = Config {
            url: Some(config.uri.clone()),
            pool: Some(deadpool_lapin::PoolConfig {
                max_size: config.pool_size as usize,
                queue_mode: deadpool::managed::QueueMode::Fifo,
                timeouts: deadpool::managed::Timeouts {
                    wait: Some(Duration::from_millis(config.timeout_ms)),
                    create: Some(Duration::from_millis(config.timeout_ms)),
                    recycle: Some(Duration::from_millis(config.timeout_ms)),
                },
            }),
            connection_properties: ConnectionProperties::default(),
        };
        let pool = pool_config
            .create_pool(Some(deadpool_lapin::Runtime::Tokio1))
            .map_err(|e| Error::Messaging(format!("Failed to create RabbitMQ pool: {}", e)))?;

        let broker = Self {
            pool,
            config,
            channel: Arc::new(Mutex::new(None)),
        };

        broker.init().await?;

        Ok(broker)
    }

    /// Declare the topic exchange and cache a channel
    async fn init(&self) -> Result<()> {
        let channel = self.open_channel().await?;

        channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::Messaging(format!("Failed to declare exchange: {}", e)))?;

        *self.channel.lock().await = Some(channel);

        info!("RabbitMQ publisher initialized on exchange {}", self.config.exchange);

        Ok(())
    }

    /// Get a pooled connection with retry
    async fn get_connection(&self) -> Result<deadpool::managed::Object<Manager>> {
        let mut attempts = 0;
        let max_attempts = self.config.retry_attempts.max(1);

        loop {
            attempts += 1;
            match self.pool.get().await {
                Ok(conn) => return Ok(conn),
                Err(err) => {
                    if attempts >= max_attempts {
                        return Err(Error::Messaging(format!(
                            "Failed to get RabbitMQ connection after {} attempts: {}",
                            attempts, err
                        ))
                        .into());
                    }

                    warn!(
                        "Failed to get RabbitMQ connection (attempt {}/{}): {}",
                        attempts, max_attempts, err
                    );

                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
            }
        }
    }

    async fn open_channel(&self) -> Result<Channel> {
        let conn = self.get_connection().await?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| Error::Messaging(format!("Failed to create RabbitMQ channel: {}", e)))?;
        Ok(channel)
    }

    /// Reuse the cached channel while it is connected
    async fn get_channel(&self) -> Result<Channel> {
        let mut channel_guard = self.channel.lock().await;

        if let Some(channel) = &*channel_guard {
            if channel.status().connected() {
                return Ok(channel.clone());
            }
        }

        let channel = self.open_channel().await?;
        *channel_guard = Some(channel.clone());

        Ok(channel)
    }
}

#[async_trait]
impl EventPublisher for MessageBroker {
    async fn publish(
        &self,
        event_type: EventType,
        source_id: Option<Uuid>,
        payload: serde_json::Value,
    ) -> Result<()> {
        let event = EventMessage::new(event_type, source_id, payload)?;
        let message = serde_json::to_vec(&event)?;
        let channel = self.get_channel().await?;
        let routing_key = event.routing_key();

        channel
            .basic_publish(
                &self.config.exchange,
                &routing_key,
                BasicPublishOptions::default(),
                &message,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| Error::Messaging(format!("Failed to publish message: {}", e)))?;

        debug!("Published event: {} with routing key: {}", event.id, routing_key);

        Ok(())
    }
}

/// Writes events to the log. Used when no broker is configured.
#[derive(Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(
        &self,
        event_type: EventType,
        source_id: Option<Uuid>,
        payload: serde_json::Value,
    ) -> Result<()> {
        let event = EventMessage::new(event_type, source_id, payload)?;
        info!("Event {}: {}", event.routing_key(), event.payload);
        Ok(())
    }
}

/// Keeps every event in memory so callers can inspect what was published
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    events: std::sync::Mutex<Vec<EventMessage>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventMessage> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn events_of(&self, event_type: &EventType) -> Vec<EventMessage> {
        self.events()
            .into_iter()
            .filter(|e| &e.event_type == event_type)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(
        &self,
        event_type: EventType,
        source_id: Option<Uuid>,
        payload: serde_json::Value,
    ) -> Result<()> {
        let event = EventMessage::new(event_type, source_id, payload)?;
        self.events
            .lock()
            .map_err(|_| Error::Messaging("Event log poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// Pick the publisher selected by configuration
pub async fn create_publisher(config: &MessageBrokerConfig) -> Result<Arc<dyn EventPublisher>> {
    if config.enabled {
        let broker = MessageBroker::new(config.clone()).await?;
        Ok(Arc::new(broker))
    } else {
        info!("Message broker disabled; events will be logged only");
        Ok(Arc::new(LogPublisher))
    }
}
