//! Single live-feed connection with channel routing and reconnects.

use super::backoff::ReconnectBackoff;
use super::dto::{FeedFrame, SubscriptionRequest};
use crate::domain::errors::ChartError;
use crate::domain::logging::{LogComponent, get_logger};
use crate::domain::market_data::{Channel, ConnectionStatus, Subscription, Symbol};
use futures::channel::mpsc::UnboundedReceiver;
use futures::future::{Either, select};
use futures::{FutureExt, StreamExt, pin_mut};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Text-frame transport under the connection manager
#[allow(async_fn_in_trait)]
pub trait FeedTransport {
    async fn open(&mut self) -> Result<(), ChartError>;
    async fn send(&mut self, text: String) -> Result<(), ChartError>;
    /// Next inbound text frame; `None` once the connection is gone
    async fn next_message(&mut self) -> Option<Result<String, ChartError>>;
    fn close(&mut self);
}

/// Requests from the chart side while [`StreamConnectionManager::run`] is active
#[derive(Debug, Clone, PartialEq)]
pub enum StreamCommand {
    SwitchSymbol(Symbol),
    Disconnect,
}

type MessageHandler = Box<dyn FnMut(&Value)>;
type StatusHandler = Box<dyn FnMut(&Symbol, ConnectionStatus)>;

pub struct StreamConnectionManager<T: FeedTransport> {
    transport: T,
    subscription: Subscription,
    handlers: HashMap<Channel, Vec<MessageHandler>>,
    status_handlers: Vec<StatusHandler>,
    backoff: ReconnectBackoff,
}

impl<T: FeedTransport> StreamConnectionManager<T> {
    pub fn new(transport: T, subscription: Subscription, backoff: ReconnectBackoff) -> Self {
        Self { transport, subscription, handlers: HashMap::new(), status_handlers: Vec::new(), backoff }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.subscription.status
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Register a handler for every payload arriving on `channel`
    pub fn on_message<H>(&mut self, channel: Channel, handler: H)
    where
        H: FnMut(&Value) + 'static,
    {
        self.handlers.entry(channel).or_default().push(Box::new(handler));
    }

    pub fn on_status<H>(&mut self, handler: H)
    where
        H: FnMut(&Symbol, ConnectionStatus) + 'static,
    {
        self.status_handlers.push(Box::new(handler));
    }

    /// Open the connection and subscribe the active symbol. No-op when connected.
    pub async fn connect(&mut self) -> Result<(), ChartError> {
        if self.subscription.status == ConnectionStatus::Connected {
            return Ok(());
        }
        self.set_status(ConnectionStatus::Connecting);
        if let Err(err) = self.transport.open().await {
            self.set_status(ConnectionStatus::Disconnected);
            return Err(as_disconnect(err));
        }
        let request = SubscriptionRequest::subscribe(&self.subscription).to_json()?;
        if let Err(err) = self.transport.send(request).await {
            self.transport.close();
            self.set_status(ConnectionStatus::Disconnected);
            return Err(as_disconnect(err));
        }
        self.backoff.reset();
        self.set_status(ConnectionStatus::Connected);
        get_logger().info(
            LogComponent::Infrastructure("StreamConnectionManager"),
            &format!("subscribed {} to {:?}", self.subscription.symbol, self.subscription.channels),
        );
        Ok(())
    }

    /// Unsubscribe and close. Safe to call when already disconnected.
    pub async fn disconnect(&mut self) {
        if self.subscription.status == ConnectionStatus::Connected {
            if let Ok(request) = SubscriptionRequest::unsubscribe(&self.subscription).to_json() {
                if let Err(err) = self.transport.send(request).await {
                    get_logger().debug(
                        LogComponent::Infrastructure("StreamConnectionManager"),
                        &format!("unsubscribe on close failed: {err}"),
                    );
                }
            }
        }
        if self.subscription.status != ConnectionStatus::Disconnected {
            self.transport.close();
            self.set_status(ConnectionStatus::Disconnected);
        }
    }

    /// Move the subscription to `symbol`.
    ///
    /// While connected the old symbol is unsubscribed before the new one is
    /// subscribed, so no message for the old symbol is routed afterwards.
    pub async fn switch_symbol(&mut self, symbol: Symbol) -> Result<(), ChartError> {
        if symbol == self.subscription.symbol {
            return Ok(());
        }
        if self.subscription.status != ConnectionStatus::Connected {
            self.subscription.symbol = symbol;
            return Ok(());
        }
        let unsubscribe = SubscriptionRequest::unsubscribe(&self.subscription).to_json()?;
        self.subscription.symbol = symbol;
        let subscribe = SubscriptionRequest::subscribe(&self.subscription).to_json()?;
        let sent = match self.transport.send(unsubscribe).await {
            Ok(()) => self.transport.send(subscribe).await,
            Err(err) => Err(err),
        };
        if let Err(err) = sent {
            self.transport.close();
            self.set_status(ConnectionStatus::Disconnected);
            return Err(as_disconnect(err));
        }
        get_logger().info(
            LogComponent::Infrastructure("StreamConnectionManager"),
            &format!("switched subscription to {}", self.subscription.symbol),
        );
        Ok(())
    }

    /// Receive and route one frame. Returns `false` when the connection is gone.
    pub async fn pump(&mut self) -> bool {
        match self.transport.next_message().await {
            Some(Ok(text)) => {
                self.route(&text);
                true
            }
            Some(Err(err)) => {
                get_logger().warn(
                    LogComponent::Infrastructure("StreamConnectionManager"),
                    &format!("feed error: {err}"),
                );
                self.connection_lost();
                false
            }
            None => {
                self.connection_lost();
                false
            }
        }
    }

    /// Keep the connection alive until [`StreamCommand::Disconnect`] arrives
    /// or the command channel closes.
    ///
    /// Queued commands are applied before every connect attempt, so a
    /// disconnect issued during a backoff never reopens the socket.
    pub async fn run<S, Fut>(&mut self, mut commands: UnboundedReceiver<StreamCommand>, sleep: S)
    where
        S: Fn(Duration) -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            while let Some(command) = commands.next().now_or_never() {
                if !self.apply(command).await {
                    return;
                }
            }

            if self.subscription.status != ConnectionStatus::Connected {
                if let Err(err) = self.connect().await {
                    let delay = self.backoff.next_delay();
                    get_logger().warn(
                        LogComponent::Infrastructure("StreamConnectionManager"),
                        &format!("{err}; reconnecting in {}s", delay.as_secs()),
                    );
                    if !self.wait_for_retry(&mut commands, &sleep, delay).await {
                        return;
                    }
                    continue;
                }
            }

            let event = {
                let pump = self.pump();
                let next = commands.next();
                pin_mut!(pump, next);
                match select(pump, next).await {
                    Either::Left((alive, _)) => Either::Left(alive),
                    Either::Right((command, _)) => Either::Right(command),
                }
            };
            match event {
                Either::Left(true) => {}
                Either::Left(false) => {
                    let delay = self.backoff.next_delay();
                    get_logger().warn(
                        LogComponent::Infrastructure("StreamConnectionManager"),
                        &format!("connection lost; reconnecting in {}s", delay.as_secs()),
                    );
                    if !self.wait_for_retry(&mut commands, &sleep, delay).await {
                        return;
                    }
                }
                Either::Right(command) => {
                    if !self.apply(command).await {
                        return;
                    }
                }
            }
        }
    }

    /// Sleep out a backoff delay unless a command arrives first
    async fn wait_for_retry<S, Fut>(
        &mut self,
        commands: &mut UnboundedReceiver<StreamCommand>,
        sleep: &S,
        delay: Duration,
    ) -> bool
    where
        S: Fn(Duration) -> Fut,
        Fut: Future<Output = ()>,
    {
        let command = {
            let wait = sleep(delay);
            let next = commands.next();
            pin_mut!(wait, next);
            match select(wait, next).await {
                Either::Left(((), _)) => None,
                Either::Right((command, _)) => Some(command),
            }
        };
        match command {
            Some(command) => self.apply(command).await,
            None => true,
        }
    }

    /// Returns `false` when the run loop should stop
    async fn apply(&mut self, command: Option<StreamCommand>) -> bool {
        match command {
            Some(StreamCommand::SwitchSymbol(symbol)) => {
                if let Err(err) = self.switch_symbol(symbol).await {
                    get_logger().warn(
                        LogComponent::Infrastructure("StreamConnectionManager"),
                        &format!("symbol switch failed: {err}"),
                    );
                }
                true
            }
            Some(StreamCommand::Disconnect) | None => {
                self.disconnect().await;
                false
            }
        }
    }

    fn route(&mut self, text: &str) {
        let frame = match FeedFrame::parse(text) {
            Ok(frame) => frame,
            Err(err) => {
                get_logger().debug(
                    LogComponent::Infrastructure("StreamConnectionManager"),
                    &format!("dropping frame: {err}"),
                );
                return;
            }
        };
        if !self.subscription.includes(frame.channel) {
            return;
        }
        if let Some(handlers) = self.handlers.get_mut(&frame.channel) {
            for handler in handlers.iter_mut() {
                handler(&frame.payload);
            }
        }
    }

    fn connection_lost(&mut self) {
        self.transport.close();
        self.set_status(ConnectionStatus::Disconnected);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.subscription.status == status {
            return;
        }
        self.subscription.status = status;
        for handler in self.status_handlers.iter_mut() {
            handler(&self.subscription.symbol, status);
        }
    }
}

fn as_disconnect(err: ChartError) -> ChartError {
    match err {
        ChartError::StreamDisconnected(msg) => ChartError::StreamDisconnected(msg),
        other => ChartError::StreamDisconnected(other.to_string()),
    }
}
