use crate::domain::errors::ChartError;
use crate::domain::market_data::{Channel, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

/// Outbound control frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub action: SubscriptionAction,
    pub symbol: String,
    pub channels: Vec<Channel>,
}

impl SubscriptionRequest {
    pub fn subscribe(subscription: &Subscription) -> Self {
        Self::build(SubscriptionAction::Subscribe, subscription)
    }

    pub fn unsubscribe(subscription: &Subscription) -> Self {
        Self::build(SubscriptionAction::Unsubscribe, subscription)
    }

    fn build(action: SubscriptionAction, subscription: &Subscription) -> Self {
        Self {
            action,
            symbol: subscription.symbol.value().to_string(),
            channels: subscription.channels.iter().copied().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, ChartError> {
        serde_json::to_string(self).map_err(|e| ChartError::InvalidInput(format!("subscription frame: {e}")))
    }
}

/// Inbound data frame, split into its channel and the raw payload.
///
/// The payload stays untyped: validation belongs to the tick normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFrame {
    pub channel: Channel,
    pub payload: Value,
}

impl FeedFrame {
    pub fn parse(text: &str) -> Result<Self, ChartError> {
        let payload: Value =
            serde_json::from_str(text).map_err(|e| ChartError::MalformedTick(format!("not JSON: {e}")))?;
        let channel = payload
            .get("channel")
            .and_then(Value::as_str)
            .ok_or_else(|| ChartError::MalformedTick("missing channel".to_string()))?
            .parse::<Channel>()
            .map_err(|_| ChartError::MalformedTick("unknown channel".to_string()))?;
        Ok(Self { channel, payload })
    }
}
