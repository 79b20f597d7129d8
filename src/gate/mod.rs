//! Per-message participation decision.
//!
//! [`classify`] is a pure function of the message facts, the gate config and
//! one percentage roll. [`ResponseGate`] owns the random source and rolls
//! exactly once per message before delegating to it.

pub mod rng;

use crate::channels::InboundMessage;
use crate::config::GateConfig;
use std::sync::{Mutex, PoisonError};

pub use rng::{FixedRoll, RandomSource, SeededRandom, ThreadRandom};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum GateDecision {
    Engage,
    LogOnly,
    Ignore,
}

/// What the gate needs to know about a message.
#[derive(Debug, Clone, Copy)]
pub struct MessageFacts<'a> {
    pub from_self: bool,
    pub is_command: bool,
    pub is_system: bool,
    pub mentions_bot: bool,
    pub channel_id: &'a str,
}

impl<'a> MessageFacts<'a> {
    pub fn from_message(message: &'a InboundMessage, self_id: &str, command_prefix: &str) -> Self {
        Self {
            from_self: !self_id.is_empty() && message.author_id == self_id,
            is_command: !command_prefix.is_empty() && message.content.starts_with(command_prefix),
            is_system: message.is_system,
            mentions_bot: !self_id.is_empty() && message.mentions_user(self_id),
            channel_id: &message.channel_id,
        }
    }
}

/// A roll succeeds when `roll >= 100 - percentage`; with `roll` uniform over
/// `0..100` that is a `percentage / 100` chance.
pub fn roll_succeeds(roll: u8, percentage: u8) -> bool {
    u16::from(roll) >= 100_u16.saturating_sub(u16::from(percentage))
}

pub fn classify(facts: &MessageFacts<'_>, config: &GateConfig, roll: u8) -> GateDecision {
    if facts.from_self || facts.is_command || facts.is_system {
        return GateDecision::Ignore;
    }

    let random_hit = config.random_respond && roll_succeeds(roll, config.random_respond_percentage);
    let triggered = facts.mentions_bot || !config.requires_mention || random_hit;

    if triggered {
        if config.limit_channels && !config.is_channel_allowed(facts.channel_id) {
            GateDecision::Ignore
        } else {
            GateDecision::Engage
        }
    } else if config.log_all_messages {
        GateDecision::LogOnly
    } else {
        GateDecision::Ignore
    }
}

pub struct ResponseGate {
    config: GateConfig,
    random: Mutex<Box<dyn RandomSource>>,
}

impl ResponseGate {
    pub fn new(config: GateConfig, random: Box<dyn RandomSource>) -> Self {
        Self {
            config,
            random: Mutex::new(random),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn decide(&self, facts: &MessageFacts<'_>) -> GateDecision {
        let roll = self
            .random
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .roll_percent();
        let decision = classify(facts, &self.config, roll);
        tracing::debug!(channel = %facts.channel_id, roll, %decision, "gate decision");
        decision
    }
}
