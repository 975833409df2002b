//! Special marker inspection of fragment payloads.
//!
//! Every fragment long enough to carry a message header starts with a
//! little-endian `u32` message code. Inspectors are registered per message
//! code (or for every code) and report a deduplication key when they
//! recognize something worth surfacing.

use crate::core::config::InspectConfig;
use crate::core::types::{format_opcode, SpecialHit};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Fragments of this length or shorter cannot hold a dispatchable message.
pub const MIN_FRAGMENT_LEN: usize = 20;

/// Message code of game event envelopes.
pub const GAME_EVENT_MESSAGE: u32 = 0xF7B0;

/// Split a fragment into its message code and the bytes that follow it.
///
/// Returns `None` for fragments of [`MIN_FRAGMENT_LEN`] bytes or fewer.
pub fn split_message(fragment: &[u8]) -> Option<(u32, &[u8])> {
    if fragment.len() <= MIN_FRAGMENT_LEN {
        return None;
    }
    let (code, body) = fragment.split_at(4);
    Some((read_u32(code)?, body))
}

fn read_u32(bytes: &[u8]) -> Option<u32> {
    let word: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(word))
}

/// Recognizes special markers inside a message body.
pub trait OpcodeInspector: Send + Sync {
    /// Inspect one message. `payload` starts right after the message code.
    fn inspect(&self, message_code: u32, payload: &[u8]) -> Option<SpecialHit>;
}

impl<F> OpcodeInspector for F
where
    F: Fn(u32, &[u8]) -> Option<SpecialHit> + Send + Sync,
{
    fn inspect(&self, message_code: u32, payload: &[u8]) -> Option<SpecialHit> {
        self(message_code, payload)
    }
}

/// Inspectors registered by message code.
#[derive(Clone, Default)]
pub struct InspectorSet {
    by_code: HashMap<u32, Vec<Arc<dyn OpcodeInspector>>>,
    any_code: Vec<Arc<dyn OpcodeInspector>>,
}

impl std::fmt::Debug for InspectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<_> = self.by_code.keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("InspectorSet")
            .field("codes", &codes)
            .field("any_code", &self.any_code.len())
            .finish()
    }
}

impl InspectorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the built-in inspectors selected in configuration.
    pub fn from_config(config: &InspectConfig) -> Self {
        let mut set = Self::new();
        if config.message_census {
            set.register_any(MessageCensus);
        }
        if !config.game_events.is_empty() {
            set.register(
                GAME_EVENT_MESSAGE,
                GameEventInspector::new(config.game_events.iter().copied()),
            );
        }
        set
    }

    /// Register an inspector for one message code.
    pub fn register(&mut self, message_code: u32, inspector: impl OpcodeInspector + 'static) {
        self.by_code
            .entry(message_code)
            .or_default()
            .push(Arc::new(inspector));
    }

    /// Register an inspector that sees every message.
    pub fn register_any(&mut self, inspector: impl OpcodeInspector + 'static) {
        self.any_code.push(Arc::new(inspector));
    }

    /// Whether no inspector is registered.
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty() && self.any_code.is_empty()
    }

    /// Run every matching inspector over one fragment.
    pub fn inspect_fragment(&self, fragment: &[u8], mut report: impl FnMut(SpecialHit)) {
        if self.is_empty() {
            return;
        }
        let Some((code, payload)) = split_message(fragment) else {
            return;
        };

        let keyed = self.by_code.get(&code).into_iter().flatten();
        for inspector in keyed.chain(self.any_code.iter()) {
            if let Some(hit) = inspector.inspect(code, payload) {
                report(hit);
            }
        }
    }
}

/// Reports every distinct message code observed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCensus;

impl OpcodeInspector for MessageCensus {
    fn inspect(&self, message_code: u32, _payload: &[u8]) -> Option<SpecialHit> {
        Some(format_opcode(message_code))
    }
}

/// Reports selected event codes carried by game event envelopes.
///
/// The envelope body is `character: u32, sequence: u32, event: u32`, all
/// little-endian, followed by the event payload.
#[derive(Debug, Clone, Default)]
pub struct GameEventInspector {
    events: BTreeSet<u32>,
}

impl GameEventInspector {
    /// Watch for the given event codes.
    pub fn new(events: impl IntoIterator<Item = u32>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl OpcodeInspector for GameEventInspector {
    fn inspect(&self, message_code: u32, payload: &[u8]) -> Option<SpecialHit> {
        if message_code != GAME_EVENT_MESSAGE {
            return None;
        }
        let event = read_u32(payload.get(8..12)?)?;
        self.events.contains(&event).then(|| {
            format!("{} {}", format_opcode(message_code), format_opcode(event))
        })
    }
}
