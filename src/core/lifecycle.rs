//! Conversation status state machine.

use crate::infrastructure::entities::ConversationStatus;

/// Events that can move a conversation between `open`, `handoff` and `closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTrigger {
    /// Webhook carried a message written by a human agent in the CRM.
    HumanOutboundObserved,
    /// Webhook carried any other message.
    MessageObserved,
    /// An agent answered from the console.
    AgentReplied,
    Close,
    Reopen,
    Handoff,
}

impl StatusTrigger {
    /// Resulting status when the trigger hits a conversation in `current`.
    ///
    /// Re-applying a trigger to its own result is a no-op.
    pub fn apply(self, current: ConversationStatus) -> ConversationStatus {
        use ConversationStatus::*;

        match (self, current) {
            (StatusTrigger::HumanOutboundObserved | StatusTrigger::AgentReplied, _) => Handoff,
            (StatusTrigger::MessageObserved, status) => status,
            (StatusTrigger::Close, _) => Closed,
            (StatusTrigger::Reopen, Handoff | Closed) => Open,
            (StatusTrigger::Reopen, Open) => Open,
            (StatusTrigger::Handoff, Open) => Handoff,
            (StatusTrigger::Handoff, status) => status,
        }
    }

    /// Statuses the trigger moves a conversation out of, and the status it moves it to.
    ///
    /// Any other current status is left as is. `None` for triggers that never change status.
    pub fn transition(self) -> Option<(&'static [ConversationStatus], ConversationStatus)> {
        use ConversationStatus::*;

        match self {
            StatusTrigger::HumanOutboundObserved | StatusTrigger::AgentReplied => {
                Some((&[Open, Closed], Handoff))
            }
            StatusTrigger::MessageObserved => None,
            StatusTrigger::Close => Some((&[Open, Handoff], Closed)),
            StatusTrigger::Reopen => Some((&[Handoff, Closed], Open)),
            StatusTrigger::Handoff => Some((&[Open], Handoff)),
        }
    }

    /// Status to write without reading the current one, for triggers whose result does
    /// not depend on it. `None` means the stored status must be left alone.
    pub fn unconditional(self) -> Option<ConversationStatus> {
        match self {
            StatusTrigger::HumanOutboundObserved | StatusTrigger::AgentReplied => {
                Some(ConversationStatus::Handoff)
            }
            StatusTrigger::Close => Some(ConversationStatus::Closed),
            StatusTrigger::MessageObserved | StatusTrigger::Reopen | StatusTrigger::Handoff => None,
        }
    }
}
