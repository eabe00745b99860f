//! Notifications from the executor to the observer
//!
//! Every notification travels over one unbounded channel, so the observer
//! sees them in the order they were published. Blocking notifications carry
//! an [`Ack`]; the executor waits until it is acknowledged or dropped.

use crate::changes::ChangeChain;
use evmsim_evm::{CallKind, Instruction, Interpreter, StackValue};
use evmsim_primitives::Address;
use tokio::sync::{mpsc, oneshot};

/// Message of the frame a session shows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// Frame kind
    pub kind: CallKind,
    /// Sender
    pub caller: Address,
    /// Account whose storage is used
    pub target: Address,
    /// Account whose code runs
    pub code_address: Address,
    /// Value in wei
    pub value: u128,
    /// Gas available
    pub gas: u64,
    /// Call depth, 0 for the transaction frame
    pub depth: usize,
    /// Call data; empty for creations, whose init code is the bytecode
    pub data: Vec<u8>,
}

impl FrameInfo {
    pub(crate) fn of(frame: &Interpreter) -> Self {
        let message = frame.message();
        Self {
            kind: message.kind,
            caller: message.caller,
            target: message.target,
            code_address: message.code_address,
            value: message.value,
            gas: message.gas,
            depth: message.depth,
            data: message.data.clone(),
        }
    }
}

/// What happened
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A frame's code is now shown; blocking
    SessionInitialized {
        /// Bytecode
        code: Vec<u8>,
        /// Disassembly rows
        disassembly: Vec<Instruction>,
        /// Frame message
        frame: FrameInfo,
    },
    /// Effects of the next opcode
    ChangeChainReady {
        /// Opcode mnemonic
        mnemonic: &'static str,
        /// Ordered effects
        chain: ChangeChain,
    },
    /// The next opcode is about to execute; blocking
    PreStep {
        /// Gas left in the frame
        gas_remaining: u64,
        /// Program counter
        pc: usize,
    },
    /// The opcode executed; blocking
    PostStep {
        /// Stack, top first
        stack: Vec<StackValue>,
        /// Memory bytes
        memory: Vec<u8>,
        /// Program counter after execution
        pc: usize,
        /// Gas charged for the opcode
        gas_cost: u64,
    },
    /// A storage slot was registered or written; blocking while debugging
    StorageUpdated {
        /// Account
        address: Address,
        /// Slot as even-length hex
        slot: String,
        /// Value as even-length hex
        value: String,
        /// Display index of the slot
        index: usize,
    },
    /// A creation finished: the new address, `None` on failure
    ContractCreated(Option<Address>),
    /// A transaction was applied and mined
    TransactionSent,
    /// Execution ran to its end
    Completed,
    /// Execution was cancelled by the observer
    Aborted,
    /// A job failed or execution faulted
    Error(String),
    /// Output of a call
    Result(Vec<u8>),
}

impl Event {
    /// Short name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionInitialized { .. } => "session-initialized",
            Event::ChangeChainReady { .. } => "change-chain-ready",
            Event::PreStep { .. } => "pre-step",
            Event::PostStep { .. } => "post-step",
            Event::StorageUpdated { .. } => "storage-updated",
            Event::ContractCreated(_) => "contract-created",
            Event::TransactionSent => "transaction-sent",
            Event::Completed => "completed",
            Event::Aborted => "aborted",
            Event::Error(_) => "error",
            Event::Result(_) => "result",
        }
    }
}

/// Acknowledgment the executor waits for
///
/// Dropping an `Ack` acknowledges it too.
#[derive(Debug)]
pub struct Ack(Option<oneshot::Sender<()>>);

impl Ack {
    fn none() -> Self {
        Self(None)
    }

    /// Whether the executor is waiting on this acknowledgment
    pub fn is_required(&self) -> bool {
        self.0.is_some()
    }

    /// Release the executor
    pub fn ack(self) {
        if let Some(tx) = self.0 {
            let _ = tx.send(());
        }
    }
}

/// An event together with its acknowledgment
#[derive(Debug)]
pub struct Notification {
    /// What happened
    pub event: Event,
    /// Acknowledgment, a no-op for non-blocking events
    pub ack: Ack,
}

impl Notification {
    /// Acknowledge and return the event
    pub fn into_event(self) -> Event {
        self.ack.ack();
        self.event
    }
}

/// Observer end of the notification channel
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl EventStream {
    /// Next notification; `None` once the worker has stopped
    pub async fn next(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Next notification from synchronous code
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime.
    pub fn blocking_next(&mut self) -> Option<Notification> {
        self.rx.blocking_recv()
    }

    /// Next notification if one is queued
    pub fn try_next(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

/// Executor end of the notification channel
#[derive(Clone, Debug)]
pub(crate) struct Publisher {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Publisher {
    pub(crate) fn channel() -> (Publisher, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Publisher { tx }, EventStream { rx })
    }

    /// Publish without waiting
    pub(crate) fn notify(&self, event: Event) {
        tracing::trace!("notify {}", event.name());
        let notification = Notification {
            event,
            ack: Ack::none(),
        };
        if self.tx.send(notification).is_err() {
            tracing::trace!("observer gone, notification dropped");
        }
    }

    /// Publish and block until the observer acknowledges
    pub(crate) fn rendezvous(&self, event: Event) {
        tracing::trace!("rendezvous {}", event.name());
        let (ack_tx, ack_rx) = oneshot::channel();
        let notification = Notification {
            event,
            ack: Ack(Some(ack_tx)),
        };
        if self.tx.send(notification).is_err() {
            tracing::trace!("observer gone, rendezvous skipped");
            return;
        }
        // a dropped Ack counts as acknowledged
        let _ = ack_rx.blocking_recv();
    }
}
