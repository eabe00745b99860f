//! Single-worker job runner
//!
//! The worker thread owns the chain. Jobs are queued over a channel and run
//! strictly one after another, so at most one debugging session is ever in
//! flight. The observer drives the running session through a
//! [`DebugHandle`] and follows it on the [`EventStream`].

use crate::accessors::slot_key;
use crate::changes::History;
use crate::controller::StepController;
use crate::error::{DebugError, DebugResult};
use crate::events::{Event, EventStream, Publisher};
use crate::session::{SessionConfig, StepGate};
use crate::slots::SlotIndex;
use evmsim_chain::{AbiArg, EvmHandler};
use evmsim_evm::{ExecStatus, ExecutionResult};
use evmsim_primitives::{word_to_hex, Address, U256};
use evmsim_types::{Block, Receipt};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, oneshot};

/// Work for the worker thread
#[derive(Clone, Debug)]
pub enum Job {
    /// Transfer wei from the master account
    SendWei {
        /// Recipient
        to: Address,
        /// Amount
        value: u128,
    },
    /// Deploy a contract under a debugging session
    CreateContract {
        /// Init code
        init_code: Vec<u8>,
        /// Endowment
        value: u128,
    },
    /// Call a contract function under a debugging session
    CallFunction {
        /// Contract
        to: Address,
        /// Function signature, e.g. `setNumber(uint256)`
        signature: String,
        /// Arguments
        args: Vec<AbiArg>,
        /// Value sent along
        value: u128,
    },
    /// Overwrite a balance
    SetBalance {
        /// Account
        address: Address,
        /// New balance
        balance: u128,
    },
    /// Install code, at a fresh address when none is given
    SetCode {
        /// Runtime code
        code: Vec<u8>,
        /// Account
        address: Option<Address>,
    },
    /// Overwrite a storage slot
    SetStorage {
        /// Account
        address: Address,
        /// Slot
        slot: U256,
        /// New value
        value: U256,
    },
    /// Read a balance
    GetBalance(Address),
    /// Read code
    GetCode(Address),
    /// Read a storage slot
    GetStorageAt {
        /// Account
        address: Address,
        /// Slot
        slot: U256,
    },
    /// Number of the block being built
    GetBlockNumber,
    /// Slots of an account seen so far, in display order
    StorageSlots(Address),
}

impl Job {
    /// Short name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Job::SendWei { .. } => "send_wei",
            Job::CreateContract { .. } => "create_contract",
            Job::CallFunction { .. } => "call_contract_function",
            Job::SetBalance { .. } => "set_balance",
            Job::SetCode { .. } => "set_code",
            Job::SetStorage { .. } => "set_storage",
            Job::GetBalance(_) => "get_balance",
            Job::GetCode(_) => "get_code",
            Job::GetStorageAt { .. } => "get_storage_at",
            Job::GetBlockNumber => "get_block_number",
            Job::StorageSlots(_) => "storage_slots",
        }
    }
}

/// What a job produced
#[derive(Clone, Debug)]
pub enum JobOutput {
    /// Nothing beyond its side effects
    Done,
    /// An account address
    Address(Address),
    /// Created contract, `None` when the constructor failed
    Created(Option<Address>),
    /// Mined call
    Called {
        /// Block holding the transaction
        block: Box<Block>,
        /// Receipt
        receipt: Receipt,
        /// Execution outcome
        result: ExecutionResult,
    },
    /// Balance in wei
    Balance(u128),
    /// Bytecode
    Code(Vec<u8>),
    /// Storage value
    Storage(U256),
    /// Block number
    BlockNumber(u64),
    /// Slot keys
    Slots(Vec<String>),
}

/// Pending result of a submitted job
#[derive(Debug)]
pub struct JobTicket {
    rx: oneshot::Receiver<DebugResult<JobOutput>>,
}

impl JobTicket {
    /// Wait for the job to finish
    pub async fn wait(self) -> DebugResult<JobOutput> {
        self.rx.await.map_err(|_| DebugError::WorkerStopped)?
    }

    /// Wait from synchronous code
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime.
    pub fn blocking_wait(self) -> DebugResult<JobOutput> {
        self.rx.blocking_recv().map_err(|_| DebugError::WorkerStopped)?
    }
}

/// Control surface the observer uses while a session runs
#[derive(Clone, Debug)]
pub struct DebugHandle {
    gate: Arc<StepGate>,
}

impl DebugHandle {
    /// Allow `count` more opcodes in step mode
    ///
    /// Permits are discarded when a session starts; grant them once its
    /// first frame is shown.
    pub fn grant_steps(&self, count: u64) {
        self.gate.grant(count);
    }

    /// Cancel the running session
    pub fn abort(&self) {
        tracing::info!("Abort requested");
        self.gate.abort();
    }

    /// Whether the running session was cancelled
    pub fn is_aborted(&self) -> bool {
        self.gate.is_aborted()
    }
}

struct Request {
    job: Job,
    reply: oneshot::Sender<DebugResult<JobOutput>>,
}

/// Owner side of the worker thread
pub struct Debugger {
    jobs: mpsc::UnboundedSender<Request>,
    session: Arc<Mutex<SessionConfig>>,
    history: Arc<Mutex<History>>,
    gate: Arc<StepGate>,
    worker: thread::JoinHandle<()>,
}

impl Debugger {
    /// Move `handler` onto a new worker thread
    pub fn spawn(
        handler: EvmHandler,
        config: SessionConfig,
    ) -> DebugResult<(Debugger, DebugHandle, EventStream)> {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (publisher, events) = Publisher::channel();
        let session = Arc::new(Mutex::new(config));
        let history = Arc::new(Mutex::new(History::new()));
        let gate = Arc::new(StepGate::new());

        let worker = Worker {
            handler,
            slots: SlotIndex::new(),
            history: history.clone(),
            session: session.clone(),
            gate: gate.clone(),
            publisher,
            jobs: jobs_rx,
        };
        let join = thread::Builder::new()
            .name("evmsim-worker".into())
            .spawn(move || worker.run())?;

        let handle = DebugHandle { gate: gate.clone() };
        let debugger = Debugger {
            jobs: jobs_tx,
            session,
            history,
            gate,
            worker: join,
        };
        Ok((debugger, handle, events))
    }

    /// Queue a job
    pub fn submit(&self, job: Job) -> DebugResult<JobTicket> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Request { job, reply })
            .map_err(|_| DebugError::WorkerStopped)?;
        Ok(JobTicket { rx })
    }

    /// Session settings used by the next transaction
    pub fn set_session(&self, config: SessionConfig) {
        *self.session.lock() = config;
    }

    /// Current session settings
    pub fn session(&self) -> SessionConfig {
        self.session.lock().clone()
    }

    /// Steps recorded by the latest session
    ///
    /// Do not hold the guard while the session waits for an acknowledgment.
    pub fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock()
    }

    /// Another control handle
    pub fn handle(&self) -> DebugHandle {
        DebugHandle {
            gate: self.gate.clone(),
        }
    }

    /// Abort any session, let queued jobs drain and join the worker
    ///
    /// The observer must keep draining its [`EventStream`] (or drop it)
    /// until this returns.
    pub fn shutdown(self) -> DebugResult<()> {
        let Debugger {
            jobs, gate, worker, ..
        } = self;
        gate.abort();
        drop(jobs);
        worker.join().map_err(|_| DebugError::WorkerStopped)
    }
}

struct Worker {
    handler: EvmHandler,
    slots: SlotIndex,
    history: Arc<Mutex<History>>,
    session: Arc<Mutex<SessionConfig>>,
    gate: Arc<StepGate>,
    publisher: Publisher,
    jobs: mpsc::UnboundedReceiver<Request>,
}

impl Worker {
    fn run(mut self) {
        tracing::info!("Debug worker started");
        while let Some(Request { job, reply }) = self.jobs.blocking_recv() {
            tracing::debug!("Running job {}", job.name());
            let outcome = self.execute(job);
            if let Err(e) = &outcome {
                tracing::warn!("Job failed: {}", e);
                self.publisher.notify(Event::Error(e.to_string()));
            }
            if reply.send(outcome).is_err() {
                tracing::trace!("job ticket dropped");
            }
        }
        tracing::info!("Debug worker stopped");
    }

    fn execute(&mut self, job: Job) -> DebugResult<JobOutput> {
        let output = match job {
            Job::SendWei { to, value } => {
                let to = self.handler.send_wei(to, value)?;
                self.publisher.notify(Event::TransactionSent);
                JobOutput::Address(to)
            }
            Job::CreateContract { init_code, value } => {
                let config = self.begin_session();
                let accounts = self.accounts();
                let mut controller = StepController::new(
                    config,
                    &self.gate,
                    &self.publisher,
                    &mut self.slots,
                    &self.history,
                    accounts,
                );
                let created = self.handler.create_contract(&init_code, value, &mut controller);
                controller.halt();
                let aborted = controller.was_aborted();
                let created = created?;

                if !aborted {
                    if let Some(result) = self.handler.last_result() {
                        report_failure(&self.publisher, result);
                    }
                }
                self.publisher.notify(Event::ContractCreated(created));
                self.publisher.notify(Event::TransactionSent);
                if !aborted {
                    self.publisher.notify(Event::Completed);
                }
                JobOutput::Created(created)
            }
            Job::CallFunction {
                to,
                signature,
                args,
                value,
            } => {
                let config = self.begin_session();
                let accounts = self.accounts();
                let mut controller = StepController::new(
                    config,
                    &self.gate,
                    &self.publisher,
                    &mut self.slots,
                    &self.history,
                    accounts,
                );
                let called =
                    self.handler
                        .call_contract_function(to, &signature, &args, value, &mut controller);
                controller.halt();
                let aborted = controller.was_aborted();
                let (block, receipt, result) = called?;

                if !aborted {
                    report_failure(&self.publisher, &result);
                    self.publisher.notify(Event::Result(result.output.clone()));
                }
                self.publisher.notify(Event::TransactionSent);
                if !aborted {
                    self.publisher.notify(Event::Completed);
                }
                JobOutput::Called {
                    block: Box::new(block),
                    receipt,
                    result,
                }
            }
            Job::SetBalance { address, balance } => {
                self.handler.set_balance(address, balance);
                JobOutput::Done
            }
            Job::SetCode { code, address } => JobOutput::Address(self.handler.set_code(code, address)),
            Job::SetStorage {
                address,
                slot,
                value,
            } => {
                self.handler.set_storage(address, slot, value);
                let (index, _) = self.slots.register(address, &slot);
                self.publisher.notify(Event::StorageUpdated {
                    address,
                    slot: slot_key(&slot),
                    value: word_to_hex(&value),
                    index,
                });
                JobOutput::Done
            }
            Job::GetBalance(address) => JobOutput::Balance(self.handler.get_balance(&address)),
            Job::GetCode(address) => JobOutput::Code(self.handler.get_code(&address)),
            Job::GetStorageAt { address, slot } => {
                JobOutput::Storage(self.handler.get_storage_at(&address, slot))
            }
            Job::GetBlockNumber => JobOutput::BlockNumber(self.handler.get_block_number()),
            Job::StorageSlots(address) => JobOutput::Slots(self.slots.slots(&address).to_vec()),
        };
        Ok(output)
    }

    /// Clear per-session state and read the settings for a new transaction
    fn begin_session(&mut self) -> SessionConfig {
        self.gate.reset();
        self.history.lock().reset();
        let config = self.session.lock().clone();
        tracing::debug!("Session started: mode={:?}", config.mode);
        config
    }

    /// Known accounts, sorted
    fn accounts(&self) -> Vec<Address> {
        self.handler.used_addresses().iter().copied().collect()
    }
}

fn report_failure(publisher: &Publisher, result: &ExecutionResult) {
    match &result.status {
        ExecStatus::Fault(e) => publisher.notify(Event::Error(e.to_string())),
        ExecStatus::Revert => publisher.notify(Event::Error("execution reverted".into())),
        ExecStatus::Success | ExecStatus::Aborted => {}
    }
}
