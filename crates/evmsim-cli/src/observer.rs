//! Terminal observer: prints a session and feeds it step permits

use anyhow::Result;
use evmsim_debugger::{
    ChangeChain, DebugHandle, DebugMode, Event, EventStream, JobOutput, JobTicket, Notification,
};
use evmsim_primitives::bytes_to_hex;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// What the user asked for at the step prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepCommand {
    /// Run this many opcodes
    Step(u64),
    /// Run to the end
    Continue,
    /// Abort the session
    Quit,
}

/// Parse one prompt line; `None` when it is not a command
pub fn parse_command(line: &str) -> Option<StepCommand> {
    match line.trim() {
        "" | "s" | "step" => Some(StepCommand::Step(1)),
        "c" | "continue" => Some(StepCommand::Continue),
        "q" | "quit" | "abort" => Some(StepCommand::Quit),
        other => other.parse().ok().filter(|n| *n > 0).map(StepCommand::Step),
    }
}

/// One line per component: `stack {0..=1} -> {0}`
pub fn describe_chain(chain: &ChangeChain) -> String {
    chain
        .links()
        .iter()
        .filter(|link| !link.is_empty())
        .map(|link| format!("{} {} -> {}", link.component, link.pre, link.post))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Steps granted at the prompt and not yet announced
#[derive(Debug, Default)]
struct StepBudget {
    remaining: u64,
    /// No further prompts this job, after continue or quit
    finished: bool,
    /// Depth of the frame shown last
    depth: Option<usize>,
}

impl StepBudget {
    fn grant(&mut self, command: StepCommand) {
        match command {
            StepCommand::Step(count) => self.remaining = count,
            StepCommand::Continue | StepCommand::Quit => self.finished = true,
        }
    }

    /// Account for `event`; true when the granted steps are spent
    ///
    /// A frame shown again after its child returned does not ask, the
    /// post-step of the calling opcode follows it.
    fn observe(&mut self, event: &Event) -> bool {
        match event {
            Event::PreStep { .. } => {
                self.remaining = self.remaining.saturating_sub(1);
                false
            }
            Event::SessionInitialized { frame, .. } => {
                let entered = self.depth.map_or(true, |depth| frame.depth > depth);
                self.depth = Some(frame.depth);
                entered && self.exhausted()
            }
            Event::PostStep { .. } => self.exhausted(),
            _ => false,
        }
    }

    fn exhausted(&self) -> bool {
        !self.finished && self.remaining == 0
    }
}

/// Follows sessions on the event stream
pub struct Observer {
    handle: DebugHandle,
    mode: DebugMode,
    quiet: bool,
    input: Option<Lines<BufReader<Stdin>>>,
    budget: StepBudget,
    pending: Option<(&'static str, String)>,
}

impl Observer {
    /// Observer printing to stdout unless `quiet`
    pub fn new(handle: DebugHandle, mode: DebugMode, quiet: bool) -> Self {
        let input = (mode == DebugMode::Step).then(|| BufReader::new(tokio::io::stdin()).lines());
        Self {
            handle,
            mode,
            quiet,
            input,
            budget: StepBudget::default(),
            pending: None,
        }
    }

    /// Handle events until the job behind `ticket` finishes
    pub async fn follow(&mut self, events: &mut EventStream, ticket: JobTicket) -> Result<JobOutput> {
        self.budget = StepBudget::default();
        let wait = ticket.wait();
        tokio::pin!(wait);
        loop {
            tokio::select! {
                biased;
                Some(notification) = events.next() => self.handle(notification).await?,
                output = &mut wait => {
                    while let Some(notification) = events.try_next() {
                        self.handle(notification).await?;
                    }
                    return Ok(output?);
                }
            }
        }
    }

    async fn handle(&mut self, notification: Notification) -> Result<()> {
        let Notification { event, ack } = notification;
        tracing::trace!("observed {}", event.name());
        let wants_permit = self.mode == DebugMode::Step && self.budget.observe(&event);
        self.print(event);
        ack.ack();
        if wants_permit {
            self.next_permit().await?;
        }
        Ok(())
    }

    fn say(&self, line: String) {
        if !self.quiet {
            println!("{}", line);
        }
    }

    fn print(&mut self, event: Event) {
        match event {
            Event::SessionInitialized {
                code,
                disassembly,
                frame,
            } => {
                self.say(format!(
                    "== {} frame at depth {}: {} -> {} ({} bytes) ==",
                    frame.kind,
                    frame.depth,
                    frame.caller,
                    frame.target,
                    code.len()
                ));
                for instruction in disassembly {
                    self.say(format!("   {}", instruction));
                }
            }
            Event::ChangeChainReady { mnemonic, chain } => {
                self.pending = Some((mnemonic, describe_chain(&chain)));
            }
            Event::PreStep { gas_remaining, pc } => {
                let (mnemonic, effects) = self.pending.take().unwrap_or(("?", String::new()));
                self.say(format!("[{:#06x}] {:<14} gas={:<12} {}", pc, mnemonic, gas_remaining, effects));
            }
            Event::PostStep {
                stack,
                memory,
                gas_cost,
                ..
            } => {
                let items: Vec<String> = stack.iter().map(|value| value.to_hex()).collect();
                self.say(format!(
                    "         stack [{}] memory {} words, cost {}",
                    items.join(", "),
                    memory.len().div_ceil(32),
                    gas_cost
                ));
            }
            Event::StorageUpdated {
                address,
                slot,
                value,
                index,
            } => {
                self.say(format!("         storage[{}] {} = {} at {}", index, slot, value, address));
            }
            Event::ContractCreated(Some(address)) => self.say(format!("Contract created at {}", address)),
            Event::ContractCreated(None) => self.say("Contract creation failed".to_string()),
            Event::TransactionSent => self.say("Transaction mined".to_string()),
            Event::Result(output) => self.say(format!("Output: {}", bytes_to_hex(&output))),
            Event::Error(message) => {
                if !self.quiet {
                    eprintln!("Execution error: {}", message);
                }
            }
            Event::Completed => self.say("Execution completed".to_string()),
            Event::Aborted => self.say("Execution aborted".to_string()),
        }
    }

    /// Ask for more steps once the granted ones are spent
    async fn next_permit(&mut self) -> Result<()> {
        let command = self.prompt().await?;
        self.budget.grant(command);
        match command {
            StepCommand::Step(count) => self.handle.grant_steps(count),
            StepCommand::Continue => self.handle.grant_steps(u64::MAX),
            StepCommand::Quit => self.handle.abort(),
        }
        Ok(())
    }

    async fn prompt(&mut self) -> Result<StepCommand> {
        let Some(input) = self.input.as_mut() else {
            return Ok(StepCommand::Continue);
        };
        loop {
            eprint!("step [enter | N | c | q]> ");
            std::io::stderr().flush()?;
            let Some(line) = input.next_line().await? else {
                // end of input runs the session to completion
                return Ok(StepCommand::Continue);
            };
            match parse_command(&line) {
                Some(command) => return Ok(command),
                None => eprintln!("unknown command: {}", line.trim()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmsim_debugger::{ChangeLink, Component, FrameInfo, Indices};
    use evmsim_evm::CallKind;
    use evmsim_primitives::Address;

    fn shown(depth: usize) -> Event {
        Event::SessionInitialized {
            code: vec![0x00],
            disassembly: Vec::new(),
            frame: FrameInfo {
                kind: CallKind::Call,
                caller: Address::ZERO,
                target: Address::from_low_u64(depth as u64 + 1),
                code_address: Address::from_low_u64(depth as u64 + 1),
                value: 0,
                gas: 100_000,
                depth,
                data: Vec::new(),
            },
        }
    }

    fn pre() -> Event {
        Event::PreStep { gas_remaining: 100, pc: 0 }
    }

    fn post() -> Event {
        Event::PostStep {
            stack: Vec::new(),
            memory: Vec::new(),
            pc: 1,
            gas_cost: 3,
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(""), Some(StepCommand::Step(1)));
        assert_eq!(parse_command("  s "), Some(StepCommand::Step(1)));
        assert_eq!(parse_command("12"), Some(StepCommand::Step(12)));
        assert_eq!(parse_command("c"), Some(StepCommand::Continue));
        assert_eq!(parse_command("quit"), Some(StepCommand::Quit));
        assert_eq!(parse_command("0"), None);
        assert_eq!(parse_command("jump"), None);
    }

    #[test]
    fn test_describe_chain_skips_empty_links() {
        let mut chain = ChangeChain::new();
        chain.push(ChangeLink::new(Component::Opcodes, Indices::single(2), Indices::new()));
        chain.push(ChangeLink::new(Component::Stack, Indices::range(0, 1), Indices::new()));
        chain.push(ChangeLink::new(Component::Memory, Indices::new(), Indices::new()));
        assert_eq!(describe_chain(&chain), "opcodes {2} -> {}; stack {0..=1} -> {}");
    }

    /// Test that a grant of N steps asks again only after N post-steps
    #[test]
    fn test_budget_counts_down_granted_steps() {
        let mut budget = StepBudget::default();
        assert!(budget.observe(&shown(0)));
        budget.grant(StepCommand::Step(3));
        for _ in 0..2 {
            assert!(!budget.observe(&pre()));
            assert!(!budget.observe(&post()));
        }
        assert!(!budget.observe(&pre()));
        assert!(budget.observe(&post()));

        budget.grant(StepCommand::Continue);
        assert!(!budget.observe(&pre()));
        assert!(!budget.observe(&post()));
    }

    /// Test that a parent frame shown again after its child returns does not ask twice
    #[test]
    fn test_budget_across_nested_frame() {
        let mut budget = StepBudget::default();
        assert!(budget.observe(&shown(0)));
        budget.grant(StepCommand::Step(1));
        // the CALL spends the permit, the child asks for its own
        assert!(!budget.observe(&pre()));
        assert!(budget.observe(&shown(1)));
        budget.grant(StepCommand::Step(1));
        assert!(!budget.observe(&pre()));
        assert!(budget.observe(&post()));
        budget.grant(StepCommand::Step(1));

        // back in the parent the CALL post-step arrives with a permit left
        assert!(!budget.observe(&shown(0)));
        assert!(!budget.observe(&post()));
        assert!(!budget.observe(&pre()));
        assert!(budget.observe(&post()));

        // a second call from the same parent is a new frame
        budget.grant(StepCommand::Step(1));
        assert!(!budget.observe(&pre()));
        assert!(budget.observe(&shown(1)));
        budget.grant(StepCommand::Quit);
        assert!(!budget.observe(&post()));
    }
}
