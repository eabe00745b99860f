//! Predicted effects checked against real execution

use evmsim_debugger::{
    predict, stack_effect_of, word_range, Component, FrameContext, Indices, SlotIndex, StackView,
};
use evmsim_evm::{Assembler, BlockEnv, Evm, Interpreter, Message, Opcode, StackValue, StepHook, TxEnv};
use evmsim_primitives::{Address, U256};
use evmsim_state::{StateWriter, WorldState};
use proptest::prelude::*;

fn contract() -> Address {
    Address::from_low_u64(0xC0DE)
}

/// One executed opcode: byte, prediction, stack before and after (top first)
struct Step {
    byte: u8,
    pre: Vec<U256>,
    post: Vec<U256>,
    stack_link: (Indices, Indices),
}

#[derive(Default)]
struct Recorder {
    pending: Option<Step>,
    steps: Vec<Step>,
    slots: SlotIndex,
}

fn top_first(frame: &Interpreter) -> Vec<U256> {
    StackView::new(frame.stack())
        .top_first()
        .iter()
        .map(StackValue::as_u256)
        .collect()
}

impl StepHook for Recorder {
    fn before_step(&mut self, frame: &Interpreter, _state: &WorldState) -> bool {
        let Some(byte) = frame.current_opcode() else {
            return true;
        };
        let context = FrameContext {
            address: frame.message().target,
            row: None,
            accounts: &[],
        };
        let prediction = predict(byte, &StackView::new(frame.stack()), &context, &mut self.slots);
        let link = prediction
            .chain
            .link(Component::Stack)
            .cloned()
            .expect("every opcode has a stack link");
        self.pending = Some(Step {
            byte,
            pre: top_first(frame),
            post: Vec::new(),
            stack_link: (link.pre, link.post),
        });
        true
    }

    fn after_step(&mut self, frame: &Interpreter, _state: &WorldState) {
        if let Some(mut step) = self.pending.take() {
            step.post = top_first(frame);
            self.steps.push(step);
        }
    }
}

/// Push `values` (the last one ends on top) then run `tail`
fn run(values: &[u64], tail: &[Opcode]) -> Vec<Step> {
    let mut asm = Assembler::new();
    for value in values {
        asm = asm.push(*value);
    }
    let code = asm.ops(tail).op(Opcode::STOP).build().unwrap();

    let mut state = WorldState::new();
    state.set_code(contract(), code);
    let mut recorder = Recorder::default();
    let mut evm = Evm::with_hook(&mut state, BlockEnv::default(), TxEnv::default(), &mut recorder);
    let result = evm.execute(Message::call(Address::ZERO, contract(), 0, Vec::new(), 1_000_000));
    assert!(result.is_success(), "{:?}", result.status);
    drop(evm);

    // drop the pushes and the final STOP
    let mut steps = recorder.steps;
    steps.drain(..values.len());
    steps.pop();
    steps
}

fn dup(n: usize) -> Opcode {
    Opcode::from_byte(Opcode::DUP1.as_byte() + n as u8 - 1).unwrap()
}

fn swap(n: usize) -> Opcode {
    Opcode::from_byte(Opcode::SWAP1.as_byte() + n as u8 - 1).unwrap()
}

/// Opcodes whose only effect is on the stack
const PURE: &[Opcode] = &[
    Opcode::ADD,
    Opcode::MUL,
    Opcode::SUB,
    Opcode::DIV,
    Opcode::SDIV,
    Opcode::MOD,
    Opcode::SMOD,
    Opcode::ADDMOD,
    Opcode::MULMOD,
    Opcode::EXP,
    Opcode::SIGNEXTEND,
    Opcode::LT,
    Opcode::GT,
    Opcode::SLT,
    Opcode::SGT,
    Opcode::EQ,
    Opcode::ISZERO,
    Opcode::AND,
    Opcode::OR,
    Opcode::XOR,
    Opcode::NOT,
    Opcode::BYTE,
    Opcode::SHL,
    Opcode::SHR,
    Opcode::SAR,
    Opcode::POP,
    Opcode::PC,
    Opcode::GAS,
    Opcode::ADDRESS,
    Opcode::CALLVALUE,
];

proptest! {
    /// Test DUPn: the item at n-1 is copied to the top and ends up at n
    #[test]
    fn dup_copies_predicted_position(values in prop::collection::vec(any::<u64>(), 16..20), n in 1usize..=16) {
        let steps = run(&values, &[dup(n)]);
        let step = &steps[0];
        prop_assert_eq!(step.byte, dup(n).as_byte());

        let (pre, post) = &step.stack_link;
        prop_assert_eq!(pre, &Indices::single(n - 1));
        prop_assert_eq!(post, &[0, n].into_iter().collect::<Indices>());

        let copied = step.pre[n - 1];
        prop_assert_eq!(step.post.len(), step.pre.len() + 1);
        prop_assert_eq!(step.post[0], copied);
        prop_assert_eq!(step.post[n], copied);
    }

    /// Test SWAPn twice restores the stack and touches only positions 0 and n
    #[test]
    fn swap_is_an_involution(values in prop::collection::vec(any::<u64>(), 17..20), n in 1usize..=16) {
        let steps = run(&values, &[swap(n), swap(n)]);
        let (first, second) = (&steps[0], &steps[1]);

        let (pre, post) = &first.stack_link;
        prop_assert_eq!(pre, post);
        prop_assert_eq!(pre, &[0, n].into_iter().collect::<Indices>());

        for position in 0..first.pre.len() {
            if position != 0 && position != n {
                prop_assert_eq!(first.post[position], first.pre[position]);
            }
        }
        prop_assert_eq!(first.post[0], first.pre[n]);
        prop_assert_eq!(&second.post, &first.pre);
    }

    /// Test that the stack grows by pushes minus pops
    #[test]
    fn stack_height_follows_effect_table(values in prop::collection::vec(any::<u64>(), 3..8), index in 0usize..PURE.len()) {
        let opcode = PURE[index];
        let steps = run(&values, &[opcode]);
        let step = &steps[0];
        let effect = stack_effect_of(opcode.as_byte()).unwrap();

        let height = step.post.len() as isize - step.pre.len() as isize;
        prop_assert_eq!(height, effect.delta());
        prop_assert_eq!(step.stack_link.0.len(), effect.pops);
        prop_assert_eq!(step.stack_link.1.len(), effect.pushes);
    }

    /// Test that a word range covers every byte it describes
    #[test]
    fn word_range_covers_bytes(offset in 0u64..10_000, length in 1u64..2_000) {
        let range = word_range(U256::from(offset), U256::from(length));
        let first = (offset / 32) as usize;
        let last = ((offset + length - 1) / 32) as usize;
        prop_assert!(range.contains(first));
        prop_assert!(range.contains(last));
        prop_assert!(range.len() >= (length as usize).div_ceil(32));
    }
}

/// Test that an empty byte range touches no word
#[test]
fn test_zero_length_range() {
    assert!(word_range(U256::from(64), U256::zero()).is_empty());
}
