//! ABI encoding of contract calls
//!
//! Arguments arrive as `(type, value)` string pairs and are encoded behind
//! the keccak selector of the function signature.
//!
//! ```rust
//! use evmsim_chain::abi::{encode_call, AbiArg};
//!
//! let data = encode_call("setNumber(uint256)", &[AbiArg::new("uint256", "7")]).unwrap();
//! assert_eq!(&data[..4], &[0x3f, 0xb5, 0xc1, 0xcb]);
//! ```

mod args;
mod encode;
mod types;

pub use args::{encode_call, AbiArg, RAW_DATA_SIGNATURE};
pub use encode::{encode, encode_function_call, function_selector, parse_type, signature_types};
pub use types::{ParamType, Token};
