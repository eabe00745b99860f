//! Call arguments as typed by a user: `(type, value)` string pairs

use evmsim_primitives::{decode_hex, parse_word, Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::encode::{encode, function_selector, parse_type};
use super::types::{ParamType, Token};
use crate::{ChainError, ChainResult};

/// Signature that sends its single argument as raw hex call data
pub const RAW_DATA_SIGNATURE: &str = "rawdata(any)";

/// One call argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiArg {
    /// Solidity type, e.g. `uint256`
    #[serde(rename = "type")]
    pub kind: String,
    /// Parameter name, informational only
    #[serde(default)]
    pub name: String,
    /// Value as typed: a number, `0x` hex, `true`, a JSON list, ...
    pub value: String,
}

impl AbiArg {
    /// Unnamed argument
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: String::new(),
            value: value.into(),
        }
    }

    /// Parse the value according to the declared type
    pub fn to_token(&self) -> ChainResult<(ParamType, Token)> {
        let param_type = parse_type(&self.kind)?;
        let token = token_from_text(&param_type, &self.value)?;
        Ok((param_type, token))
    }
}

/// Call data for `signature` with `args`
///
/// [`RAW_DATA_SIGNATURE`] bypasses encoding and sends the first argument's hex value.
pub fn encode_call(signature: &str, args: &[AbiArg]) -> ChainResult<Vec<u8>> {
    if signature == RAW_DATA_SIGNATURE {
        let raw = args
            .first()
            .ok_or_else(|| ChainError::Encoding("rawdata(any) needs one argument".into()))?;
        return Ok(decode_hex(&raw.value)?);
    }

    let (types, tokens): (Vec<_>, Vec<_>) = args
        .iter()
        .map(AbiArg::to_token)
        .collect::<ChainResult<Vec<_>>>()?
        .into_iter()
        .unzip();
    let declared = super::encode::signature_types(signature)?;
    if declared != types {
        return Err(ChainError::Encoding(format!(
            "arguments {:?} do not match signature {}",
            types, signature
        )));
    }

    let mut data = function_selector(signature).to_vec();
    data.extend(encode(&types, &tokens)?);
    tracing::debug!(signature, len = data.len(), "encoded call data");
    Ok(data)
}

fn token_from_text(param_type: &ParamType, text: &str) -> ChainResult<Token> {
    match param_type {
        ParamType::Address => Ok(Token::Address(Address::from_hex(text.trim())?)),
        ParamType::Bool => Ok(Token::Bool(!matches!(
            text.trim(),
            "" | "0" | "false" | "False" | "F"
        ))),
        ParamType::String => match serde_json::from_str::<Value>(text) {
            Ok(Value::String(s)) => Ok(Token::String(s)),
            _ => Ok(Token::String(text.to_string())),
        },
        ParamType::Uint(_) | ParamType::Int(_) => {
            token_from_json(param_type, &Value::String(text.trim().to_string()))
        }
        _ => {
            let value: Value = serde_json::from_str(text.trim())
                .unwrap_or_else(|_| Value::String(text.trim().to_string()));
            token_from_json(param_type, &value)
        }
    }
}

fn token_from_json(param_type: &ParamType, value: &Value) -> ChainResult<Token> {
    match (param_type, value) {
        (ParamType::Array(inner), Value::Array(items)) => Ok(Token::Array(
            items
                .iter()
                .map(|item| token_from_json(inner, item))
                .collect::<ChainResult<_>>()?,
        )),
        (ParamType::FixedArray(inner, _), Value::Array(items)) => Ok(Token::FixedArray(
            items
                .iter()
                .map(|item| token_from_json(inner, item))
                .collect::<ChainResult<_>>()?,
        )),
        (ParamType::Uint(_), _) => Ok(Token::Uint(json_word(value)?)),
        (ParamType::Int(_), _) => Ok(Token::Int(json_signed(value)?)),
        (ParamType::FixedBytes(size), _) => Ok(Token::FixedBytes(json_bytes(value, *size)?)),
        (ParamType::Bytes, _) => Ok(Token::Bytes(json_bytes(value, 32)?)),
        (ParamType::Address, Value::String(s)) => Ok(Token::Address(Address::from_hex(s)?)),
        (ParamType::Bool, Value::Bool(b)) => Ok(Token::Bool(*b)),
        (ParamType::String, Value::String(s)) => Ok(Token::String(s.clone())),
        _ => Err(ChainError::Encoding(format!(
            "{} is not a valid {:?}",
            value, param_type
        ))),
    }
}

fn json_word(value: &Value) -> ChainResult<U256> {
    match value {
        Value::Number(n) => Ok(parse_word(&n.to_string())?),
        Value::String(s) => Ok(parse_word(s)?),
        _ => Err(ChainError::Validation(format!("not a number: {}", value))),
    }
}

fn json_signed(value: &Value) -> ChainResult<U256> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(ChainError::Validation(format!("not a number: {}", value))),
    };
    match text.strip_prefix('-') {
        Some(magnitude) => {
            let magnitude = parse_word(magnitude)?;
            Ok((!magnitude).overflowing_add(U256::one()).0)
        }
        None => Ok(parse_word(&text)?),
    }
}

/// Hex strings are taken verbatim; integers become `width` little-endian bytes
fn json_bytes(value: &Value, width: usize) -> ChainResult<Vec<u8>> {
    match value {
        Value::String(s) => Ok(decode_hex(s)?),
        Value::Number(_) => {
            let word = json_word(value)?;
            let mut le = [0u8; 32];
            word.to_little_endian(&mut le);
            if le[width.min(32)..].iter().any(|&b| b != 0) {
                return Err(ChainError::Encoding(format!("{} does not fit {} bytes", word, width)));
            }
            Ok(le[..width.min(32)].to_vec())
        }
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(json_bytes(item, width)?);
            }
            Ok(out)
        }
        _ => Err(ChainError::Encoding(format!("{} is not a byte value", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_falsy_spellings() {
        for text in ["", "0", "false", "False", "F"] {
            let (_, token) = AbiArg::new("bool", text).to_token().unwrap();
            assert_eq!(token, Token::Bool(false), "{:?}", text);
        }
        let (_, token) = AbiArg::new("bool", "yes").to_token().unwrap();
        assert_eq!(token, Token::Bool(true));
    }

    #[test]
    fn test_uint_decimal_and_hex() {
        let (_, token) = AbiArg::new("uint256", "42").to_token().unwrap();
        assert_eq!(token, Token::Uint(U256::from(42)));
        let (_, token) = AbiArg::new("uint256", "0x2a").to_token().unwrap();
        assert_eq!(token, Token::Uint(U256::from(42)));
    }

    #[test]
    fn test_uint_beyond_f64_precision() {
        let (_, token) = AbiArg::new("uint256", "100000000000000000000000000001").to_token().unwrap();
        assert_eq!(
            token,
            Token::Uint(U256::from_dec_str("100000000000000000000000000001").unwrap())
        );
    }

    #[test]
    fn test_negative_int() {
        let (_, token) = AbiArg::new("int8", "-1").to_token().unwrap();
        assert_eq!(token, Token::Int(U256::MAX));
    }

    #[test]
    fn test_fixed_bytes_from_integer_is_little_endian() {
        let (_, token) = AbiArg::new("bytes32", "65").to_token().unwrap();
        let mut expected = vec![0u8; 32];
        expected[0] = 65;
        assert_eq!(token, Token::FixedBytes(expected));
    }

    #[test]
    fn test_uint_array() {
        let (param_type, token) = AbiArg::new("uint8[]", "[1, 2, 3]").to_token().unwrap();
        assert_eq!(param_type, ParamType::Array(Box::new(ParamType::Uint(8))));
        assert_eq!(
            token,
            Token::Array(vec![
                Token::Uint(U256::from(1)),
                Token::Uint(U256::from(2)),
                Token::Uint(U256::from(3))
            ])
        );
    }

    #[test]
    fn test_bad_address_is_validation_error() {
        assert!(matches!(
            AbiArg::new("address", "0x12").to_token(),
            Err(ChainError::Validation(_))
        ));
    }

    #[test]
    fn test_encode_call() {
        let data = encode_call("setNumber(uint256)", &[AbiArg::new("uint256", "7")]).unwrap();
        assert_eq!(&data[..4], &[0x3f, 0xb5, 0xc1, 0xcb]);
        assert_eq!(data[35], 7);
    }

    #[test]
    fn test_encode_call_rejects_mismatched_arguments() {
        assert!(matches!(
            encode_call("setNumber(uint256)", &[AbiArg::new("bool", "1")]),
            Err(ChainError::Encoding(_))
        ));
        assert!(matches!(
            encode_call("setNumber(uint8)", &[AbiArg::new("uint8", "300")]),
            Err(ChainError::Encoding(_))
        ));
    }

    #[test]
    fn test_raw_data_bypass() {
        let data = encode_call(RAW_DATA_SIGNATURE, &[AbiArg::new("any", "0x0dbe671f")]).unwrap();
        assert_eq!(data, vec![0x0d, 0xbe, 0x67, 0x1f]);
    }

    #[test]
    fn test_arg_json_shape() {
        let arg: AbiArg = serde_json::from_str(r#"{"type":"uint256","name":"x","value":"3"}"#).unwrap();
        assert_eq!(arg.kind, "uint256");
        assert_eq!(arg.name, "x");
    }
}
