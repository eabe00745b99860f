//! ABI encoding

use evmsim_primitives::U256;

use super::types::{ParamType, Token};
use crate::{ChainError, ChainResult};

/// Encode `tokens` as a parameter tuple of `types`
pub fn encode(types: &[ParamType], tokens: &[Token]) -> ChainResult<Vec<u8>> {
    if types.len() != tokens.len() {
        return Err(ChainError::Encoding(format!(
            "expected {} arguments, got {}",
            types.len(),
            tokens.len()
        )));
    }

    let head_size = types.iter().map(ParamType::head_length).sum::<usize>();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (param_type, token) in types.iter().zip(tokens) {
        let encoded = encode_token(param_type, token)?;
        if param_type.is_dynamic() {
            head.extend(encode_u256(&U256::from(head_size + tail.len())));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

/// Encode a function call: selector followed by the parameter tuple
pub fn encode_function_call(signature: &str, tokens: &[Token]) -> ChainResult<Vec<u8>> {
    let types = signature_types(signature)?;
    let mut data = function_selector(signature).to_vec();
    data.extend(encode(&types, tokens)?);
    Ok(data)
}

fn encode_token(param_type: &ParamType, token: &Token) -> ChainResult<Vec<u8>> {
    let encoded = match (param_type, token) {
        (ParamType::Address, Token::Address(address)) => {
            let mut buf = [0u8; 32];
            buf[12..].copy_from_slice(address.as_bytes());
            buf.to_vec()
        }
        (ParamType::Uint(bits), Token::Uint(value)) => {
            if value.bits() > *bits {
                return Err(too_large(param_type, value));
            }
            encode_u256(value)
        }
        (ParamType::Int(bits), Token::Int(value)) => {
            if !fits_signed(value, *bits) {
                return Err(too_large(param_type, value));
            }
            encode_u256(value)
        }
        (ParamType::Bool, Token::Bool(b)) => encode_u256(&U256::from(u8::from(*b))),
        (ParamType::FixedBytes(size), Token::FixedBytes(data)) => {
            if data.len() > *size {
                return Err(ChainError::Encoding(format!(
                    "{} bytes do not fit bytes{}",
                    data.len(),
                    size
                )));
            }
            let mut buf = [0u8; 32];
            buf[..data.len()].copy_from_slice(data);
            buf.to_vec()
        }
        (ParamType::Bytes, Token::Bytes(data)) => encode_bytes(data),
        (ParamType::String, Token::String(s)) => encode_bytes(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(tokens)) => {
            let mut result = encode_u256(&U256::from(tokens.len()));
            let inner_types = vec![(**inner).clone(); tokens.len()];
            result.extend(encode(&inner_types, tokens)?);
            result
        }
        (ParamType::FixedArray(inner, size), Token::FixedArray(tokens)) => {
            if tokens.len() != *size {
                return Err(ChainError::Encoding(format!(
                    "expected {} array elements, got {}",
                    size,
                    tokens.len()
                )));
            }
            let inner_types = vec![(**inner).clone(); tokens.len()];
            encode(&inner_types, tokens)?
        }
        _ => {
            return Err(ChainError::Encoding(format!(
                "{:?} does not match parameter type {:?}",
                token, param_type
            )))
        }
    };
    Ok(encoded)
}

fn too_large(param_type: &ParamType, value: &U256) -> ChainError {
    ChainError::Encoding(format!("value {} too large for {:?}", value, param_type))
}

/// Whether a two's complement word is representable in `bits` signed bits
fn fits_signed(value: &U256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }
    // all bits from bits-1 upward must equal the sign bit
    let upper = *value >> (bits - 1);
    upper.is_zero() || upper == (U256::MAX >> (bits - 1))
}

fn encode_u256(value: &U256) -> Vec<u8> {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes.to_vec()
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut result = encode_u256(&U256::from(data.len()));
    let padded_len = data.len().div_ceil(32) * 32;
    let mut padded = vec![0u8; padded_len];
    padded[..data.len()].copy_from_slice(data);
    result.extend(padded);
    result
}

/// Compute function selector (first 4 bytes of keccak256(signature))
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = evmsim_crypto::keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

/// Parameter types of a signature such as `transfer(address,uint256)`
pub fn signature_types(signature: &str) -> ChainResult<Vec<ParamType>> {
    let open = signature
        .find('(')
        .ok_or_else(|| ChainError::Encoding(format!("missing parameter list: {}", signature)))?;
    let inner = signature[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| ChainError::Encoding(format!("unterminated parameter list: {}", signature)))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner.split(',').map(parse_type).collect()
}

/// Parse a type string (e.g. "uint256", "address", "bytes32[2]")
pub fn parse_type(s: &str) -> ChainResult<ParamType> {
    let s = s.trim();

    if let Some(rest) = s.strip_suffix(']') {
        let open = rest
            .rfind('[')
            .ok_or_else(|| ChainError::Encoding(format!("Unknown type: {}", s)))?;
        let inner = Box::new(parse_type(&rest[..open])?);
        let size = &rest[open + 1..];
        if size.is_empty() {
            return Ok(ParamType::Array(inner));
        }
        let size = size
            .parse()
            .map_err(|_| ChainError::Encoding(format!("Invalid array size: {}", size)))?;
        return Ok(ParamType::FixedArray(inner, size));
    }

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        return Ok(ParamType::Uint(int_bits(rest)?));
    }
    if let Some(rest) = s.strip_prefix("int") {
        return Ok(ParamType::Int(int_bits(rest)?));
    }
    if let Some(rest) = s.strip_prefix("bytes") {
        let size: usize = rest
            .parse()
            .map_err(|_| ChainError::Encoding(format!("Invalid bytes size: {}", rest)))?;
        if !(1..=32).contains(&size) {
            return Err(ChainError::Encoding(format!("Invalid bytes size: {}", rest)));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(ChainError::Encoding(format!("Unknown type: {}", s)))
}

fn int_bits(rest: &str) -> ChainResult<usize> {
    if rest.is_empty() {
        return Ok(256);
    }
    let bits: usize = rest
        .parse()
        .map_err(|_| ChainError::Encoding(format!("Invalid integer size: {}", rest)))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(ChainError::Encoding(format!("Invalid integer size: {}", rest)));
    }
    Ok(bits)
}
