//! # ABI Word Codec
//!
//! Just enough of the Solidity ABI for the ERC-20 interface: static
//! arguments only, every argument one 32-byte word.

use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::PrecompileError;

/// Size of an ABI word.
pub const WORD: usize = 32;

/// ERC-20 method selectors.
pub mod selectors {
    /// `transfer(address,uint256)`
    pub const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
    /// `transferFrom(address,address,uint256)`
    pub const TRANSFER_FROM: [u8; 4] = [0x23, 0xb8, 0x72, 0xdd];
    /// `approve(address,uint256)`
    pub const APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
    /// `allowance(address,address)`
    pub const ALLOWANCE: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];
    /// `balanceOf(address)`
    pub const BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
    /// `totalSupply()`
    pub const TOTAL_SUPPLY: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd];
    /// `increaseAllowance(address,uint256)`
    pub const INCREASE_ALLOWANCE: [u8; 4] = [0x39, 0x50, 0x93, 0x51];
    /// `decreaseAllowance(address,uint256)`
    pub const DECREASE_ALLOWANCE: [u8; 4] = [0xa4, 0x57, 0xc2, 0xd7];
}

/// Topic of `Transfer(address,address,uint256)`.
#[must_use]
pub fn transfer_event_topic() -> Hash {
    keccak256(b"Transfer(address,address,uint256)")
}

/// Topic of `Approval(address,address,uint256)`.
#[must_use]
pub fn approval_event_topic() -> Hash {
    keccak256(b"Approval(address,address,uint256)")
}

/// Splits calldata into its selector and argument bytes.
///
/// # Errors
///
/// [`PrecompileError::InvalidInput`] when shorter than a selector.
pub fn split_selector(input: &[u8]) -> Result<([u8; 4], &[u8]), PrecompileError> {
    if input.len() < 4 {
        return Err(PrecompileError::InvalidInput(format!(
            "calldata of {} bytes has no selector",
            input.len()
        )));
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&input[..4]);
    Ok((selector, &input[4..]))
}

/// Cursor over ABI-encoded static arguments.
pub struct ArgReader<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ArgReader<'a> {
    /// Expects exactly `count` words of arguments.
    ///
    /// # Errors
    ///
    /// [`PrecompileError::InvalidInput`] on a length mismatch.
    pub fn new(data: &'a [u8], count: usize) -> Result<Self, PrecompileError> {
        if data.len() != count * WORD {
            return Err(PrecompileError::InvalidInput(format!(
                "expected {count} arguments, got {} bytes",
                data.len()
            )));
        }
        Ok(Self { data, index: 0 })
    }

    fn next_word(&mut self) -> Result<&'a [u8], PrecompileError> {
        let start = self.index * WORD;
        let word = self
            .data
            .get(start..start + WORD)
            .ok_or_else(|| PrecompileError::InvalidInput("missing argument".into()))?;
        self.index += 1;
        Ok(word)
    }

    /// Reads an `address`. The 12 padding bytes must be zero.
    ///
    /// # Errors
    ///
    /// [`PrecompileError::InvalidInput`] on dirty padding.
    pub fn address(&mut self) -> Result<Address, PrecompileError> {
        let word = self.next_word()?;
        if word[..12].iter().any(|&b| b != 0) {
            return Err(PrecompileError::InvalidInput(format!(
                "argument {} is not an address",
                self.index - 1
            )));
        }
        Address::from_slice(&word[12..])
            .ok_or_else(|| PrecompileError::InvalidInput("bad address".into()))
    }

    /// Reads a `uint256`.
    ///
    /// # Errors
    ///
    /// [`PrecompileError::InvalidInput`] when out of arguments.
    pub fn uint(&mut self) -> Result<U256, PrecompileError> {
        Ok(U256::from_big_endian(self.next_word()?))
    }
}

/// Encodes a `uint256` return value.
#[must_use]
pub fn encode_uint(value: U256) -> Vec<u8> {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word.to_vec()
}

/// Encodes a `bool` return value.
#[must_use]
pub fn encode_bool(value: bool) -> Vec<u8> {
    encode_uint(U256::from(u8::from(value)))
}

/// Selector of `Error(string)`, the standard revert reason.
pub const REVERT_REASON_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Encodes `Error(reason)` revert data.
#[must_use]
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    let bytes = reason.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(4 + 2 * WORD + padded);
    out.extend_from_slice(&REVERT_REASON_SELECTOR);
    out.extend_from_slice(&uint_word(U256::from(WORD)));
    out.extend_from_slice(&uint_word(U256::from(bytes.len())));
    out.extend_from_slice(bytes);
    out.resize(4 + 2 * WORD + padded, 0);
    out
}

/// Encodes a call from its selector and static arguments.
#[must_use]
pub fn encode_call(selector: [u8; 4], args: &[[u8; WORD]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + args.len() * WORD);
    out.extend_from_slice(&selector);
    for arg in args {
        out.extend_from_slice(arg);
    }
    out
}

/// `uint256` argument word.
#[must_use]
pub fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::selector;

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(selectors::TRANSFER, selector("transfer(address,uint256)"));
        assert_eq!(
            selectors::TRANSFER_FROM,
            selector("transferFrom(address,address,uint256)")
        );
        assert_eq!(selectors::APPROVE, selector("approve(address,uint256)"));
        assert_eq!(selectors::ALLOWANCE, selector("allowance(address,address)"));
        assert_eq!(selectors::BALANCE_OF, selector("balanceOf(address)"));
        assert_eq!(selectors::TOTAL_SUPPLY, selector("totalSupply()"));
        assert_eq!(
            selectors::INCREASE_ALLOWANCE,
            selector("increaseAllowance(address,uint256)")
        );
        assert_eq!(
            selectors::DECREASE_ALLOWANCE,
            selector("decreaseAllowance(address,uint256)")
        );
    }

    #[test]
    fn test_event_topics() {
        assert_eq!(
            hex::encode(transfer_event_topic().0),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(
            hex::encode(approval_event_topic().0),
            "8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"
        );
    }

    #[test]
    fn test_reader_decodes_transfer_args() {
        let to = Address::from_low_u64(0xbeef);
        let input = encode_call(
            selectors::TRANSFER,
            &[to.to_word(), uint_word(U256::from(500))],
        );
        let (sel, args) = split_selector(&input).unwrap();
        assert_eq!(sel, selectors::TRANSFER);

        let mut reader = ArgReader::new(args, 2).unwrap();
        assert_eq!(reader.address().unwrap(), to);
        assert_eq!(reader.uint().unwrap(), U256::from(500));
    }

    #[test]
    fn test_reader_rejects_bad_input() {
        assert!(split_selector(&[0xa9, 0x05]).is_err());
        assert!(ArgReader::new(&[0u8; 33], 1).is_err());

        let mut dirty = [0u8; 32];
        dirty[0] = 1;
        let mut reader = ArgReader::new(&dirty, 1).unwrap();
        assert!(matches!(reader.address(), Err(PrecompileError::InvalidInput(_))));
    }

    #[test]
    fn test_revert_reason_layout() {
        assert_eq!(REVERT_REASON_SELECTOR, selector("Error(string)"));
        let data = encode_revert_reason("nope");
        assert_eq!(data.len(), 4 + 32 * 3);
        assert_eq!(data[4 + 31], 0x20);
        assert_eq!(data[4 + 63], 4);
        assert_eq!(&data[68..72], b"nope");
    }

    #[test]
    fn test_encode_bool() {
        let encoded = encode_bool(true);
        assert_eq!(encoded.len(), 32);
        assert_eq!(encoded[31], 1);
        assert!(encode_bool(false).iter().all(|&b| b == 0));
    }
}
