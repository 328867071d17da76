use crate::Error;

/// Length of a `0x`-prefixed EVM address.
pub const ETH_ADDR_LEN: usize = 42;

const ETH_ADDR_HEX_LEN: usize = 40;

const BTC_PREFIXES: [&str; 7] = ["bc1", "tb1", "1", "3", "2", "m", "n"];

const BTC_MIN_BODY_LEN: usize = 25;

const BTC_MAX_BODY_LEN: usize = 64;

/// Returns whether `addr` is `0x` followed by 40 hex digits of either case.
pub fn is_eth_address(addr: &str) -> bool {
    addr.len() == ETH_ADDR_LEN
        && addr
            .strip_prefix("0x")
            .is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Normalize and validate an EVM address.
///
/// The input is lowercased and a missing `0x` prefix is added.
///
/// # Examples
/// ```
/// # use accrual_kernels::address::validate_eth_address;
/// let addr = validate_eth_address("AbCdEf0123456789aBcDeF0123456789abcdef01").unwrap();
/// assert_eq!(addr, "0xabcdef0123456789abcdef0123456789abcdef01");
/// ```
pub fn validate_eth_address(addr: &str) -> crate::Result<String> {
    let mut out = addr.to_ascii_lowercase();
    if out.len() == ETH_ADDR_HEX_LEN {
        out.insert_str(0, "0x");
    }
    if !is_eth_address(&out) {
        return Err(Error::InvalidAddress(addr.to_string()));
    }
    Ok(out)
}

/// Validate a BTC address (base58 or bech32 form), returning it unchanged.
///
/// Only the shape is checked: a known network prefix followed by
/// 25 to 64 characters of the combined base58/bech32 alphabet.
/// Checksums are not verified.
pub fn validate_btc_address(addr: &str) -> crate::Result<&str> {
    let body = BTC_PREFIXES
        .iter()
        .find_map(|prefix| addr.strip_prefix(prefix))
        .ok_or_else(|| Error::InvalidAddress(addr.to_string()))?;
    let valid_len = (BTC_MIN_BODY_LEN..=BTC_MAX_BODY_LEN).contains(&body.len());
    if !valid_len || !body.bytes().all(is_btc_char) {
        return Err(Error::InvalidAddress(addr.to_string()));
    }
    Ok(addr)
}

/// Returns whether `addr` is a taproot (`bc1p`) address.
pub fn is_taproot(addr: &str) -> bool {
    addr.get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("bc1p"))
}

fn is_btc_char(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'H' | b'J'..=b'N' | b'P'..=b'Z' | b'0'..=b'9')
}
