//! Serde adapters for the persisted document

/// `U256` as a plain decimal string (`"79228162514264337593543950336"`).
///
/// The default serde form of `U256` is `0x`-prefixed hex; the record stores
/// position ids and prices in decimal.
pub mod decimal_u256 {
    use ethers::types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s).map_err(serde::de::Error::custom)
    }
}
