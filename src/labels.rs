// src/labels.rs
use alloy::primitives::Address;

/// Well-known Base addresses, lowercase hex
const KNOWN_LABELS: &[(&str, &str)] = &[
    ("0x3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad", "Uniswap V3: Router"),
    ("0x4200000000000000000000000000000000000006", "Base Bridge"),
    ("0x2ae3f1ec7f1f5012cfeab0185bfc7aa3cf0dec22", "Coinbase"),
    ("0x1111111254eeb25477b68fb85ed929f73a960582", "1inch Router"),
    ("0x4e59b44847b379578588920ca78fbf26c0b4956c", "Create2 Factory"),
    ("0xc1e92bd5d1aa6e5f5f299d0490befd9d8e5a887a", "Binance Deposit"),
    ("0x49048044d57e1c92a77f79988d21fa8faf74e97e", "Base Name Service"),
    ("0xba5e05cb26b78eda3a2f8e3b3814726305dcac83", "Aerodrome Finance"),
    ("0x9c58bacc331c9aa871afd802db6379a98e80cedb", "Gnosis Safe Proxy"),
    ("0x80c67432656d59144ceff962e8faf8926599bcf8", "Orbiter Finance"),
    ("0xdef1c0ded9bec7f1a1670819833240f027b25eff", "0x Exchange Proxy"),
];

pub const UNKNOWN: &str = "Unknown";

/// Label for an address, `"Unknown"` when it is not in the table
pub fn label_for(address: &Address) -> &'static str {
    let hex = format!("{:#x}", address);
    KNOWN_LABELS
        .iter()
        .find(|(known, _)| *known == hex)
        .map_or(UNKNOWN, |&(_, label)| label)
}
