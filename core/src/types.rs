//! Shared primitive types and the text-backed enums stored in the database.

use crate::error::OpsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = i64;
pub type TxnId = i64;

/// Storage format for every timestamp column.
pub const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";
/// Storage format for every date column.
pub const DATE_FMT: &str = "%Y-%m-%d";

/// Declares an enum persisted as text, with `as_str`, `ALL`,
/// `Display` and a `FromStr` that rejects unknown values.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = OpsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(OpsError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum!(Country, "country" {
    Argentina => "Argentina",
    Mexico => "México",
    Colombia => "Colombia",
    Chile => "Chile",
});

impl Country {
    pub fn cities(&self) -> &'static [&'static str] {
        match self {
            Self::Argentina => &["Buenos Aires", "Córdoba", "Rosario", "Mendoza", "Tucumán"],
            Self::Mexico => &["Ciudad de México", "Guadalajara", "Monterrey", "Puebla", "Tijuana"],
            Self::Colombia => &["Bogotá", "Medellín", "Cali", "Barranquilla", "Cartagena"],
            Self::Chile => &["Santiago", "Valparaíso", "Concepción", "Viña del Mar", "Antofagasta"],
        }
    }
}

text_enum!(VerificationLevel, "verification level" {
    Basic => "basic",
    Intermediate => "intermediate",
    Full => "full",
});

text_enum!(AccountStatus, "account status" {
    Active => "active",
    Suspended => "suspended",
    Closed => "closed",
});

text_enum!(OperationType, "operation type" {
    Buy => "buy",
    Sell => "sell",
    Swap => "swap",
    Withdrawal => "withdrawal",
});

text_enum!(Crypto, "crypto" {
    Btc => "BTC",
    Eth => "ETH",
    Usdt => "USDT",
    Usdc => "USDC",
    Bnb => "BNB",
    Ada => "ADA",
    Sol => "SOL",
});

impl Crypto {
    /// Approximate USD reference price used by the generator.
    pub fn reference_price_usd(&self) -> f64 {
        match self {
            Self::Btc => 45_000.0,
            Self::Eth => 2_500.0,
            Self::Usdt | Self::Usdc => 1.0,
            Self::Bnb => 350.0,
            Self::Ada => 0.5,
            Self::Sol => 100.0,
        }
    }
}

text_enum!(PaymentMethod, "payment method" {
    BankTransfer => "bank_transfer",
    Card => "card",
    CryptoWallet => "crypto_wallet",
});

text_enum!(Network, "network" {
    Bitcoin => "Bitcoin",
    Ethereum => "Ethereum",
    BinanceSmartChain => "Binance Smart Chain",
    Polygon => "Polygon",
    Tron => "Tron",
});

text_enum!(TxnStatus, "transaction status" {
    Pending => "pending",
    Processing => "processing",
    Success => "success",
    Failed => "failed",
});

impl TxnStatus {
    /// Success and failed are the only states with a meaningful processing time.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

text_enum!(Device, "device" {
    Desktop => "Desktop",
    MobileAndroid => "Mobile Android",
    MobileIos => "Mobile iOS",
    Tablet => "Tablet",
});

text_enum!(
    /// Synthetic load label derived from the hour a transaction started.
    Period, "period" {
    Normal => "Normal Hour",
    Peak => "Peak Hour",
});

impl Period {
    pub const PEAK_START_HOUR: u32 = 18;
    pub const PEAK_END_HOUR: u32 = 23;

    pub fn from_hour(hour: u32) -> Self {
        if (Self::PEAK_START_HOUR..=Self::PEAK_END_HOUR).contains(&hour) {
            Self::Peak
        } else {
            Self::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_values_round_trip_through_from_str() {
        for c in Crypto::ALL {
            assert_eq!(c.as_str().parse::<Crypto>().unwrap(), *c);
        }
        assert_eq!("México".parse::<Country>().unwrap(), Country::Mexico);
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = "exitosa".parse::<TxnStatus>().unwrap_err();
        assert!(matches!(err, OpsError::UnknownVariant { kind: "transaction status", .. }));
    }

    #[test]
    fn peak_window_is_inclusive() {
        assert_eq!(Period::from_hour(17), Period::Normal);
        assert_eq!(Period::from_hour(18), Period::Peak);
        assert_eq!(Period::from_hour(23), Period::Peak);
        assert_eq!(Period::from_hour(0), Period::Normal);
    }
}
