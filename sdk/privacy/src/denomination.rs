//! Standardized denominations
//!
//! Deposits and withdrawals are restricted to a fixed set of amounts so that
//! every member of the anonymity set looks the same. The set is versioned:
//! client and ledger must agree on [`DENOMINATION_VERSION`].

use std::fmt;

use murk_account::LAMPORTS_PER_SOL;
use serde::{Deserialize, Serialize};

/// Version of the denomination table shared by client and ledger.
pub const DENOMINATION_VERSION: u8 = 1;

/// Allowed amounts in lamports.
pub const ALLOWED_AMOUNTS: [u64; 3] = [
    100_000_000,   // 0.1 SOL
    500_000_000,   // 0.5 SOL
    1_000_000_000, // 1.0 SOL
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Denomination {
    TenthSol,
    HalfSol,
    OneSol,
}

impl Denomination {
    pub const ALL: [Denomination; 3] = [Self::TenthSol, Self::HalfSol, Self::OneSol];

    pub fn lamports(self) -> u64 {
        match self {
            Self::TenthSol => ALLOWED_AMOUNTS[0],
            Self::HalfSol => ALLOWED_AMOUNTS[1],
            Self::OneSol => ALLOWED_AMOUNTS[2],
        }
    }

    pub fn from_lamports(amount: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.lamports() == amount)
    }

    pub fn is_standard(amount: u64) -> bool {
        ALLOWED_AMOUNTS.contains(&amount)
    }

    /// Parses a SOL amount such as `"0.5"` or `"1"`.
    pub fn parse_sol(s: &str) -> Option<Self> {
        let sol: f64 = s.trim().parse().ok()?;
        if !sol.is_finite() || sol <= 0.0 {
            return None;
        }
        let lamports = (sol * LAMPORTS_PER_SOL as f64).round() as u64;
        Self::from_lamports(lamports)
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TenthSol => "0.1",
            Self::HalfSol => "0.5",
            Self::OneSol => "1.0",
        };
        write!(f, "{} SOL", label)
    }
}

impl From<Denomination> for u64 {
    fn from(d: Denomination) -> Self {
        d.lamports()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_table_amounts_are_standard() {
        for amount in ALLOWED_AMOUNTS {
            assert!(Denomination::is_standard(amount));
        }
        assert!(!Denomination::is_standard(0));
        assert!(!Denomination::is_standard(100_000_001));
        assert!(!Denomination::is_standard(2 * LAMPORTS_PER_SOL));
    }

    #[test]
    fn test_parse_sol() {
        assert_eq!(Denomination::parse_sol("0.1"), Some(Denomination::TenthSol));
        assert_eq!(Denomination::parse_sol(".5"), Some(Denomination::HalfSol));
        assert_eq!(Denomination::parse_sol("1"), Some(Denomination::OneSol));
        assert_eq!(Denomination::parse_sol("0.25"), None);
        assert_eq!(Denomination::parse_sol("-1"), None);
        assert_eq!(Denomination::parse_sol("abc"), None);
    }
}
