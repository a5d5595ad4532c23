// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! The eight-letter alphabet of the genus-two surface group.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SpacedError, SpacedResult};

/// One generator of the surface group or its inverse.
///
/// Lowercase letters are the generators, uppercase letters their inverses.
/// The discriminant doubles as the index into the generator table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Symbol {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    AInv = 4,
    BInv = 5,
    CInv = 6,
    DInv = 7,
}

impl Symbol {
    pub const COUNT: usize = 8;

    pub const ALL: [Symbol; Symbol::COUNT] = [
        Symbol::A,
        Symbol::B,
        Symbol::C,
        Symbol::D,
        Symbol::AInv,
        Symbol::BInv,
        Symbol::CInv,
        Symbol::DInv,
    ];

    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            'a' => Some(Symbol::A),
            'b' => Some(Symbol::B),
            'c' => Some(Symbol::C),
            'd' => Some(Symbol::D),
            'A' => Some(Symbol::AInv),
            'B' => Some(Symbol::BInv),
            'C' => Some(Symbol::CInv),
            'D' => Some(Symbol::DInv),
            _ => None,
        }
    }

    /// Parses a single character, reporting its position on failure.
    pub fn parse(ch: char, position: usize) -> SpacedResult<Self> {
        Self::from_char(ch).ok_or(SpacedError::InvalidSymbol {
            symbol: ch,
            position,
            line: None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Symbol::A => 'a',
            Symbol::B => 'b',
            Symbol::C => 'c',
            Symbol::D => 'd',
            Symbol::AInv => 'A',
            Symbol::BInv => 'B',
            Symbol::CInv => 'C',
            Symbol::DInv => 'D',
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The symbol of the inverse group element (swaps case).
    #[inline]
    pub fn inverse(self) -> Self {
        Symbol::ALL[(self.index() + 4) % Symbol::COUNT]
    }

    pub fn is_inverse(self) -> bool {
        self.index() >= 4
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
