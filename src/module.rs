//! Resource modules and permission bits

use serde::{Deserialize, Serialize};

use crate::error::PermError;

/// A manageable resource category. The set is closed: adding a variant
/// forces the dependency table in [`Module::parents`] to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Buildings,
    Floors,
    Rooms,
    Beds,
    Tenants,
    Bookings,
    Payments,
    Invoices,
    Expenses,
}

impl Module {
    pub const COUNT: usize = 9;

    /// Every module, in canonical order.
    pub const ALL: [Module; Module::COUNT] = [
        Module::Buildings,
        Module::Floors,
        Module::Rooms,
        Module::Beds,
        Module::Tenants,
        Module::Bookings,
        Module::Payments,
        Module::Invoices,
        Module::Expenses,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Module::Buildings => "buildings",
            Module::Floors => "floors",
            Module::Rooms => "rooms",
            Module::Beds => "beds",
            Module::Tenants => "tenants",
            Module::Bookings => "bookings",
            Module::Payments => "payments",
            Module::Invoices => "invoices",
            Module::Expenses => "expenses",
        }
    }

    /// Modules this one structurally requires, nearest first.
    pub fn parents(self) -> &'static [Module] {
        match self {
            Module::Buildings => &[],
            Module::Floors => &[Module::Buildings],
            Module::Rooms => &[Module::Floors, Module::Buildings],
            Module::Beds => &[Module::Rooms, Module::Floors, Module::Buildings],
            Module::Tenants
            | Module::Bookings
            | Module::Payments
            | Module::Invoices
            | Module::Expenses => &[Module::Buildings],
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Module {
    type Err = PermError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == value)
            .ok_or_else(|| PermError::UnknownModule(value.to_string()))
    }
}

// Permission bit masks
pub const VIEW: u8 = 1;
pub const ADD: u8 = 1 << 1;
pub const EDIT: u8 = 1 << 2;
pub const DELETE: u8 = 1 << 3;
pub const ALL_BITS: u8 = VIEW | ADD | EDIT | DELETE;

/// One of the four permission bits carried by every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bit {
    View,
    Add,
    Edit,
    Delete,
}

impl Bit {
    pub const ALL: [Bit; 4] = [Bit::View, Bit::Add, Bit::Edit, Bit::Delete];

    #[inline]
    pub fn mask(self) -> u8 {
        match self {
            Bit::View => VIEW,
            Bit::Add => ADD,
            Bit::Edit => EDIT,
            Bit::Delete => DELETE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Bit::View => "view",
            Bit::Add => "add",
            Bit::Edit => "edit",
            Bit::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Bit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Bit {
    type Err = PermError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Bit::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == value)
            .ok_or_else(|| PermError::UnknownBit(value.to_string()))
    }
}

/// Convert a bit mask to its list of bit names
pub fn bits_to_names(mask: u8) -> Vec<&'static str> {
    Bit::ALL
        .iter()
        .filter(|b| mask & b.mask() != 0)
        .map(|b| b.as_str())
        .collect()
}
