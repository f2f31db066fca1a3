//! The permission hierarchy.
//!
//! Levels are totally ordered `READ < EDIT < OWNER`. The order lives in
//! [`PermissionLevel::rank`] and nowhere else: every access check goes through
//! [`satisfies`] instead of comparing levels inline.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The access a user holds on a collection.
///
/// Not `Ord`; compare through [`satisfies`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum PermissionLevel {
  Read,
  Edit,
  Owner,
}

impl PermissionLevel {
  pub const fn rank(self) -> u8 {
    match self {
      Self::Read => 1,
      Self::Edit => 2,
      Self::Owner => 3,
    }
  }

  /// Whether holding `self` grants at least `required`.
  pub const fn satisfies(self, required: Self) -> bool { satisfies(self, required) }
}

/// `true` when `held` ranks at or above `required`.
pub const fn satisfies(held: PermissionLevel, required: PermissionLevel) -> bool {
  held.rank() >= required.rank()
}
