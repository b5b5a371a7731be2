//! Value object trait: equality by value, not identity.

use crate::{AccountNumber, Money};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values:
/// two `Money` amounts of `100.00` are the same amount, two account numbers
/// with the same digits name the same account.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

impl ValueObject for Money {}
impl ValueObject for AccountNumber {}
