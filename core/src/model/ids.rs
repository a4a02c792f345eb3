// core/src/model/ids.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    #[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
    pub struct $name(Uuid);

    impl $name {
      /// Generates a fresh random id.
      pub fn new() -> Self {
        Self(Uuid::new_v4())
      }

      pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
      }

      pub const fn as_uuid(&self) -> Uuid {
        self.0
      }
    }

    impl Default for $name {
      fn default() -> Self {
        Self::new()
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<Uuid> for $name {
      fn from(id: Uuid) -> Self {
        Self(id)
      }
    }

    impl FromStr for $name {
      type Err = uuid::Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
      }
    }
  };
}

entity_id!(
  /// Identity of the account that owns items and carts.
  OwnerId
);
entity_id!(ItemId);
entity_id!(CartId);
entity_id!(LineItemId);
