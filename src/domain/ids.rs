//! Type-safe entity identifiers.
//!
//! Every entity gets its own newtype around [`uuid::Uuid`] (v4) so that a
//! site identifier can never be passed where an event identifier is
//! expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`super::Zone`].
    ZoneId
);
entity_id!(
    /// Identifier of a physical fair [`super::Site`].
    SiteId
);
entity_id!(
    /// Identifier of a [`super::Fair`] season.
    FairId
);
entity_id!(
    /// Identifier of a single fair day ([`super::Event`]).
    EventId
);
entity_id!(
    /// Identifier of an [`super::EventSite`] (site × event).
    EventSiteId
);
entity_id!(
    /// Identifier of a stallholder account.
    StallholderId
);
entity_id!(
    /// Identifier of a [`super::SiteAllocation`].
    AllocationId
);
entity_id!(
    /// Identifier of a [`super::SiteHistory`] row.
    SiteHistoryId
);
entity_id!(
    /// Identifier of a [`super::StallRegistration`].
    RegistrationId
);
entity_id!(
    /// Identifier of a [`super::PaymentHistory`] record.
    PaymentId
);
entity_id!(
    /// Identifier of a [`super::FoodLicence`].
    LicenceId
);
entity_id!(
    /// Identifier of a [`super::FoodLicenceBatch`].
    LicenceBatchId
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        let a = SiteId::new();
        let b = SiteId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_uuid_format() {
        let id = EventSiteId::new();
        let s = format!("{id}");
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let uuid = uuid::Uuid::new_v4();
        let id = AllocationId::from_uuid(uuid);
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn usable_as_json_map_key() {
        use std::collections::BTreeMap;
        let id = StallholderId::new();
        let mut map = BTreeMap::new();
        map.insert(id, 3_u32);
        let Ok(json) = serde_json::to_string(&map) else {
            panic!("serialization failed");
        };
        let Ok(back) = serde_json::from_str::<BTreeMap<StallholderId, u32>>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(back.get(&id), Some(&3));
    }

    #[test]
    fn from_uuid_round_trip() {
        let uuid = uuid::Uuid::new_v4();
        let id = RegistrationId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
        assert_eq!(uuid::Uuid::from(id), uuid);
    }
}
