use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw database identifier.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a product row.
    ProductId
);

define_id!(
    /// Identifier of an order row.
    OrderId
);

define_id!(
    /// Identifier of a product tag row.
    TagId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_preserve_raw_value() {
        let id = ProductId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(OrderId::from(7).get(), 7);
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&TagId::new(3)).unwrap();
        assert_eq!(json, "3");

        let id: ProductId = serde_json::from_str("15").unwrap();
        assert_eq!(id, ProductId::new(15));
    }

    #[test]
    fn non_integer_ids_are_rejected() {
        assert!(serde_json::from_str::<ProductId>("\"15\"").is_err());
        assert!(serde_json::from_str::<ProductId>("1.5").is_err());
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![ProductId::new(3), ProductId::new(1), ProductId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![ProductId::new(1), ProductId::new(2), ProductId::new(3)]);
    }
}
