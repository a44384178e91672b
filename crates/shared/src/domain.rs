use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_newtype!(ProductId);
id_newtype!(CategoryId);
id_newtype!(SupplierId);

impl ProductId {
    /// Selection sentinel meaning "no product selected".
    pub const NONE: ProductId = ProductId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::NONE
    }
}
