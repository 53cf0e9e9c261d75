use crate::error::{CatalogError, Result};

/// Declares a bank entity with the shared SWIFT base fields followed by
/// `extra` fields. The key is `swift_code`; every other base field is
/// optional so a partially filled value doubles as an update patch.
#[macro_export]
macro_rules! bank_entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive($crate::Entity, Debug, Clone, Default, PartialEq, Eq)]
        $vis struct $name {
            pub country_iso2: Option<String>,
            #[key]
            pub swift_code: String,
            pub swift_prefix: Option<String>,
            pub code_type: Option<String>,
            pub bank_name: Option<String>,
            pub address: Option<String>,
            pub town_name: Option<String>,
            pub country_name: Option<String>,
            pub time_zone: Option<String>,
            pub is_headquarter: Option<bool>,
            $( $(#[$fmeta])* $fvis $field: $ty, )*
        }
    };
}

bank_entity! {
    pub struct Headquarters {}
}

bank_entity! {
    pub struct Branch {}
}

pub fn swift_prefix(swift_code: &str) -> Result<&str> {
    swift_code.get(..8).ok_or_else(|| {
        CatalogError::InvalidOperation(format!(
            "SWIFT code '{}' is shorter than 8 characters",
            swift_code
        ))
    })
}
