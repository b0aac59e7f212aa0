// ── Field tables ──
//
// Typed accessors over raw payloads are generated from a per-entity table
// of `(accessor, raw key, kind, default)`. The same table is exposed as a
// `FIELDS` constant so every default is visible as data.

use serde_json::Value;

use super::RawItem;

/// Default value of a field, as declared in its entity's field table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    /// Optional field: absent or mistyped values read as `None`.
    Null,
    Str(&'static str),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// One row of an entity's field table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Name of the generated accessor method.
    pub accessor: &'static str,
    /// Key in the controller payload.
    pub key: &'static str,
    /// Value returned when the key is missing or has the wrong JSON type.
    pub default: FieldDefault,
}

// ── Raw readers ──────────────────────────────────────────────────────

pub(crate) fn read_str<'a>(raw: &'a RawItem, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

pub(crate) fn read_bool(raw: &RawItem, key: &str) -> Option<bool> {
    raw.get(key).and_then(Value::as_bool)
}

pub(crate) fn read_i64(raw: &RawItem, key: &str) -> Option<i64> {
    raw.get(key).and_then(Value::as_i64)
}

pub(crate) fn read_u64(raw: &RawItem, key: &str) -> Option<u64> {
    raw.get(key).and_then(Value::as_u64)
}

pub(crate) fn read_f64(raw: &RawItem, key: &str) -> Option<f64> {
    raw.get(key).and_then(Value::as_f64)
}

/// Generate typed accessors and a `FIELDS` table for a type with a
/// `raw(&self) -> &RawItem` method.
///
/// ```ignore
/// raw_fields!(Wlan {
///     /// SSID.
///     name: str["name"] = "";
///     enabled: bool["enabled"] = false;
///     vlan: opt_u64["vlan"] = None;
/// });
/// ```
macro_rules! raw_fields {
    (
        $ty:ty {
            $( $(#[$meta:meta])* $name:ident : $kind:ident [$key:literal] = $default:expr ; )*
        }
    ) => {
        impl $ty {
            /// Field table: accessor, payload key and default of every typed field.
            pub const FIELDS: &'static [$crate::model::fields::FieldSpec] = &[
                $( $crate::model::fields::FieldSpec {
                    accessor: stringify!($name),
                    key: $key,
                    default: raw_fields!(@default $kind, $default),
                }, )*
            ];

            $(
                $(#[$meta])*
                pub fn $name(&self) -> raw_fields!(@ret $kind) {
                    raw_fields!(@get $kind, self.raw(), $key, $default)
                }
            )*
        }
    };

    (@ret str) => { &str };
    (@ret opt_str) => { Option<&str> };
    (@ret bool) => { bool };
    (@ret i64) => { i64 };
    (@ret u64) => { u64 };
    (@ret opt_u64) => { Option<u64> };
    (@ret f64) => { f64 };

    (@default str, $d:expr) => { $crate::model::fields::FieldDefault::Str($d) };
    (@default opt_str, $d:expr) => { $crate::model::fields::FieldDefault::Null };
    (@default bool, $d:expr) => { $crate::model::fields::FieldDefault::Bool($d) };
    (@default i64, $d:expr) => { $crate::model::fields::FieldDefault::Int($d) };
    (@default u64, $d:expr) => { $crate::model::fields::FieldDefault::UInt($d) };
    (@default opt_u64, $d:expr) => { $crate::model::fields::FieldDefault::Null };
    (@default f64, $d:expr) => { $crate::model::fields::FieldDefault::Float($d) };

    (@get str, $raw:expr, $key:literal, $d:expr) => {
        $crate::model::fields::read_str($raw, $key).unwrap_or($d)
    };
    (@get opt_str, $raw:expr, $key:literal, $d:expr) => {
        $crate::model::fields::read_str($raw, $key)
    };
    (@get bool, $raw:expr, $key:literal, $d:expr) => {
        $crate::model::fields::read_bool($raw, $key).unwrap_or($d)
    };
    (@get i64, $raw:expr, $key:literal, $d:expr) => {
        $crate::model::fields::read_i64($raw, $key).unwrap_or($d)
    };
    (@get u64, $raw:expr, $key:literal, $d:expr) => {
        $crate::model::fields::read_u64($raw, $key).unwrap_or($d)
    };
    (@get opt_u64, $raw:expr, $key:literal, $d:expr) => {
        $crate::model::fields::read_u64($raw, $key)
    };
    (@get f64, $raw:expr, $key:literal, $d:expr) => {
        $crate::model::fields::read_f64($raw, $key).unwrap_or($d)
    };
}

pub(crate) use raw_fields;
