//! Decoding of flat `key = value` maps into typed records.

use crate::{
    duration::PositiveDuration,
    error::{FieldError, ValueError},
};

/// Maps a raw key to a candidate field name.
pub type NameTransformer = fn(&str) -> String;

/// A value that can be assigned from its textual form.
///
/// An implementation may assign the value and still return an error; such errors
/// are warnings (see [`ValueError::is_warning`]).
pub trait UnmarshalText {
    fn type_name(&self) -> &'static str;

    fn unmarshal_text(&mut self, text: &str) -> Result<(), ValueError>;
}

macro_rules! impl_unmarshal_text_via_from_str {
    ($($t:ty),* $(,)?) => {$(
        impl UnmarshalText for $t {
            fn type_name(&self) -> &'static str {
                stringify!($t)
            }

            fn unmarshal_text(&mut self, text: &str) -> Result<(), ValueError> {
                *self = text
                    .parse()
                    .map_err(|_| ValueError::not_value_of_type(stringify!($t), text))?;
                Ok(())
            }
        }
    )*};
}

impl_unmarshal_text_via_from_str!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl UnmarshalText for bool {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn unmarshal_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self = match text {
            "1" | "t" | "T" | "true" | "True" | "TRUE" => true,
            "0" | "f" | "F" | "false" | "False" | "FALSE" => false,
            _ => return Err(ValueError::not_value_of_type("bool", text)),
        };
        Ok(())
    }
}

impl UnmarshalText for String {
    fn type_name(&self) -> &'static str {
        "string"
    }

    fn unmarshal_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self = text.to_owned();
        Ok(())
    }
}

impl UnmarshalText for PositiveDuration {
    fn type_name(&self) -> &'static str {
        "PositiveDuration"
    }

    fn unmarshal_text(&mut self, text: &str) -> Result<(), ValueError> {
        let (d, warning) = PositiveDuration::parse(text)?;
        *self = d;
        match warning {
            Some(w) => Err(w.into()),
            None => Ok(()),
        }
    }
}

/// A record whose fields are addressable by name.
///
/// Usually implemented through [`string_map_fields!`](crate::string_map_fields).
pub trait StringMapTarget {
    fn field_names(&self) -> &'static [&'static str];

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn UnmarshalText>;
}

#[macro_export]
macro_rules! string_map_fields {
    ($ty:ty { $($field:ident => $name:literal),* $(,)? }) => {
        impl $crate::unmarshal::StringMapTarget for $ty {
            fn field_names(&self) -> &'static [&'static str] {
                &[$($name),*]
            }

            fn field_mut(
                &mut self,
                name: &str,
            ) -> Option<&mut dyn $crate::unmarshal::UnmarshalText> {
                match name {
                    $($name => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

/// `"time_limit"` -> `"TimeLimit"`, `"TL"` -> `"Tl"`.
pub fn upper_camel_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            let head = chars.next().map(|c| c.to_uppercase().collect::<String>());
            let tail: String = chars.flat_map(char::to_lowercase).collect();
            head.unwrap_or_default() + &tail
        })
        .collect()
}

/// Assigns every `(key, value)` pair to the field of `data` named `key`
/// or named by any transformer's output for `key`.
///
/// Decoding continues past failures; the returned errors are in input order.
/// A field whose decoding failed keeps its previous value.
pub fn string_map_unmarshal<I, K, V, T>(
    kvs: I,
    data: &mut T,
    transformers: &[NameTransformer],
) -> Vec<FieldError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
    T: StringMapTarget + ?Sized,
{
    let mut errs = Vec::new();
    for (key, value) in kvs {
        let key = key.as_ref();
        let Some(name) = resolve_field_name(&*data, key, transformers) else {
            errs.push(FieldError::new(key, ValueError::UnknownField));
            continue;
        };
        let Some(field) = data.field_mut(name) else {
            errs.push(FieldError::new(key, ValueError::UnknownField));
            continue;
        };
        if let Err(e) = field.unmarshal_text(value.as_ref()) {
            log::debug!("Failed to decode field {:?}: {}", key, e);
            errs.push(FieldError::new(key, e));
        }
    }
    errs
}

fn resolve_field_name<T>(data: &T, key: &str, transformers: &[NameTransformer]) -> Option<&'static str>
where
    T: StringMapTarget + ?Sized,
{
    let names = data.field_names();
    let find = |candidate: &str| names.iter().copied().find(|&n| n == candidate);
    find(key).or_else(|| transformers.iter().find_map(|t| find(&t(key))))
}
