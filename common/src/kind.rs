//! [`define_kind!`] macro.

/// Defines a fieldless enum with explicit `u8` discriminants.
///
/// The enum is stored in Postgres as `INT2` and is (de)serialized as a string
/// in the `case` provided, defaulting to `SCREAMING_SNAKE_CASE`.
///
/// # Example
///
/// ```rust
/// use common::define_kind;
///
/// define_kind! {
///     #[doc = "Unit of a measured area."]
///     #[case = "snake_case"]
///     enum Unit {
///         #[doc = "Square foot."]
///         SquareFoot = 1,
///
///         #[doc = "Square meter."]
///         SquareMeter = 2,
///     }
/// }
///
/// assert_eq!(Unit::from_u8(2), Some(Unit::SquareMeter));
/// assert_eq!(Unit::SquareFoot.to_string(), "square_foot");
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        $(#[case = $case:literal])?
        enum $name:ident {$(
            #[doc = $variant_doc:literal]
            $variant:ident = $value:literal
        ),* $(,)?}
    ) => {
        $crate::define_kind! {
            @enum $name [$doc] [$($case)? "SCREAMING_SNAKE_CASE"]
            $([$variant_doc] $variant = $value)*
        }
    };

    (
        @enum $name:ident [$doc:literal] [$case:literal $($default:literal)?]
        $([$variant_doc:literal] $variant:ident = $value:literal)*
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            Eq,
            Hash,
            PartialEq,
            $crate::private::serde::Deserialize,
            $crate::private::serde::Serialize,
        )]
        #[serde(crate = "::common::private::serde", rename_all = $case)]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = $case)]
        pub enum $name {$(
            #[doc = $variant_doc]
            $variant = $value,
        )*}

        impl $name {
            /// All the variants, in the order of their discriminants.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Returns the discriminant of this variant.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Returns the variant having the provided discriminant, if any.
            #[must_use]
            pub const fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &'a [u8],
            ) -> ::std::result::Result<
                Self,
                ::std::boxed::Box<
                    dyn ::std::error::Error + ::core::marker::Send
                        + ::core::marker::Sync,
                >,
            > {
                let raw: i16 =
                    $crate::private::postgres_types::FromSql::from_sql(ty, raw)?;
                u8::try_from(raw)
                    .ok()
                    .and_then(Self::from_u8)
                    .ok_or_else(|| {
                        ::std::format!(
                            "`{raw}` is not a `{}` discriminant",
                            ::core::stringify!($name),
                        )
                        .into()
                    })
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> ::std::result::Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error + ::core::marker::Send
                        + ::core::marker::Sync,
                >,
            > {
                $crate::private::postgres_types::ToSql::to_sql(
                    &i16::from(self.u8()),
                    ty,
                    w,
                )
            }
        }
    };
}

#[cfg(test)]
mod spec {
    crate::define_kind! {
        #[doc = "Test light."]
        enum Light {
            #[doc = "Red."]
            Red = 1,

            #[doc = "Amber."]
            Amber = 2,

            #[doc = "Green."]
            Green = 3,
        }
    }

    crate::define_kind! {
        #[doc = "Test shape."]
        #[case = "snake_case"]
        enum Shape {
            #[doc = "Flat square."]
            FlatSquare = 1,
        }
    }

    #[test]
    fn converts_discriminants() {
        for l in Light::ALL {
            assert_eq!(Light::from_u8(l.u8()), Some(*l));
        }
        assert_eq!(Light::from_u8(0), None);
        assert_eq!(Light::from_u8(4), None);
    }

    #[test]
    fn uses_provided_case() {
        assert_eq!(Light::Amber.to_string(), "AMBER");
        assert_eq!(Shape::FlatSquare.to_string(), "flat_square");
        assert_eq!(
            serde_json::to_string(&Shape::FlatSquare).unwrap(),
            r#""flat_square""#,
        );
        assert_eq!(
            serde_json::from_str::<Light>(r#""GREEN""#).unwrap(),
            Light::Green,
        );
    }
}
