/// Define an enum that round-trips through its underlying integer type,
/// falling back to an `Unknown` variant instead of failing to parse.
///
/// Unknown command bytes are not an error condition in this protocol (see
/// the Chain Protocol Engine's `ERR / default` row: unrecognized commands
/// are reflected back upstream rather than rejected), so the wire-level
/// enums need an infallible `From<repr>` conversion rather than a
/// `TryFrom`.
macro_rules! enum_with_unknown {
    (
        $( #[$enum_attr:meta] )*
        pub enum $name:ident($ty:ty) {
            $( $( #[$variant_attr:meta] )* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $( #[$enum_attr] )*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $( #[$variant_attr] )* $variant ),+,
            Unknown($ty),
        }

        impl ::core::convert::From<$ty> for $name {
            fn from(value: $ty) -> Self {
                match value {
                    $( $value => $name::$variant, )+
                    other => $name::Unknown(other),
                }
            }
        }

        impl ::core::convert::From<$name> for $ty {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => $value, )+
                    $name::Unknown(other) => other,
                }
            }
        }
    };
}

pub(crate) use enum_with_unknown;
