//! Declarative macro for flag sets.

/// Declares a `Copy` bitmask newtype with named flags.
///
/// The generated type supports set algebra (`|`, `&`, `-`), name lookup,
/// `FromStr` over `|` or `,` separated labels, a `|`-joined `Display`, and
/// serde support as a sequence of labels (a single `|`-joined string is also
/// accepted when deserialising).
///
/// ```
/// greeks_core::bitmask! {
///     /// Demo flags.
///     pub struct Demo: u8 {
///         /// First.
///         const A = 1 => "Alpha";
///         /// Second.
///         const B = 2 => "Beta";
///     }
/// }
///
/// let both: Demo = "alpha | BETA".parse().unwrap();
/// assert_eq!(both, Demo::A | Demo::B);
/// assert_eq!(both.to_string(), "Alpha | Beta");
/// ```
#[macro_export]
macro_rules! bitmask {
    (
        $(#[$outer:meta])*
        $vis:vis struct $name:ident: $repr:ty {
            $(
                $(#[$inner:meta])*
                const $flag:ident = $value:expr => $label:literal;
            )*
        }
    ) => {
        $(#[$outer])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name($repr);

        impl $name {
            $(
                $(#[$inner])*
                pub const $flag: Self = Self($value);
            )*

            const NAMED: &'static [(&'static str, Self)] = &[$(($label, Self::$flag)),*];

            /// The empty set.
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Every named flag.
            pub const fn all() -> Self {
                Self(0 $(| $value)*)
            }

            /// Raw bits.
            pub const fn bits(self) -> $repr {
                self.0
            }

            /// Builds a set from raw bits, dropping unknown bits.
            pub const fn from_bits_truncate(bits: $repr) -> Self {
                Self(bits & Self::all().0)
            }

            /// True when no flag is set.
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// True when every flag of `other` is set.
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// True when at least one flag of `other` is set.
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Union of both sets.
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Flags of `self` not present in `other`.
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Sets or clears every flag of `other`.
            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.0 |= other.0;
                } else {
                    self.0 &= !other.0;
                }
            }

            /// Looks up a single flag by label, ignoring case, `_`, `-` and spaces.
            pub fn from_name(name: &str) -> Option<Self> {
                let wanted = $crate::types::normalise_flag_name(name);
                Self::NAMED
                    .iter()
                    .find(|(label, _)| $crate::types::normalise_flag_name(label) == wanted)
                    .map(|(_, flag)| *flag)
            }

            /// Labels of the flags that are set, in declaration order.
            pub fn names(self) -> impl Iterator<Item = &'static str> {
                Self::NAMED
                    .iter()
                    .filter(move |(_, flag)| !flag.is_empty() && self.contains(*flag))
                    .map(|(label, _)| *label)
            }
        }

        impl ::std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl ::std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl ::std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl ::std::ops::Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                self.difference(rhs)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                if self.is_empty() {
                    return write!(f, "(empty)");
                }
                let names: Vec<&str> = self.names().collect();
                write!(f, "{}", names.join(" | "))
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::types::UnknownFlagError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut flags = Self::empty();
                for part in s.split(|c| c == '|' || c == ',') {
                    let part = part.trim();
                    if part.is_empty() {
                        continue;
                    }
                    let flag = Self::from_name(part).ok_or_else(|| $crate::types::UnknownFlagError {
                        set: stringify!($name),
                        name: part.to_string(),
                    })?;
                    flags |= flag;
                }
                Ok(flags)
            }
        }

        impl $crate::__serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: $crate::__serde::Serializer,
            {
                serializer.collect_seq(self.names())
            }
        }

        impl<'de> $crate::__serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: $crate::__serde::Deserializer<'de>,
            {
                struct FlagVisitor;

                impl<'de> $crate::__serde::de::Visitor<'de> for FlagVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                        write!(f, "a flag label, a `|` separated string or a sequence of labels")
                    }

                    fn visit_str<E>(self, v: &str) -> Result<$name, E>
                    where
                        E: $crate::__serde::de::Error,
                    {
                        v.parse().map_err(E::custom)
                    }

                    fn visit_seq<A>(self, mut seq: A) -> Result<$name, A::Error>
                    where
                        A: $crate::__serde::de::SeqAccess<'de>,
                    {
                        let mut flags = $name::empty();
                        while let Some(label) = seq.next_element::<String>()? {
                            let flag: $name = label
                                .parse()
                                .map_err(<A::Error as $crate::__serde::de::Error>::custom)?;
                            flags |= flag;
                        }
                        Ok(flags)
                    }
                }

                deserializer.deserialize_any(FlagVisitor)
            }
        }
    };
}
