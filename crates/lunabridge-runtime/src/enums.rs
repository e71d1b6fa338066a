//! String-named enums crossing the script boundary.
//!
//! Scripts pass enum values as strings. Each native enum lists its names
//! once; lookups, error messages and pushes all derive from that list.

/// A native enum exposed to scripts by name.
///
/// ```
/// use lunabridge_runtime::ScriptEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Filter {
///     Linear,
///     Nearest,
/// }
///
/// impl ScriptEnum for Filter {
///     const NAME: &'static str = "filter mode";
///     const VARIANTS: &'static [(&'static str, Self)] =
///         &[("linear", Filter::Linear), ("nearest", Filter::Nearest)];
/// }
///
/// assert_eq!(Filter::from_name("nearest"), Some(Filter::Nearest));
/// assert_eq!(Filter::Linear.to_name(), "linear");
/// ```
pub trait ScriptEnum: Copy + PartialEq + 'static {
    /// Human-readable enum name used in error messages.
    const NAME: &'static str;

    /// Every script name with its value, in presentation order.
    const VARIANTS: &'static [(&'static str, Self)];

    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    fn to_name(self) -> &'static str {
        Self::VARIANTS
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(n, _)| *n)
            .unwrap_or("")
    }

    /// All valid names.
    fn names() -> Vec<&'static str> {
        Self::VARIANTS.iter().map(|(n, _)| *n).collect()
    }
}
