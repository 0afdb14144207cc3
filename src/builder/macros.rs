//! Macros for declaring flow states with little boilerplate.

/// Implement [`State`](crate::core::State) for a flow state enum.
///
/// Every variant is named after itself, whatever fields it carries. Variants
/// listed under `transient` are suspend points that cannot be revisited with
/// the back button.
///
/// # Example
///
/// ```
/// use pageflow::core::State;
/// use pageflow::impl_state;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// enum Checkout {
///     Cart,
///     Payment { total: u64 },
///     Receipt(String),
/// }
///
/// impl_state!(Checkout { Cart, Payment, Receipt } transient: [Payment]);
///
/// assert_eq!(Checkout::Payment { total: 10 }.name(), "Payment");
/// assert!(!Checkout::Payment { total: 10 }.bookmarkable());
/// assert!(Checkout::Receipt("r-1".into()).bookmarkable());
/// ```
#[macro_export]
macro_rules! impl_state {
    (
        $name:ident { $($variant:ident),* $(,)? }
        $(transient: [$($transient:ident),* $(,)?])?
    ) => {
        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant)),*
                }
            }

            #[allow(unreachable_patterns)]
            fn bookmarkable(&self) -> bool {
                match self {
                    $($(Self::$transient { .. } => false,)*)?
                    _ => true,
                }
            }
        }
    };
}
