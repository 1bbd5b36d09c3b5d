#![allow(unused_macros)]

/// Evaluates to the `Result` of a fallible expression and hands the error to
/// `Diagnostics` instead of propagating it.
///
/// Used where a failure is local to one item (one method body, one attribute)
/// and must not stop the rest of the module from being processed.
macro_rules! contain {
    ($diagnostics:expr, $category:expr, $expr:expr) => {
        match $expr {
            Ok(value) => Some(value),
            Err(error) => {
                $diagnostics.warning($category, error.to_string());
                None
            }
        }
    };
}

/// Returns early with `Ok(())` once a detector found the single fact it looks for.
macro_rules! report_once {
    ($context:expr, $feature:expr) => {{
        $context.report($feature);
        return Ok(());
    }};
}
