//! Logging macros with the field names used across the framework.
//!
//! Every line about an object carries `type_name` and `identity`, so a log
//! query can follow one instance through its lifecycle.

/// Span scoped to one business object.
///
/// ```rust,ignore
/// let _span = object_span!("save", object.type_name(), object.identity()).entered();
/// ```
#[macro_export]
macro_rules! object_span {
    ($name:expr, $type_name:expr, $identity:expr $(, $($field:tt)*)?) => {
        $crate::tracing::info_span!(
            $name,
            type_name = %$type_name,
            identity = $identity
            $(, $($field)*)?
        )
    };
}

/// Log an event about a business object with the standard fields.
#[macro_export]
macro_rules! log_object_event {
    ($level:ident, $msg:expr, $type_name:expr, $identity:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            type_name = %$type_name,
            identity = $identity,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log an event about a rule with the standard fields.
#[macro_export]
macro_rules! log_rule_event {
    ($level:ident, $msg:expr, $type_name:expr, $rule:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            type_name = %$type_name,
            rule = %$rule,
            $($($field)*,)?
            $msg
        )
    };
}
