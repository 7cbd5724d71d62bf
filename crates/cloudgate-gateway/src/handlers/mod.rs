//! Per-domain tool handlers.
//!
//! A handler reads its arguments, calls one adapter, normalizes what comes
//! back and serializes it. Every failure is a [`ProviderError`]; the gateway
//! turns it into the error envelope.

pub(crate) mod calendar;
pub(crate) mod mail;
pub(crate) mod reminders;

use chrono::{DateTime, Utc};
use cloudgate_core::parse_instant;
use cloudgate_protocol::{ArgumentError, Arguments};
use cloudgate_providers::{ProviderError, ProviderResult};
use serde::Serialize;
use serde_json::Value;

pub(crate) fn invalid(e: ArgumentError) -> ProviderError {
    ProviderError::input_invalid(e.to_string())
}

pub(crate) fn payload<T: Serialize>(value: &T) -> ProviderResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ProviderError::internal(format!("failed to encode result: {e}")))
}

pub(crate) fn required_str<'a>(args: &'a Arguments, field: &str) -> ProviderResult<&'a str> {
    args.required_str(field).map_err(invalid)
}

pub(crate) fn required_text<'a>(args: &'a Arguments, field: &str) -> ProviderResult<&'a str> {
    args.required_text(field).map_err(invalid)
}

pub(crate) fn optional_str<'a>(
    args: &'a Arguments,
    field: &str,
) -> ProviderResult<Option<&'a str>> {
    args.optional_str(field).map_err(invalid)
}

/// Parses an optional date/time argument.
pub(crate) fn optional_instant(
    args: &Arguments,
    field: &str,
) -> ProviderResult<Option<DateTime<Utc>>> {
    optional_str(args, field)?
        .map(|text| {
            parse_instant(text).map_err(|e| invalid(ArgumentError::new(field, e.to_string())))
        })
        .transpose()
}

/// Parses a required date/time argument.
pub(crate) fn required_instant(args: &Arguments, field: &str) -> ProviderResult<DateTime<Utc>> {
    optional_instant(args, field)?.ok_or_else(|| invalid(ArgumentError::missing(field)))
}
