use std::fmt::Display;
use std::str::FromStr;

use error_stack::{Report, ResultExt};
use kernel::KernelError;

pub mod config;
pub mod database;
pub mod error;

pub(crate) fn env(key: &str) -> error_stack::Result<String, KernelError> {
    dotenvy::var(key)
        .change_context_lazy(|| KernelError::Internal)
        .attach_printable_lazy(|| format!("Env {} not specified", key))
}

/// Reads an optional env value, falling back to `default` when unset.
pub(crate) fn env_or<T>(key: &str, default: T) -> error_stack::Result<T, KernelError>
where
    T: FromStr,
    T::Err: Display,
{
    match dotenvy::var(key) {
        Ok(value) => value.trim().parse::<T>().map_err(|error| {
            Report::new(KernelError::Internal)
                .attach_printable(format!("Env {} has invalid value {:?}: {}", key, value, error))
        }),
        Err(dotenvy::Error::EnvVar(std::env::VarError::NotPresent)) => Ok(default),
        Err(error) => Err(Report::new(error)
            .change_context(KernelError::Internal)
            .attach_printable(format!("Env {} could not be read", key))),
    }
}
