use std::env;

/// Retrieves an environment variable, falling back to a default when unset
/// or empty.
pub fn get_env_var_or(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Retrieves an environment variable, returning `None` when unset or empty.
pub fn get_optional_env_var(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

/// Retrieves an environment variable and parses it, falling back to a
/// default on absence or parse failure.
pub fn get_env_var_as<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
