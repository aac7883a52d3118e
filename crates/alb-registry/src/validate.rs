//! Syntax checks for names that end up in the proxy configuration.
//!
//! Group names become nginx `upstream` block names and hosts become
//! `server` addresses, so both are restricted to characters that cannot
//! break out of the directive they are written into.

use std::sync::LazyLock;

use regex::Regex;

static GROUP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("group name pattern"));

// Hostname or IPv4 literal, or a bracketed IPv6 literal.
static HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_](?:[A-Za-z0-9_.-]*[A-Za-z0-9_])?|\[[0-9A-Fa-f:.]+\])$")
        .expect("host pattern")
});

/// Whether `name` can be written as an upstream block name and read back.
pub fn is_valid_group_name(name: &str) -> bool {
    GROUP_NAME.is_match(name)
}

/// Whether `host` can be written as a `server` address.
pub fn is_valid_host(host: &str) -> bool {
    host.len() <= 253 && HOST.is_match(host)
}
