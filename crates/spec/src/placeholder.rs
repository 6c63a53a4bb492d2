//! Literal token replacement in instance metadata.
//!
//! This is plain substring replacement, not templating: `USERNAME` is
//! replaced first, then `SSH_PUBLIC_KEY`, on every value.

use std::collections::HashMap;

pub const USERNAME: &str = "USERNAME";
pub const SSH_PUBLIC_KEY: &str = "SSH_PUBLIC_KEY";

pub fn substitute(value: &str, username: &str, ssh_public_key: &str) -> String {
    value
        .replace(USERNAME, username)
        .replace(SSH_PUBLIC_KEY, ssh_public_key)
}

/// Applies [`substitute`] to every value. Entries without a value are
/// carried over untouched.
pub fn substitute_metadata(
    metadata: &HashMap<String, Option<String>>,
    username: &str,
    ssh_public_key: &str,
) -> HashMap<String, Option<String>> {
    metadata
        .iter()
        .map(|(key, value)| {
            let value = value
                .as_deref()
                .map(|v| substitute(v, username, ssh_public_key));
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(entries: &[(&str, Option<&str>)]) -> HashMap<String, Option<String>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_substitutes_both_tokens() {
        let input = metadata(&[("user-data", Some("user:USERNAME key:SSH_PUBLIC_KEY"))]);

        let output = substitute_metadata(&input, "alice", "ssh-rsa AAAA...");

        assert_eq!(
            output,
            metadata(&[("user-data", Some("user:alice key:ssh-rsa AAAA..."))])
        );
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        assert_eq!(
            substitute("USERNAME/USERNAME SSH_PUBLIC_KEYSSH_PUBLIC_KEY", "bob", "k"),
            "bob/bob kk"
        );
    }

    #[test]
    fn test_null_values_are_left_alone() {
        let input = metadata(&[("serial-port-enable", None), ("plain", Some("no tokens"))]);

        let output = substitute_metadata(&input, "alice", "key");

        assert_eq!(output, input);
    }

    #[test]
    fn test_reapplying_is_a_no_op() {
        let input = metadata(&[
            ("user-data", Some("#cloud-config\nusers:\n  - name: USERNAME\n    ssh_authorized_keys:\n      - SSH_PUBLIC_KEY\n")),
            ("ssh-keys", Some("USERNAME:SSH_PUBLIC_KEY")),
        ]);

        let once = substitute_metadata(&input, "alice", "ssh-ed25519 AAAAC3Nza alice@host");
        let twice = substitute_metadata(&once, "alice", "ssh-ed25519 AAAAC3Nza alice@host");

        assert_eq!(once, twice);
    }

    #[test]
    fn test_username_pass_runs_before_key_pass() {
        // Tokens introduced by the username are expanded by the key pass,
        // tokens introduced by the key are not revisited.
        assert_eq!(substitute("USERNAME", "SSH_PUBLIC_KEY", "k"), "k");
        assert_eq!(
            substitute("SSH_PUBLIC_KEY", "alice", "ssh-rsa USERNAME"),
            "ssh-rsa USERNAME"
        );
    }
}
