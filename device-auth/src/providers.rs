//! Which auth choices hand off to the device authorization flow.
//!
//! Most auth choices in the wizard take a pasted secret; the ones listed
//! here are completed interactively through the device-auth card instead.

/// Auth choices that support the device code flow.
const DEVICE_AUTH_CHOICES: &[&str] = &["openai-codex", "codex-cli"];

/// Whether `auth_choice` is completed via the device-auth card rather than
/// a pasted secret.
pub fn supports_device_auth(auth_choice: &str) -> bool {
    DEVICE_AUTH_CHOICES.contains(&auth_choice)
}

/// Label shown on the device-auth card for an auth choice.
pub fn provider_label(auth_choice: &str) -> &str {
    match auth_choice {
        "openai-codex" | "codex-cli" => "OpenAI Codex",
        other => other,
    }
}
