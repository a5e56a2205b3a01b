use std::io::Write;

use super::device_code::AuthorizationRequest;

/// Human-facing side channel for the interactive flow.
///
/// Kept separate from stdout so tools consuming the primary output never
/// see prompts.
pub trait LoginPrompt: Send + Sync {
    fn show_instructions(&self, request: &AuthorizationRequest);
    fn browser_unavailable(&self, url: &str);
    fn authenticated(&self);
}

/// Writes instructions to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrPrompt;

impl LoginPrompt for StderrPrompt {
    fn show_instructions(&self, request: &AuthorizationRequest) {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "{}", render_instructions(request));
        let _ = err.flush();
    }

    fn browser_unavailable(&self, url: &str) {
        eprintln!("(Could not open a browser automatically; visit {url} manually)");
    }

    fn authenticated(&self) {
        eprintln!("Authentication successful!\n");
    }
}

pub(crate) fn render_instructions(request: &AuthorizationRequest) -> String {
    format!(
        "\n=== Caido Authentication Required ===\n\
         Open the following URL in your browser:\n  {}\n\n\
         And enter this code: {}\n\n\
         Waiting for authentication (expires at {})...\n\n",
        request.verification_url,
        request.user_code,
        request.expires_at.to_rfc3339(),
    )
}
