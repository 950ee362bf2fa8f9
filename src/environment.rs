//! Environment contract between the installed key and the backend container.

use std::fmt::Write as _;
use std::path::Path;

/// Path of the key inside the container.
pub const CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Flag switching the client to Vertex AI.
pub const USE_VERTEX_VAR: &str = "GOOGLE_GENAI_USE_VERTEXAI";
/// Cloud project identifier.
pub const PROJECT_VAR: &str = "GOOGLE_CLOUD_PROJECT";
/// Cloud service location.
pub const LOCATION_VAR: &str = "GOOGLE_CLOUD_LOCATION";
/// Fallback API key; optional and never printed.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

const CONTRACT: [(&str, bool, bool); 5] = [
    (USE_VERTEX_VAR, true, false),
    (CREDENTIALS_VAR, true, false),
    (PROJECT_VAR, true, false),
    (LOCATION_VAR, true, false),
    (API_KEY_VAR, false, true),
];

/// One variable of the contract and its current value.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvVar {
    /// Variable name.
    pub name: &'static str,
    /// Current value, `None` when unset or empty.
    pub value: Option<String>,
    /// Whether the container needs it.
    pub required: bool,
    /// Whether its value must be masked.
    pub secret: bool,
}

impl std::fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvVar")
            .field("name", &self.name)
            .field("value", &self.display_value())
            .field("required", &self.required)
            .finish()
    }
}

impl EnvVar {
    /// Value suitable for printing.
    pub fn display_value(&self) -> String {
        match (&self.value, self.secret) {
            (None, _) => "(not set)".to_owned(),
            (Some(_), true) => "***".to_owned(),
            (Some(value), false) => value.clone(),
        }
    }

    /// Set, or not required.
    pub fn is_satisfied(&self) -> bool {
        self.value.is_some() || !self.required
    }
}

/// Snapshot of the contract variables.
#[derive(Debug, Clone)]
pub struct EnvironmentReport {
    vars: Vec<EnvVar>,
}

impl EnvironmentReport {
    /// Collect every contract variable through `lookup`. Empty values count as unset.
    pub fn collect<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = CONTRACT
            .iter()
            .map(|&(name, required, secret)| EnvVar {
                name,
                value: lookup(name).filter(|v| !v.trim().is_empty()),
                required,
                secret,
            })
            .collect();
        Self { vars }
    }

    /// Collect from the process environment.
    pub fn from_process() -> Self {
        Self::collect(|name| std::env::var(name).ok())
    }

    /// All contract variables in reporting order.
    pub fn vars(&self) -> &[EnvVar] {
        &self.vars
    }

    /// Every required variable is set.
    pub fn is_complete(&self) -> bool {
        self.vars.iter().all(EnvVar::is_satisfied)
    }

    /// Value of [`CREDENTIALS_VAR`].
    pub fn credentials_path(&self) -> Option<&str> {
        self.value(CREDENTIALS_VAR)
    }

    /// Whether [`USE_VERTEX_VAR`] is `true` (case-insensitive).
    pub fn uses_vertex(&self) -> bool {
        self.value(USE_VERTEX_VAR)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|var| var.name == name)
            .and_then(|var| var.value.as_deref())
    }
}

/// Inputs for [`compose_snippet`].
#[derive(Debug, Clone)]
pub struct ComposeSettings<'a> {
    /// Host path of the installed key, as written in the compose file.
    pub host_path: &'a Path,
    /// Mount path inside the container.
    pub container_path: &'a str,
    /// Cloud project; a placeholder is rendered when `None`.
    pub project: Option<&'a str>,
    /// Cloud service location.
    pub location: &'a str,
}

/// Placeholder rendered when no project is known.
pub const PROJECT_PLACEHOLDER: &str = "your-project-id";

/// Render the compose service fragment that mounts the key read-only and
/// exports the contract variables.
pub fn compose_snippet(settings: &ComposeSettings<'_>) -> String {
    let mut out = String::new();
    let project = settings.project.unwrap_or(PROJECT_PLACEHOLDER);
    // Writing into a String cannot fail.
    let _ = writeln!(out, "    volumes:");
    let _ = writeln!(
        out,
        "      - {}:{}:ro",
        settings.host_path.display(),
        settings.container_path
    );
    let _ = writeln!(out, "    environment:");
    let _ = writeln!(out, "      - {CREDENTIALS_VAR}={}", settings.container_path);
    let _ = writeln!(out, "      - {USE_VERTEX_VAR}=True");
    let _ = writeln!(out, "      - {PROJECT_VAR}={project}");
    let _ = writeln!(out, "      - {LOCATION_VAR}={}", settings.location);
    out
}
