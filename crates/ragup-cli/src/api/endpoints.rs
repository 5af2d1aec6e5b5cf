//! API endpoint URL builders

/// Build service version (health) URL
pub fn version_url(base_url: &str) -> String {
    format!("{}/system/version", trim(base_url))
}

/// Build document upload URL
pub fn upload_url(base_url: &str) -> String {
    format!("{}/document/upload", trim(base_url))
}

/// Build document list URL (query parameters are added by the client)
pub fn list_url(base_url: &str) -> String {
    format!("{}/document/list", trim(base_url))
}

/// Build parse trigger URL
pub fn run_url(base_url: &str) -> String {
    format!("{}/document/run", trim(base_url))
}

fn trim(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}
