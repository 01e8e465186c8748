//! GCP Projects
//!
//! Project id handling and per-project service checks.

use super::client::GcpClient;
use anyhow::Result;

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    match project.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {},
        _ => return false,
    }

    if project.ends_with('-') {
        return false;
    }

    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Split a comma separated project list, dropping blanks and duplicates
pub fn parse_project_list(raw: &str) -> Vec<String> {
    let mut projects: Vec<String> = Vec::new();
    for project in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !projects.iter().any(|p| p == project) {
            projects.push(project.to_string());
        }
    }
    projects
}

/// Check whether a service (e.g. `container.googleapis.com`) is enabled
pub async fn is_service_enabled(client: &GcpClient, project: &str, service: &str) -> Result<bool> {
    let response = client.get(&client.service_url(project, service)).await?;

    Ok(response
        .get("state")
        .and_then(|v| v.as_str())
        .map(|s| s == "ENABLED")
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("my-project-123"));
        assert!(!validate_project_id("short"));
        assert!(!validate_project_id("1-starts-with-digit"));
        assert!(!validate_project_id("ends-with-hyphen-"));
        assert!(!validate_project_id("Has-Upper-Case"));
    }

    #[test]
    fn test_parse_project_list() {
        assert_eq!(
            parse_project_list(" proj-a, ,proj-b,proj-a,"),
            vec!["proj-a".to_string(), "proj-b".to_string()]
        );
        assert!(parse_project_list(" , ").is_empty());
    }
}
