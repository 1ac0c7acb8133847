//! Package identifier helpers: project labels and display names.

/// Number of leading path segments that make up a project root on `host`.
fn project_root_len(parts: &[&str]) -> usize {
    match parts.first().copied() {
        Some("github.com" | "bitbucket.org" | "gitlab.com" | "code.google.com" | "golang.org") => 3,
        Some("gopkg.in") => {
            // gopkg.in/name.v1 vs gopkg.in/owner/name.v1
            match parts.get(1) {
                Some(second) if !second.contains('.') => 3,
                _ => 2,
            }
        }
        _ => 2,
    }
}

/// Strip a gopkg.in style `.vN` version suffix.
fn strip_version_suffix(segment: &str) -> &str {
    if let Some(pos) = segment.rfind(".v") {
        let version = &segment[pos + 2..];
        if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()) {
            return &segment[..pos];
        }
    }
    segment
}

/// Label of the repository/project that owns `package`.
///
/// `github.com/gorilla/mux/middleware` belongs to `mux`,
/// `gopkg.in/yaml.v2` to `yaml`, `golang.org/x/net/html` to `net`.
pub fn project_of_package(package: &str) -> String {
    let parts: Vec<&str> = package.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return String::new();
    }
    let root_len = project_root_len(&parts).min(parts.len());
    let label = parts[root_len - 1];
    if parts[0] == "gopkg.in" {
        strip_version_suffix(label).to_string()
    } else {
        label.to_string()
    }
}

/// Name to show for a hit.
///
/// Real names pass through. The `main` sentinel and empty names fall back to
/// the owning project so commands and unnamed packages stay recognizable.
pub fn package_show_name(name: &str, package: &str) -> String {
    if !name.is_empty() && name != "main" {
        return name.to_string();
    }
    let project = project_of_package(package);
    if name == "main" {
        format!("main - {}", project)
    } else {
        format!("({})", project)
    }
}
