//! Pages directory scanning.
//!
//! The development server builds its route table straight from the file
//! tree instead of a compiled manifest:
//!
//! | File                        | Route            | Type     |
//! |-----------------------------|------------------|----------|
//! | `index.html`                | `/`              | page     |
//! | `blog/[slug].md`            | `/blog/[slug]`   | page     |
//! | `docs/[...path]/index.html` | `/docs/[...path]`| page     |
//! | `api/users.ts`              | `/api/users`     | endpoint |
//!
//! Files and directories starting with `_` or `.` are skipped.

use std::path::{Path, PathBuf};

use crate::error::RouteError;
use crate::route::{RouteDescriptor, RouteType};
use crate::segment::TrailingSlash;

/// Extensions scanned as pages.
pub const PAGE_EXTENSIONS: &[&str] = &["html", "htm", "md", "page"];

/// Extensions scanned as endpoints.
pub const ENDPOINT_EXTENSIONS: &[&str] = &["js", "ts", "mjs", "endpoint"];

/// Scans a pages directory into route descriptors.
///
/// Component identifiers are paths relative to `root`, using `/` as the
/// separator. Routes come back sorted by file path so scans are
/// deterministic.
pub fn scan_pages(root: &Path, trailing_slash: TrailingSlash) -> Result<Vec<RouteDescriptor>, RouteError> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut routes = Vec::with_capacity(files.len());
    for file in files {
        let Ok(relative) = file.strip_prefix(root) else {
            continue;
        };
        let Some((route, route_type)) = route_for_file(relative) else {
            continue;
        };
        let component = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        tracing::debug!(%route, %component, route_type = %route_type, "discovered route");
        routes.push(
            RouteDescriptor::builder(route)
                .component(component)
                .route_type(route_type)
                .trailing_slash(trailing_slash)
                .build()?,
        );
    }

    Ok(routes)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), RouteError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RouteError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| RouteError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let hidden = entry
            .file_name()
            .to_str()
            .map_or(true, |name| name.starts_with('_') || name.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Maps a path relative to the pages directory onto a route.
fn route_for_file(relative: &Path) -> Option<(String, RouteType)> {
    let extension = relative.extension()?.to_str()?;
    let route_type = if PAGE_EXTENSIONS.contains(&extension) {
        RouteType::Page
    } else if ENDPOINT_EXTENSIONS.contains(&extension) {
        RouteType::Endpoint
    } else {
        return None;
    };

    let stem = relative.with_extension("");
    let mut segments: Vec<String> = stem
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.last().is_some_and(|s| s == "index") {
        segments.pop();
    }

    Some((format!("/{}", segments.join("/")), route_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, file: &str) {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_route_for_file() {
        assert_eq!(
            route_for_file(Path::new("index.html")),
            Some(("/".to_string(), RouteType::Page))
        );
        assert_eq!(
            route_for_file(Path::new("blog/[slug].md")),
            Some(("/blog/[slug]".to_string(), RouteType::Page))
        );
        assert_eq!(
            route_for_file(Path::new("api/users.ts")),
            Some(("/api/users".to_string(), RouteType::Endpoint))
        );
        assert_eq!(route_for_file(Path::new("styles.css")), None);
    }

    #[test]
    fn test_scan_pages_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.html");
        touch(dir.path(), "404.html");
        touch(dir.path(), "blog/[slug].md");
        touch(dir.path(), "docs/[...path]/index.html");
        touch(dir.path(), "_partials/header.html");
        touch(dir.path(), "api/feed.ts");

        let routes = scan_pages(dir.path(), TrailingSlash::Ignore).unwrap();
        let names: Vec<_> = routes.iter().map(RouteDescriptor::route).collect();

        assert_eq!(
            names,
            ["/404", "/api/feed", "/blog/[slug]", "/docs/[...path]", "/"]
        );
        let feed = routes.iter().find(|r| r.route() == "/api/feed").unwrap();
        assert_eq!(feed.route_type(), RouteType::Endpoint);
        assert_eq!(feed.component(), "api/feed.ts");
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan_pages(&dir.path().join("missing"), TrailingSlash::Ignore);
        assert!(matches!(result, Err(RouteError::Io { .. })));
    }
}
