use std::fmt::Write as _;

/// PEP 503 project page: one anchor per artifact, sorted by filename.
#[must_use]
pub fn render_package_page(package: &str, filenames: &[String]) -> String {
    let mut sorted: Vec<&String> = filenames.iter().collect();
    sorted.sort();
    sorted.dedup();
    let title = format!("Links for {}", escape(package));
    let links = sorted
        .into_iter()
        .map(|file| (file.as_str(), file.as_str()))
        .collect::<Vec<_>>();
    page(&title, &links)
}

/// PEP 503 root page: one anchor per project directory, sorted by name.
#[must_use]
pub fn render_root_page(packages: &[String]) -> String {
    let mut sorted: Vec<&String> = packages.iter().collect();
    sorted.sort();
    sorted.dedup();
    let hrefs: Vec<String> = sorted.iter().map(|name| format!("{name}/")).collect();
    let links = sorted
        .iter()
        .zip(&hrefs)
        .map(|(name, href)| (href.as_str(), name.as_str()))
        .collect::<Vec<_>>();
    page("Simple index", &links)
}

fn page(title: &str, links: &[(&str, &str)]) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html>");
    let _ = writeln!(html, "  <head><title>{title}</title></head>");
    let _ = writeln!(html, "  <body>");
    let _ = writeln!(html, "    <h1>{title}</h1>");
    for (href, text) in links {
        let _ = writeln!(
            html,
            "    <a href=\"{}\">{}</a><br/>",
            escape(href),
            escape(text)
        );
    }
    let _ = writeln!(html, "  </body>");
    let _ = writeln!(html, "</html>");
    html
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}
