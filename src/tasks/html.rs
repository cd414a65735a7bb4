//! Production markup: field-name obfuscation and CDN rewriting

use crate::config::Replacement;
use crate::error::{TaskError, TaskResult};
use crate::runner::{gate, Context};
use crate::tasks::copy::{sources, write_dest};
use crate::tasks::TaskOutput;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tokio::fs;

/// Apply the replacement table in order. Each pattern is a literal substring
/// replaced everywhere in the document before the next pattern runs.
pub fn apply_replacements(html: &str, table: &[Replacement]) -> String {
    table.iter().fold(html.to_string(), |doc, entry| {
        doc.replace(&entry.pattern, &entry.replacement)
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<(img|script|source|video|link)\b[^>]*>").expect("static pattern")
    })
}

fn attr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(\s)(data-src|src|href|poster)(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
            .expect("static pattern")
    })
}

fn rel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\srel\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("static pattern")
    })
}

fn scheme_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").expect("static pattern"))
}

/// Link relations whose `href` points at a deployable asset
const ASSET_RELS: &[&str] = &["stylesheet", "icon", "shortcut icon", "apple-touch-icon"];

/// Attributes rewritten for a given element
fn rewritable_attrs(tag: &str, element: &str) -> &'static [&'static str] {
    match element.to_ascii_lowercase().as_str() {
        "img" => &["src", "data-src"],
        "script" | "source" => &["src"],
        "video" => &["poster"],
        "link" => {
            let rel = rel_pattern()
                .captures(tag)
                .and_then(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().trim().to_ascii_lowercase());
            match rel {
                Some(rel) if ASSET_RELS.contains(&rel.as_str()) => &["href"],
                _ => &[],
            }
        }
        _ => &[],
    }
}

/// Whether a URL refers to a file shipped with the build
fn is_local(url: &str) -> bool {
    !(url.is_empty()
        || url.starts_with('#')
        || url.starts_with("//")
        || scheme_pattern().is_match(url))
}

fn join_cdn(base: &str, url: &str) -> String {
    let path = url.trim_start_matches("./").trim_start_matches('/');
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Prefix local asset references with the CDN base URL
pub fn cdnify(html: &str, base: &str) -> String {
    tag_pattern()
        .replace_all(html, |tag_caps: &Captures| {
            let tag = &tag_caps[0];
            let attrs = rewritable_attrs(tag, &tag_caps[1]);
            if attrs.is_empty() {
                return tag.to_string();
            }

            attr_pattern()
                .replace_all(tag, |caps: &Captures| {
                    let name = caps[2].to_ascii_lowercase();
                    let (quote, value) = match (caps.get(4), caps.get(5)) {
                        (Some(v), _) => ('"', v.as_str()),
                        (None, Some(v)) => ('\'', v.as_str()),
                        (None, None) => return caps[0].to_string(),
                    };

                    if !attrs.contains(&name.as_str()) || !is_local(value) {
                        return caps[0].to_string();
                    }

                    format!(
                        "{}{}{}{quote}{}{quote}",
                        &caps[1],
                        &caps[2],
                        &caps[3],
                        join_cdn(base, value)
                    )
                })
                .into_owned()
        })
        .into_owned()
}

/// Rewrite the markup for production into `<build>/`
pub async fn build_production(task: &str, ctx: &Context) -> TaskResult<TaskOutput> {
    // The runner gates this task; a direct call still refuses to run without a base
    let base = match ctx.env_value(gate::CDN_URL) {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => {
            return Err(TaskError::MissingPrecondition {
                task: task.to_string(),
                missing: vec![gate::CDN_URL.to_string()],
            })
        }
    };

    let mut written = Vec::new();
    for source in sources(task, &ctx.config.paths.html, ctx)? {
        let markup = fs::read_to_string(&source.path)
            .await
            .map_err(|e| TaskError::transform(task, "src", e))?;

        let replaced = apply_replacements(&markup, &ctx.config.replacements);
        let rewritten = cdnify(&replaced, &base);

        let dest = ctx.build_dir().join(&source.relative);
        write_dest(task, &dest, rewritten.as_bytes()).await?;
        written.push(dest);
    }

    Ok(TaskOutput::new(written))
}
