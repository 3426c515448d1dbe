//! Deterministic alt text generation from an asset's title or filename.
//!
//! Every mode prefers its primary source and falls back to the cleaned
//! filename when that source is empty. `None` means there is nothing usable to
//! write and the caller should leave the asset alone.

use crate::models::MediaAsset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationMode {
    #[default]
    #[serde(rename = "title_only")]
    TitleOnly,
    #[serde(rename = "title_site")]
    TitleAndSite,
    #[serde(rename = "filename_clean")]
    CleanFilename,
}

impl GenerationMode {
    pub const ALL: [GenerationMode; 3] = [
        GenerationMode::TitleOnly,
        GenerationMode::TitleAndSite,
        GenerationMode::CleanFilename,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::TitleOnly => "title_only",
            GenerationMode::TitleAndSite => "title_site",
            GenerationMode::CleanFilename => "filename_clean",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "title_only" | "title" => Ok(GenerationMode::TitleOnly),
            "title_site" | "title_and_site" => Ok(GenerationMode::TitleAndSite),
            "filename_clean" | "clean_filename" | "filename" => Ok(GenerationMode::CleanFilename),
            other => Err(format!("unknown generation mode: {other}")),
        }
    }
}

/// Mode and site name bound together for one invocation.
#[derive(Debug, Clone)]
pub struct TextGenerator {
    mode: GenerationMode,
    site_name: String,
}

impl TextGenerator {
    pub fn new(mode: GenerationMode, site_name: impl Into<String>) -> Self {
        Self {
            mode,
            site_name: site_name.into(),
        }
    }

    pub fn generate_for(&self, asset: &MediaAsset) -> Option<String> {
        generate(&asset.title, &asset.filename, self.mode, &self.site_name)
    }
}

pub fn generate(
    title: &str,
    filename: &str,
    mode: GenerationMode,
    site_name: &str,
) -> Option<String> {
    let title = strip_tags(title);
    let title = title.trim();
    match mode {
        GenerationMode::TitleOnly if !title.is_empty() => Some(title.to_string()),
        GenerationMode::TitleAndSite if !title.is_empty() => {
            let site = strip_tags(site_name);
            let site = site.trim();
            if site.is_empty() {
                Some(title.to_string())
            } else {
                Some(format!("{title} - {site}"))
            }
        }
        // A bare site name is not useful alt text, so the filename fallback
        // never gets the suffix.
        _ => clean_filename(filename),
    }
}

/// `IMG_2024_sunset-at-beach.jpg` becomes `Img 2024 Sunset At Beach`.
/// Returns `None` when no letters survive.
pub fn clean_filename(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    let stem = strip_tags(stem).replace(['-', '_'], " ");
    let cleaned = stem
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.chars().any(char::is_alphabetic) {
        Some(cleaned)
    } else {
        None
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Removes markup. `<script>` and `<style>` lose their content too.
pub fn strip_tags(input: &str) -> String {
    let input = strip_blocks(input, "script");
    let input = strip_blocks(&input, "style");

    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_tag {
            if ch == '>' {
                in_tag = false;
            }
            continue;
        }
        let opens_tag = ch == '<'
            && chars
                .peek()
                .map(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?'))
                .unwrap_or(false);
        if opens_tag {
            in_tag = true;
        } else {
            out.push(ch);
        }
    }
    out
}

fn strip_blocks(input: &str, tag: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `input`.
    let lower = input.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    while let Some(found) = lower[pos..].find(&open) {
        let start = pos + found;
        out.push_str(&input[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => {
                pos = input.len();
                break;
            }
        }
    }
    out.push_str(&input[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_only_uses_title() {
        assert_eq!(
            generate("My Cat", "x.jpg", GenerationMode::TitleOnly, "PhotoBlog"),
            Some("My Cat".to_string())
        );
    }

    #[test]
    fn title_is_trimmed_and_stripped() {
        assert_eq!(
            generate("  <b>My</b> Cat ", "x.jpg", GenerationMode::TitleOnly, ""),
            Some("My Cat".to_string())
        );
        assert_eq!(
            generate(
                "Cat<script>alert(1)</script>",
                "x.jpg",
                GenerationMode::TitleOnly,
                ""
            ),
            Some("Cat".to_string())
        );
    }

    #[test]
    fn title_and_site_appends_site_name() {
        assert_eq!(
            generate("My Cat", "x.jpg", GenerationMode::TitleAndSite, "PhotoBlog"),
            Some("My Cat - PhotoBlog".to_string())
        );
    }

    #[test]
    fn title_and_site_without_site_name() {
        assert_eq!(
            generate("My Cat", "x.jpg", GenerationMode::TitleAndSite, "  "),
            Some("My Cat".to_string())
        );
    }

    #[test]
    fn empty_title_falls_back_without_site_suffix() {
        assert_eq!(
            generate("", "sunset-beach.jpg", GenerationMode::TitleAndSite, "PhotoBlog"),
            Some("Sunset Beach".to_string())
        );
        assert_eq!(
            generate("<p> </p>", "sunset-beach.jpg", GenerationMode::TitleOnly, ""),
            Some("Sunset Beach".to_string())
        );
    }

    #[test]
    fn empty_title_is_mode_independent() {
        for title in ["", "   ", "<b></b>"] {
            for mode in GenerationMode::ALL {
                assert_eq!(
                    generate(title, "IMG_2024_sunset-at-beach.jpg", mode, "PhotoBlog"),
                    clean_filename("IMG_2024_sunset-at-beach.jpg"),
                    "{mode} with title {title:?}"
                );
            }
        }
    }

    #[test]
    fn clean_filename_mode() {
        assert_eq!(
            generate(
                "",
                "IMG_2024_sunset-at-beach.jpg",
                GenerationMode::CleanFilename,
                ""
            ),
            Some("Img 2024 Sunset At Beach".to_string())
        );
    }

    #[test]
    fn clean_filename_ignores_title() {
        assert_eq!(
            generate("My Cat", "dog_park.png", GenerationMode::CleanFilename, ""),
            Some("Dog Park".to_string())
        );
    }

    #[test]
    fn numeric_filename_yields_nothing() {
        assert_eq!(
            generate("", "12345.png", GenerationMode::CleanFilename, ""),
            None
        );
        assert_eq!(generate("", "12345.png", GenerationMode::TitleOnly, ""), None);
        assert_eq!(clean_filename(".jpg"), None);
        assert_eq!(clean_filename("__--__.webp"), None);
    }

    #[test]
    fn clean_filename_collapses_separators() {
        assert_eq!(
            clean_filename("uploads/2024/my__photo -- final.JPG"),
            Some("My Photo Final".to_string())
        );
        assert_eq!(clean_filename("no_extension"), Some("No Extension".to_string()));
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        assert_eq!(strip_tags("a < b"), "a < b");
        assert_eq!(strip_tags("<em>x</em>"), "x");
    }

    #[test]
    fn mode_parsing() {
        for mode in GenerationMode::ALL {
            assert_eq!(mode.as_str().parse::<GenerationMode>(), Ok(mode));
        }
        assert!("vision".parse::<GenerationMode>().is_err());
    }

    #[test]
    fn deterministic() {
        let a = generate("", "a-b.gif", GenerationMode::TitleOnly, "S");
        let b = generate("", "a-b.gif", GenerationMode::TitleOnly, "S");
        assert_eq!(a, b);
    }
}
